//! Wall clock windows written as `HH:mm`.
use chrono::NaiveTime;

const TIME_FORMAT: &str = "%H:%M";

/// Parses an `HH:mm` clock time.
#[must_use]
pub fn parse(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), TIME_FORMAT).ok()
}

/// Formats a clock time as `HH:mm`.
#[must_use]
pub fn format(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Returns whether `now` lies inside the inclusive window `from..=to`.
///
/// When `from` is later than `to` the window wraps past midnight.
#[must_use]
pub fn is_in_range(now: NaiveTime, from: NaiveTime, to: NaiveTime) -> bool {
    if from > to {
        now >= from || now <= to
    } else {
        from <= now && now <= to
    }
}

/// Same as [`is_in_range`] for unparsed bounds.
///
/// A bound that cannot be parsed makes the window permissive.
#[must_use]
pub fn is_in_window(now: NaiveTime, from: &str, to: &str) -> bool {
    match (parse(from), parse(to)) {
        (Some(from), Some(to)) => is_in_range(now, from, to),
        _ => true,
    }
}
