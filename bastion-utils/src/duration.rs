//! Human readable durations such as `1d2h30m15s`, `1.5s` or `20t`.
//!
//! A duration is a sequence of magnitude + unit pairs in descending unit order:
//! days (`d`), hours (`h`), minutes (`m`), seconds (`s`, may be fractional),
//! milliseconds (`ms`) and ticks (`t`). Every unit is optional but at least one
//! must be present, each may appear at most once, and the total must be
//! positive. Any unrecognised character rejects the whole string.
use std::fmt::Write;

use thiserror::Error;

/// Length of one host tick in milliseconds.
pub const MILLIS_PER_TICK: u64 = 50;

const MILLIS_PER_SECOND: u64 = 1000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u64 = 24 * MILLIS_PER_HOUR;

/// Errors returned when parsing a duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// The input was empty.
    #[error("duration is empty")]
    Empty,
    /// A unit was expected but something else was found.
    #[error("unexpected character {found:?} at position {position}")]
    UnexpectedCharacter {
        /// Byte offset of the offending character.
        position: usize,
        /// The offending character.
        found: char,
    },
    /// A unit was not preceded by a number.
    #[error("missing magnitude at position {0}")]
    MissingMagnitude(usize),
    /// A unit was repeated or appeared after a smaller one.
    #[error("unit `{0}` is out of order")]
    UnitOutOfOrder(&'static str),
    /// A fractional magnitude was used with a unit other than seconds.
    #[error("only seconds may be fractional")]
    FractionNotAllowed,
    /// The total does not fit in 64 bits of milliseconds.
    #[error("duration is too large")]
    Overflow,
    /// The total is zero.
    #[error("duration must be positive")]
    NotPositive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Unit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Millis,
    Ticks,
}

impl Unit {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Days => "d",
            Self::Hours => "h",
            Self::Minutes => "m",
            Self::Seconds => "s",
            Self::Millis => "ms",
            Self::Ticks => "t",
        }
    }

    const fn millis(self) -> u64 {
        match self {
            Self::Days => MILLIS_PER_DAY,
            Self::Hours => MILLIS_PER_HOUR,
            Self::Minutes => MILLIS_PER_MINUTE,
            Self::Seconds => MILLIS_PER_SECOND,
            Self::Millis => 1,
            Self::Ticks => MILLIS_PER_TICK,
        }
    }
}

/// Parses a duration into milliseconds.
pub fn parse(text: &str) -> Result<u64, DurationError> {
    let text = text.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err(DurationError::Empty);
    }

    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut last_unit: Option<Unit> = None;
    let mut total: u64 = 0;

    while pos < bytes.len() {
        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == start {
            return Err(match text[pos..].chars().next() {
                Some(c) if c.is_ascii_alphabetic() => DurationError::MissingMagnitude(pos),
                Some(found) => DurationError::UnexpectedCharacter {
                    position: pos,
                    found,
                },
                None => DurationError::MissingMagnitude(pos),
            });
        }
        let whole: u64 = text[start..pos]
            .parse()
            .map_err(|_| DurationError::Overflow)?;

        // Fractional digits, only meaningful for seconds. Precision stops at milliseconds.
        let mut fraction_millis = None;
        if pos < bytes.len() && bytes[pos] == b'.' {
            pos += 1;
            let frac_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos == frac_start {
                return Err(unexpected(&text, pos));
            }
            let digits = &text[frac_start..pos];
            let mut millis = 0;
            for (i, digit) in digits.bytes().take(3).enumerate() {
                millis += u64::from(digit - b'0') * 10u64.pow(2 - i as u32);
            }
            fraction_millis = Some(millis);
        }

        let unit = if text[pos..].starts_with("ms") {
            pos += 2;
            Unit::Millis
        } else {
            let unit = match bytes.get(pos) {
                Some(b'd') => Unit::Days,
                Some(b'h') => Unit::Hours,
                Some(b'm') => Unit::Minutes,
                Some(b's') => Unit::Seconds,
                Some(b't') => Unit::Ticks,
                _ => return Err(unexpected(&text, pos)),
            };
            pos += 1;
            unit
        };

        if last_unit.is_some_and(|last| unit <= last) {
            return Err(DurationError::UnitOutOfOrder(unit.symbol()));
        }
        last_unit = Some(unit);

        let mut millis = whole
            .checked_mul(unit.millis())
            .ok_or(DurationError::Overflow)?;
        if let Some(fraction) = fraction_millis {
            if unit != Unit::Seconds {
                return Err(DurationError::FractionNotAllowed);
            }
            millis = millis.checked_add(fraction).ok_or(DurationError::Overflow)?;
        }
        total = total.checked_add(millis).ok_or(DurationError::Overflow)?;
    }

    if total == 0 {
        return Err(DurationError::NotPositive);
    }
    Ok(total)
}

fn unexpected(text: &str, pos: usize) -> DurationError {
    match text[pos..].chars().next() {
        Some(found) => DurationError::UnexpectedCharacter {
            position: pos,
            found,
        },
        None => DurationError::MissingMagnitude(pos),
    }
}

/// Formats milliseconds into the canonical duration form.
///
/// Zero components are omitted; `0` renders as `0s`. Sub-second remainders are
/// written in milliseconds, so the output always parses back to the same value.
#[must_use]
pub fn format(millis: u64) -> String {
    let mut out = String::new();
    let mut rest = millis;
    for unit in [
        Unit::Days,
        Unit::Hours,
        Unit::Minutes,
        Unit::Seconds,
        Unit::Millis,
    ] {
        let amount = rest / unit.millis();
        rest %= unit.millis();
        if amount > 0 {
            let _ = write!(out, "{amount}{}", unit.symbol());
        }
    }
    if out.is_empty() {
        out.push_str("0s");
    }
    out
}

/// Converts milliseconds into whole host ticks, rounding down.
#[must_use]
pub const fn millis_to_ticks(millis: u64) -> u64 {
    millis / MILLIS_PER_TICK
}

/// Converts host ticks into milliseconds.
#[must_use]
pub const fn ticks_to_millis(ticks: u64) -> u64 {
    ticks.saturating_mul(MILLIS_PER_TICK)
}

/// Parses a duration and converts it to a positive number of ticks.
///
/// Durations shorter than one tick are rejected.
pub fn parse_ticks(text: &str) -> Result<u64, DurationError> {
    match millis_to_ticks(parse(text)?) {
        0 => Err(DurationError::NotPositive),
        ticks => Ok(ticks),
    }
}
