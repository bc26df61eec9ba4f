//! Error types returned at the crate's seams.
use bastion_utils::DurationError;
use thiserror::Error;

use crate::spawn_point::SpawnPointKey;

/// Failure of a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The backing document could not be decoded.
    #[error("store document is malformed: {0}")]
    Parse(String),
    /// The document could not be encoded.
    #[error("could not encode store document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A rejected command.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Duration text that does not parse.
    #[error("invalid duration '{text}': {source}")]
    InvalidDuration {
        /// The text given.
        text: String,
        /// Why it was rejected.
        source: DurationError,
    },
    /// Clock time text that does not parse as `HH:mm`.
    #[error("invalid time of day '{0}', expected HH:mm")]
    InvalidTimeOfDay(String),
    /// An interval that converts to zero ticks.
    #[error("interval must be at least one tick")]
    NonPositiveInterval,
    /// The world is not loaded.
    #[error("unknown world '{0}'")]
    UnknownWorld(String),
    /// No spawn point with this key.
    #[error("unknown spawn point '{0}'")]
    UnknownSpawnPoint(SpawnPointKey),
    /// A spawn point name that is blank or contains `/`.
    #[error("invalid spawn point name '{0}', must be non-empty without '/'")]
    InvalidSpawnPointName(String),
    /// A spawn point with this key already exists.
    #[error("spawn point '{0}' already exists")]
    DuplicateSpawnPoint(SpawnPointKey),
    /// The change was applied in memory but could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GuardError {
    pub(crate) fn duration(text: &str, source: DurationError) -> Self {
        Self::InvalidDuration {
            text: text.to_string(),
            source,
        }
    }
}
