//! Host configuration, read from a JSON5 file.
use std::fs;
use std::path::Path;
use std::time::Duration;

use bastion_core::GuardSettings;
use bastion_core::despawn::DespawnSettings;
use serde::Deserialize;
use thiserror::Error;

/// Where the binary looks for its configuration.
pub const CONFIG_PATH: &str = "config/bastion_config.json5";

const DEFAULT_CONFIG: &str = include_str!("../../package-content/bastion_config.json5");

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON5 or has the wrong shape.
    #[error("config is malformed: {0}")]
    Parse(String),
    /// A value is out of range.
    #[error("config is invalid: {0}")]
    Invalid(&'static str),
}

/// Runtime settings of the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BastionConfig {
    /// Host ticks per second.
    pub tick_rate: u32,
    /// Ticks between despawn sweeps.
    pub despawn_check_interval_ticks: u64,
    /// Ticks between two removals of one sweep.
    pub despawn_removal_delay_ticks: u64,
    /// Path of the JSON data file.
    pub data_file: String,
    /// Worlds the headless host exposes.
    pub worlds: Vec<String>,
    /// Milliseconds between automatic saves of placed blocks. 0 disables.
    pub save_interval_millis: u64,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl BastionConfig {
    /// Loads the configuration at `path`, writing the default file first if
    /// there is none.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let config_str = fs::read_to_string(path)?;
            Self::parse(&config_str)?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        serde_json5::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.tick_rate) {
            return Err(ConfigError::Invalid("Tick rate must be in range 1..1000"));
        }
        if self.despawn_check_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "Despawn check interval must be at least one tick",
            ));
        }
        if self.data_file.trim().is_empty() {
            return Err(ConfigError::Invalid("Data file path must not be empty"));
        }
        Ok(())
    }

    /// Wall time of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }

    /// Period of the host's autosave task, if enabled.
    #[must_use]
    pub fn save_interval(&self) -> Option<Duration> {
        (self.save_interval_millis > 0).then(|| Duration::from_millis(self.save_interval_millis))
    }

    /// The engine timings described by this configuration.
    #[must_use]
    pub fn guard_settings(&self) -> GuardSettings {
        GuardSettings {
            despawn: DespawnSettings {
                check_interval_ticks: self.despawn_check_interval_ticks,
                removal_delay_ticks: self.despawn_removal_delay_ticks,
            },
        }
    }
}

impl Default for BastionConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            despawn_check_interval_ticks: 20,
            despawn_removal_delay_ticks: 5,
            data_file: "config/bastion_data.json".to_string(),
            worlds: vec![
                "world".to_string(),
                "world_nether".to_string(),
                "world_the_end".to_string(),
            ],
            save_interval_millis: 300_000,
            log_filter: "info".to_string(),
        }
    }
}
