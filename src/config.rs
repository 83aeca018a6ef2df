//! Process configuration loaded from an optional TOML file.
//!
//! Values absent from the file use defaults. `COURIER_SIM_DATA_DIR` takes
//! precedence over the file for the data directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`AppConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "COURIER_SIM_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Directory holding the users, deliveries and settings files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Request buffer of the delivery actor.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long a paused worker sleeps before reading its rate again.
    /// The worker raises anything below 1 ms to 1 ms.
    #[serde(default = "default_idle_recheck_ms")]
    pub idle_recheck_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./courier-data")
}

fn default_channel_capacity() -> usize {
    32
}

fn default_idle_recheck_ms() -> u64 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            channel_capacity: default_channel_capacity(),
            idle_recheck_ms: default_idle_recheck_ms(),
        }
    }
}

impl AppConfig {
    /// Loads `path` if it exists, otherwise the defaults, then applies the
    /// environment override.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<AppConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        Ok(config)
    }

    pub fn idle_recheck(&self) -> Duration {
        Duration::from_millis(self.idle_recheck_ms)
    }
}
