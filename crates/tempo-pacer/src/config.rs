// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Startup configuration for the frame pacer.
//!
//! Configuration is plain JSON so it can live next to the host application's
//! other settings. Every field has a default, so an empty object is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// An error raised while loading or validating a [`PacerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("pacer config I/O error on '{}': {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for this schema.
    #[error("pacer config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the pacer cannot use.
    #[error("invalid pacer config: {field} {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Configuration applied when a [`FramePacer`](crate::FramePacer) is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    /// Native refresh rate of the display, if already known at startup.
    pub screen_refresh_rate: Option<u32>,
    /// Requested frame-rate cap. `None` renders at the display rate.
    pub max_fps: Option<u32>,
    /// How long rendering must be idle before a partial measurement is flushed.
    pub idle_timeout_ms: u64,
    /// Tolerance added to the refresh period before a late tick counts as a
    /// missed VSYNC pulse.
    pub vsync_slack_us: u64,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            screen_refresh_rate: None,
            max_fps: None,
            idle_timeout_ms: 50,
            vsync_slack_us: 1_000,
        }
    }
}

impl PacerConfig {
    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Writes the configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks that every field holds a usable value.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.screen_refresh_rate == Some(0) {
            return Err(ConfigError::Invalid {
                field: "screen_refresh_rate",
                reason: "must be greater than zero",
            });
        }
        if self.max_fps == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_fps",
                reason: "must be greater than zero",
            });
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "idle_timeout_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// The idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// The VSYNC slack as a [`Duration`].
    pub fn vsync_slack(&self) -> Duration {
        Duration::from_micros(self.vsync_slack_us)
    }
}
