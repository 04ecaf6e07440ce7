// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings, stored as RON.

use crate::anchor::LayoutMetrics;
use crate::persistence::RetryPolicy;
use crate::transform::ZoomSettings;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default settings file name
pub const CONFIG_FILE_NAME: &str = "skill_graph.ron";

/// Current settings format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Settings of the skill graph editor. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Format version
    pub version: u32,
    /// Root of the bot projects
    pub projects_dir: PathBuf,
    /// Zoom limits and sensitivity
    pub zoom: ZoomSettings,
    /// Node and port layout constants
    pub layout: LayoutMetrics,
    /// Backoff for failed saves
    pub save_retry: RetryPolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            projects_dir: PathBuf::from("projects"),
            zoom: ZoomSettings::default(),
            layout: LayoutMetrics::default(),
            save_retry: RetryPolicy::default(),
        }
    }
}

impl EditorConfig {
    /// Parse settings from RON text
    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(s)?;
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion(config.version));
        }
        if !config.zoom.is_valid() {
            return Err(ConfigError::InvalidZoom {
                min: config.zoom.min_scale,
                max: config.zoom.max_scale,
            });
        }
        Ok(config)
    }

    /// Serialize settings to RON text
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Load settings from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_ron(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

/// Errors reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be parsed
    #[error("Malformed settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be written
    #[error("Failed to encode settings: {0}")]
    Encode(#[from] ron::Error),

    /// Written by a newer editor
    #[error("Settings version {0} is newer than supported version {CONFIG_FORMAT_VERSION}")]
    UnsupportedVersion(u32),

    /// Zoom limits that do not form a positive range
    #[error("Invalid zoom range {min}..={max}")]
    InvalidZoom {
        /// Configured smallest zoom
        min: f32,
        /// Configured largest zoom
        max: f32,
    },
}
