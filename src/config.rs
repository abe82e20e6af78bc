// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{APP_ID, DEFAULT_RENDER_TARGET_ID, capture, decode, timing};
use crate::errors::{AppError, AppResult};
use crate::frame_processor::types::SymbologySet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the configuration file inside the app config directory
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Symbologies the decode engine is restricted to
    pub symbologies: SymbologySet,
    /// Longest side of the greyscale image handed to the detector
    pub max_dimension: u32,
    /// Requested V4L2 capture width
    pub capture_width: u32,
    /// Requested V4L2 capture height
    pub capture_height: u32,
    /// Replay interval for image-file sources
    pub frame_interval_ms: u64,
    /// Image files exposed as extra video devices
    pub virtual_sources: Vec<PathBuf>,
    /// Identifier of the preview surface
    pub render_target_id: String,
    /// tracing filter directive, used when RUST_LOG is unset
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbologies: SymbologySet::default_allow_list(),
            max_dimension: decode::DEFAULT_MAX_DIMENSION,
            capture_width: capture::DEFAULT_WIDTH,
            capture_height: capture::DEFAULT_HEIGHT,
            frame_interval_ms: timing::DEFAULT_FRAME_INTERVAL_MS,
            virtual_sources: Vec::new(),
            render_target_id: DEFAULT_RENDER_TARGET_ID.to_string(),
            log_filter: None,
        }
    }
}

impl Config {
    /// Location of the user's config file, if a config directory exists
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load the user's config, falling back to defaults
    ///
    /// A malformed file is reported and ignored rather than aborting startup.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            debug!("No config directory, using defaults");
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save(&self) -> AppResult<()> {
        let path = Self::config_path()
            .ok_or_else(|| AppError::Config("No config directory available".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Allow-list handed to the decode engine; empty falls back to all formats
    pub fn symbology_set(&self) -> SymbologySet {
        if self.symbologies.is_empty() {
            SymbologySet::default_allow_list()
        } else {
            self.symbologies.clone()
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_processor::types::Symbology;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"max_dimension": 320}"#).unwrap();
        assert_eq!(config.max_dimension, 320);
        assert_eq!(config.capture_width, capture::DEFAULT_WIDTH);
        assert_eq!(config.symbologies.len(), 12);
    }

    #[test]
    fn test_empty_symbologies_fall_back() {
        let config = Config {
            symbologies: SymbologySet::from_iter(std::iter::empty()),
            ..Config::default()
        };
        assert!(config.symbology_set().contains(Symbology::QrCode));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let path = std::env::temp_dir().join(format!("scanner-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
        std::fs::remove_file(path).ok();
    }
}
