//! JSON configuration for the session layer.

use court_calib_core::INDOOR_FIVB_18X9;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_min_box_px() -> f64 {
    4.0
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_court_template() -> String {
    INDOOR_FIVB_18X9.id.to_string()
}

/// Tunables shared by the wizard, the draft engine and the file store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Drafts narrower or shorter than this (image pixels) are discarded.
    #[serde(default = "default_min_box_px")]
    pub min_box_px: f64,
    /// Label applied to new annotations when the tool store has none.
    #[serde(default)]
    pub default_label: Option<String>,
    /// Root directory of the [`FileStore`](crate::FileStore).
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    #[serde(default = "default_court_template")]
    pub court_template: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_box_px: default_min_box_px(),
            default_label: None,
            data_root: default_data_root(),
            court_template: default_court_template(),
        }
    }
}

impl SessionConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
