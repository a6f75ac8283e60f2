use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum OverlayConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_grid_color() -> String {
    "#00e5ff".into()
}

fn default_net_color() -> String {
    "#ff3b30".into()
}

fn default_rect_color() -> String {
    "#ffd60a".into()
}

fn default_polygon_color() -> String {
    "#34c759".into()
}

fn default_draft_color() -> String {
    "#ffffff".into()
}

fn default_label_color() -> String {
    "#ffffff".into()
}

fn default_line_width() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Colors and filters for [`OverlayRenderer`](crate::OverlayRenderer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_grid_color")]
    pub grid_color: String,
    #[serde(default = "default_net_color")]
    pub net_color: String,
    #[serde(default = "default_rect_color")]
    pub rect_color: String,
    #[serde(default = "default_polygon_color")]
    pub polygon_color: String,
    #[serde(default = "default_draft_color")]
    pub draft_color: String,
    #[serde(default = "default_label_color")]
    pub label_color: String,
    /// Stroke width in display pixels.
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    /// Only draw annotations within this many seconds of the playhead.
    /// `None` draws all of them.
    #[serde(default)]
    pub annotation_window_s: Option<f64>,
    #[serde(default = "default_true")]
    pub zone_labels: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            grid_color: default_grid_color(),
            net_color: default_net_color(),
            rect_color: default_rect_color(),
            polygon_color: default_polygon_color(),
            draft_color: default_draft_color(),
            label_color: default_label_color(),
            line_width: default_line_width(),
            annotation_window_s: None,
            zone_labels: true,
        }
    }
}

impl OverlayConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, OverlayConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), OverlayConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
