//! Editor configuration.
//!
//! Hosts usually ship a JSON blob with the camelCase option names; every
//! field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid editor config: {0}")]
    Invalid(String),
}

/// Every recognized editor option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// History capacity.
    pub max_size: usize,
    /// Whether consecutive same-target moves collapse into one undo step.
    pub merge_enabled: bool,
    /// Move-merge window in milliseconds.
    pub merge_window: u64,
    /// Pointer travel (screen px) before a press becomes a drag.
    pub drag_threshold: f64,
    /// Max gap between two clicks of a double click, in milliseconds.
    pub double_click_threshold: u64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            merge_enabled: true,
            merge_window: 500,
            drag_threshold: 5.0,
            double_click_threshold: 500,
            min_zoom: diagram_core::viewport::MIN_ZOOM,
            max_zoom: diagram_core::viewport::MAX_ZOOM,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::Invalid("maxSize must be at least 1".into()));
        }
        if !(self.drag_threshold >= 0.0) {
            return Err(ConfigError::Invalid(
                "dragThreshold must be a non-negative number".into(),
            ));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom limits {}..{} are not a valid range",
                self.min_zoom, self.max_zoom
            )));
        }
        Ok(())
    }

    pub fn history(&self) -> HistoryConfig {
        HistoryConfig {
            max_size: self.max_size,
            merge_enabled: self.merge_enabled,
            merge_window: Duration::from_millis(self.merge_window),
        }
    }

    pub fn gestures(&self) -> GestureConfig {
        GestureConfig {
            drag_threshold: self.drag_threshold,
            double_click_threshold: self.double_click_threshold,
        }
    }
}

/// Options of the command history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryConfig {
    pub max_size: usize,
    pub merge_enabled: bool,
    pub merge_window: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        EditorConfig::default().history()
    }
}

/// Options of the gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub drag_threshold: f64,
    /// Milliseconds.
    pub double_click_threshold: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        EditorConfig::default().gestures()
    }
}
