//! Board configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error loading a [`BoardConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for geometry and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    /// Storage key the board document is persisted under. Default: `"board"`.
    pub storage_key: String,

    /// Gap between a group's children and its derived border. Default: 25.
    pub group_margin: f32,

    /// Default size of a newly created frame.
    pub group_width: f32,
    pub group_height: f32,

    /// Default task-list width.
    pub task_list_width: f32,

    /// Height of a task-list node with no steps.
    pub task_list_base_height: f32,

    /// Height added per step.
    pub step_height: f32,

    /// Resize floor for task-list nodes.
    pub task_list_min_width: f32,
    pub task_list_min_height: f32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            storage_key: "board".to_string(),
            group_margin: 25.0,
            group_width: 200.0,
            group_height: 200.0,
            task_list_width: 240.0,
            task_list_base_height: 60.0,
            step_height: 32.0,
            task_list_min_width: 200.0,
            task_list_min_height: 60.0,
        }
    }
}

impl BoardConfig {
    /// Parse a JSON config, filling missing keys with defaults.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed JSON and
    /// `ConfigError::Invalid` for values that fail [`BoardConfig::validate`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    /// See [`BoardConfig::from_json`]; also fails when the file is unreadable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Reject values the geometry code cannot work with.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storageKey must not be empty".into()));
        }
        let dims = [
            ("groupMargin", self.group_margin),
            ("groupWidth", self.group_width),
            ("groupHeight", self.group_height),
            ("taskListWidth", self.task_list_width),
            ("taskListBaseHeight", self.task_list_base_height),
            ("stepHeight", self.step_height),
            ("taskListMinWidth", self.task_list_min_width),
            ("taskListMinHeight", self.task_list_min_height),
        ];
        for (name, value) in dims {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
