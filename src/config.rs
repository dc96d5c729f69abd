//! User settings, stored as JSON under the platform config directory.
//!
//! A missing or unreadable settings file is not an error: the defaults are
//! used and a warning is logged.

use crate::pipeline::PipelineConfig;
use crate::table::{DEFAULT_NA_VALUES, NaValues};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Rows per page in the `view` command (default: 50)
    pub page_size: usize,
    /// Rows printed by `head` (default: 10)
    pub head_rows: usize,
    /// Tokens read as missing when loading or editing
    pub na_values: Vec<String>,
    /// Pipeline applied when no stage flags are given
    pub default_pipeline: PipelineConfig,
    /// Whether to write rolling log files next to console output
    pub log_to_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 50,
            head_rows: 10,
            na_values: DEFAULT_NA_VALUES.iter().map(|s| (*s).to_owned()).collect(),
            default_pipeline: PipelineConfig::default(),
            log_to_file: true,
        }
    }
}

impl Settings {
    pub fn na(&self) -> NaValues {
        NaValues::new(self.na_values.iter().cloned())
    }

    /// Load settings from the default location, falling back to defaults.
    pub fn load() -> Self {
        match config_path() {
            Ok(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|err| {
                tracing::warn!("Ignoring settings file {}: {err:#}", path.display());
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))
    }
}

/// `<config dir>/gridwork/config.json`
pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Failed to determine config directory")?;
    Ok(base.join("gridwork").join("config.json"))
}
