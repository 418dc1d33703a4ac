//! Display configuration.
//!
//! Loaded once at start-up from `display_config.toml` and passed by
//! reference into report assembly. Every section is optional.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "display_config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("savings window starts {start} after it ends {end}")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Free-form article copy handed through to the page templates.
    #[serde(default)]
    pub article_content: serde_json::Value,

    #[serde(default)]
    pub about_content: serde_json::Value,

    /// Front-end settings passed to the chart scripts.
    #[serde(default)]
    pub config_object: serde_json::Value,

    #[serde(default)]
    pub savings: SavingsWindow,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Reporting months whose production counts toward cumulative savings.
///
/// Dates are written as quoted `"YYYY-MM-DD"` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsWindow {
    #[serde(default = "default_window_start")]
    pub start: NaiveDate,
    #[serde(default = "default_window_end")]
    pub end: NaiveDate,
}

impl Default for SavingsWindow {
    fn default() -> Self {
        Self {
            start: default_window_start(),
            end: default_window_end(),
        }
    }
}

impl SavingsWindow {
    pub fn contains(&self, month: NaiveDate) -> bool {
        month >= self.start && month <= self.end
    }
}

fn default_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 6, 1).unwrap_or_default()
}

fn default_window_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 2, 29).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Rows shown in each console preview table.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_preview_rows() -> usize {
    5
}

impl DisplayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from `display_config.toml` in the
    /// working directory if present, else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.savings.start > self.savings.end {
            return Err(ConfigError::InvertedWindow {
                start: self.savings.start,
                end: self.savings.end,
            });
        }
        Ok(())
    }
}
