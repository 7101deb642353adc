//! Sink configuration parsing and normalization
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_LABEL};
use crate::error::{Error, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Resolved sink configuration
///
/// Numeric thresholds accept any signed value; [`SinkConfig::normalized`]
/// clamps negatives back to the documented defaults rather than rejecting
/// them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SinkConfig {
    /// Directory where log files are stored, created if absent
    pub dir: PathBuf,
    /// Label embedded in file names (e.g. a severity name)
    pub label: String,
    /// Maximum active file size in MB, 0 means no limit
    pub max_size_mb: i64,
    /// Backup retention time in days, 0 means no limit
    pub max_age_days: i64,
    /// Maximum number of backups to keep, 0 means no limit
    pub max_backups: i64,
    /// Gzip rotated backups
    pub compress: bool,
    /// Use local time for file naming, UTC when false
    pub local_time: bool,
    /// In-memory buffer capacity in bytes, 0 disables buffering
    pub buffer_size_bytes: i64,
    /// Periodic flush interval in seconds, 0 substitutes the default (5)
    pub flush_interval_secs: i64,
    /// Mirror every record to standard output
    pub write_to_console: bool,
    /// Write records to the rotating file
    pub write_to_file: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            label: DEFAULT_LABEL.to_string(),
            max_size_mb: 0,
            max_age_days: 0,
            max_backups: 0,
            compress: false,
            local_time: true,
            buffer_size_bytes: 0,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS as i64,
            write_to_console: false,
            write_to_file: true,
        }
    }
}

impl SinkConfig {
    /// Load config from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }

    /// Return a copy with every out-of-range field replaced by its default
    ///
    /// Negative thresholds become 0 (unlimited / disabled), a non-positive
    /// flush interval becomes the default, and an empty label falls back to
    /// the default label.
    pub fn normalized(&self) -> Self {
        let mut c = self.clone();
        if c.label.is_empty() {
            c.label = DEFAULT_LABEL.to_string();
        }
        if c.max_size_mb < 0 {
            c.max_size_mb = 0;
        }
        if c.max_age_days < 0 {
            c.max_age_days = 0;
        }
        if c.max_backups < 0 {
            c.max_backups = 0;
        }
        if c.buffer_size_bytes < 0 {
            c.buffer_size_bytes = 0;
        }
        if c.flush_interval_secs <= 0 {
            c.flush_interval_secs = DEFAULT_FLUSH_INTERVAL_SECS as i64;
        }
        c
    }

    /// Active file size limit in bytes, 0 means no limit
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.max(0) as u64 * 1024 * 1024
    }
}
