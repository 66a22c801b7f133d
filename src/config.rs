//! Configuration file support for catalog-on-the-fly.
//!
//! Settings are stored as versioned JSON, either at an explicit path or in the
//! user's configuration directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DESCRIPTOR_EXTENSIONS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_HIGHLIGHT_SECONDS,
    DEFAULT_HIGHLIGHT_WIDTH,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Directory remote images are downloaded into
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Timeout for remote existence checks and downloads
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// How long a feature highlight stays visible
    #[serde(default = "default_highlight_seconds")]
    pub highlight_seconds: u64,

    /// Outline width of the highlight
    #[serde(default = "default_highlight_width")]
    pub highlight_width: u32,

    /// Extensions of preprocessed raster descriptors, which are not masked
    #[serde(default = "default_descriptor_extensions")]
    pub descriptor_extensions: Vec<String>,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_highlight_seconds() -> u64 {
    DEFAULT_HIGHLIGHT_SECONDS
}

fn default_highlight_width() -> u32 {
    DEFAULT_HIGHLIGHT_WIDTH
}

fn default_descriptor_extensions() -> Vec<String> {
    DEFAULT_DESCRIPTOR_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

/// Settings each catalog controller runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub scratch_dir: PathBuf,
    pub highlight_duration: Duration,
    pub highlight_width: u32,
    pub descriptor_extensions: Vec<String>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        CatalogConfig::default().controller_settings()
    }
}

impl ControllerSettings {
    pub fn is_descriptor(&self, path: &Path) -> bool {
        is_descriptor_path(path, &self.descriptor_extensions)
    }
}

/// Whether `path` is a preprocessed descriptor (case-insensitive extension match).
pub fn is_descriptor_path(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy())
        .is_some_and(|ext| extensions.iter().any(|d| d.eq_ignore_ascii_case(&ext)))
}

impl CatalogConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            scratch_dir: default_scratch_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            highlight_seconds: default_highlight_seconds(),
            highlight_width: default_highlight_width(),
            descriptor_extensions: default_descriptor_extensions(),
            log_level: LogLevel::default(),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            scratch_dir: self.scratch_dir.clone(),
            highlight_duration: Duration::from_secs(self.highlight_seconds),
            highlight_width: self.highlight_width,
            descriptor_extensions: self.descriptor_extensions.clone(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "catalog-otf.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("catalog-otf").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("catalog-otf")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
