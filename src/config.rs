//! Configuration file support.
//!
//! Holds the tunables of the annotation core (history depth, zoom and pan
//! limits, export naming, log verbosity) and their JSON representation.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::format::{FormatRegistry, write_atomic};
use crate::undo::HistoryConfig;
use crate::viewport::ViewportConfig;

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
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

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

/// Annotation core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Undo history limits
    #[serde(default)]
    pub history: HistorySettings,

    /// Zoom and pan limits
    #[serde(default)]
    pub viewport: ViewportConfig,

    /// Export naming defaults
    #[serde(default)]
    pub export: ExportSettings,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Undo history section of the config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Maximum undo depth, absent for unbounded
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl From<&HistorySettings> for HistoryConfig {
    fn from(settings: &HistorySettings) -> Self {
        HistoryConfig {
            max_depth: settings.max_depth,
        }
    }
}

/// Export section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Format id used when none is chosen explicitly
    #[serde(default = "default_format")]
    pub default_format: String,

    /// Prefix of per-frame artifact names
    #[serde(default = "default_frame_prefix")]
    pub frame_prefix: String,

    /// Zero-padded width of the frame number
    #[serde(default = "default_frame_digits")]
    pub frame_digits: usize,

    /// Extension of the frame images referenced from VOC and COCO
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Subdirectory for per-frame label files, empty for a flat layout
    #[serde(default = "default_label_dir")]
    pub label_dir: String,
}

fn default_format() -> String {
    "yolo".to_string()
}

fn default_frame_prefix() -> String {
    "frame_".to_string()
}

fn default_frame_digits() -> usize {
    6
}

fn default_image_extension() -> String {
    "jpg".to_string()
}

fn default_label_dir() -> String {
    "labels".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            frame_prefix: default_frame_prefix(),
            frame_digits: default_frame_digits(),
            image_extension: default_image_extension(),
            label_dir: default_label_dir(),
        }
    }
}

impl AnnotatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            history: HistorySettings::default(),
            viewport: ViewportConfig::default(),
            export: ExportSettings::default(),
            log_level: LogLevel::default(),
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

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.viewport;
        if v.min_zoom.is_nan() || v.min_zoom <= 0.0 || !v.max_zoom.is_finite() || v.min_zoom > v.max_zoom
        {
            return Err(ConfigError::invalid(format!(
                "zoom range [{}, {}] is invalid",
                v.min_zoom, v.max_zoom
            )));
        }
        if !v.zoom_step.is_finite() || v.zoom_step <= 1.0 {
            return Err(ConfigError::invalid(format!(
                "zoom step must be greater than 1, got {}",
                v.zoom_step
            )));
        }
        if v.pan_margin.is_nan() || v.pan_margin < 0.0 {
            return Err(ConfigError::invalid(format!(
                "pan margin must not be negative, got {}",
                v.pan_margin
            )));
        }
        if self.history.max_depth == Some(0) {
            return Err(ConfigError::invalid("history depth must be at least 1"));
        }
        if self.export.frame_digits == 0 || self.export.frame_digits > 12 {
            return Err(ConfigError::invalid(format!(
                "frame digits must be between 1 and 12, got {}",
                self.export.frame_digits
            )));
        }
        if FormatRegistry::new().get(&self.export.default_format).is_none() {
            return Err(ConfigError::invalid(format!(
                "unknown default export format '{}'",
                self.export.default_format
            )));
        }
        let label_dir = Path::new(&self.export.label_dir);
        if label_dir.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(ConfigError::invalid(format!(
                "label directory must be a relative path, got '{}'",
                self.export.label_dir
            )));
        }
        Ok(())
    }

    /// Load configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes())?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// Value out of range
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
