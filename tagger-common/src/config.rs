//! Configuration loading and setting resolution
//!
//! Bootstrap configuration comes from an optional TOML file. Each setting is
//! resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the client logs a warning and
//! runs on compiled defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::{
    PitchOptions, DEFAULT_FIELD_LENGTH, DEFAULT_FIELD_WIDTH, DEFAULT_GRID_COLUMNS,
    DEFAULT_GRID_ROWS,
};
use crate::{Error, Result};

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "TAGGER_API_URL";
/// Environment variable overriding the local data directory
pub const DATA_DIR_ENV: &str = "TAGGER_DATA_DIR";
/// Environment variable overriding the download directory
pub const DOWNLOAD_DIR_ENV: &str = "TAGGER_DOWNLOAD_DIR";

/// Backend base URL when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const APP_DIR_NAME: &str = "event-tagger";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Backend base URL (without the `/api` suffix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Directory holding local storage (session id, tags)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Directory exported files are downloaded into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pitch: PitchConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Pitch grid and field dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchConfig {
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default = "default_field_length")]
    pub field_length: f64,
    #[serde(default = "default_field_width")]
    pub field_width: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_GRID_ROWS,
            columns: DEFAULT_GRID_COLUMNS,
            field_length: DEFAULT_FIELD_LENGTH,
            field_width: DEFAULT_FIELD_WIDTH,
        }
    }
}

impl From<PitchConfig> for PitchOptions {
    fn from(config: PitchConfig) -> Self {
        PitchOptions {
            rows: config.rows,
            columns: config.columns,
            field_length: config.field_length,
            field_width: config.field_width,
        }
    }
}

fn default_rows() -> u32 {
    DEFAULT_GRID_ROWS
}

fn default_columns() -> u32 {
    DEFAULT_GRID_COLUMNS
}

fn default_field_length() -> f64 {
    DEFAULT_FIELD_LENGTH
}

fn default_field_width() -> f64 {
    DEFAULT_FIELD_WIDTH
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pitch.rows == 0 || self.pitch.columns == 0 {
            return Err(Error::Config(format!(
                "pitch grid must be at least 1x1 (got {}x{})",
                self.pitch.rows, self.pitch.columns
            )));
        }
        if self.pitch.field_length <= 0.0 || self.pitch.field_width <= 0.0 {
            return Err(Error::Config("pitch field dimensions must be positive".to_string()));
        }
        Ok(())
    }

    /// Load configuration
    ///
    /// An explicitly requested file must exist and parse. Without one, the
    /// platform default location is tried; if it is absent the compiled
    /// defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                warn!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Platform config file location (`<config_dir>/event-tagger/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./event_tagger_data"))
}

/// OS-dependent default download directory
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Read a non-empty environment variable
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Settings after applying the resolution priority
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
    pub logging: LoggingConfig,
    pub pitch: PitchConfig,
}

/// Command-line overrides, highest priority
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Resolve every setting: CLI, then environment, then TOML, then default
pub fn resolve_settings(cli: &CliOverrides, toml: &TomlConfig) -> ResolvedSettings {
    let api_url = cli
        .api_url
        .clone()
        .or_else(|| env_value(API_URL_ENV))
        .or_else(|| toml.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| env_value(DATA_DIR_ENV).map(PathBuf::from))
        .or_else(|| toml.data_dir.clone())
        .unwrap_or_else(default_data_dir);

    let download_dir = cli
        .download_dir
        .clone()
        .or_else(|| env_value(DOWNLOAD_DIR_ENV).map(PathBuf::from))
        .or_else(|| toml.download_dir.clone())
        .unwrap_or_else(default_download_dir);

    let mut logging = toml.logging.clone();
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }

    ResolvedSettings {
        api_url: api_url.trim_end_matches('/').to_string(),
        data_dir,
        download_dir,
        logging,
        pitch: toml.pitch,
    }
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
