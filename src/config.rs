//! Configuration handling for quiz-snap.
//!
//! Reads configuration from a JSON file:
//! `~/.config/quiz-snap/config.json`.
//!
//! Every field is optional on disk; missing or blank values fall back to defaults. The resolved
//! config is built once at startup and shared read-only with every trigger cycle.
//!
//! A `.env` file in the working directory can supply `OPENAI_API_KEY` and the other
//! environment overrides; variables already set in the environment win.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const APP_CONFIG_DIR_NAME: &str = "quiz-snap";
const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable holding the inference provider credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the inference API base URL.
pub const API_BASE_URL_ENV: &str = "QUIZ_SNAP_API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TRIGGER_KEY: &str = "q";
pub const DEFAULT_QUIT_KEY: &str = "esc";
pub const DEFAULT_MAX_DIMENSION: u32 = 1500;
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Locations checked, in order, for the tesseract binary.
pub const DEFAULT_TESSERACT_PATHS: &[&str] =
    &["/usr/local/bin/tesseract", "/opt/homebrew/bin/tesseract"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("No config directory available on this platform")]
    NoConfigDir,
    #[error("API key not found: set OPENAI_API_KEY or `api_key` in the config file")]
    MissingApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" | "WARNING" => Some(Self::Warn),
            "INFO" => Some(Self::Info),
            "DEBUG" => Some(Self::Debug),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// External screenshot command. The output path is appended as the last argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureCommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    text_model: Option<String>,
    #[serde(default)]
    vision_model: Option<String>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    trigger_key: Option<String>,
    #[serde(default)]
    quit_key: Option<String>,
    #[serde(default)]
    screenshot_dir: Option<PathBuf>,
    #[serde(default)]
    max_dimension: Option<u32>,
    #[serde(default)]
    ocr_language: Option<String>,
    #[serde(default)]
    tesseract_paths: Option<Vec<PathBuf>>,
    #[serde(default)]
    capture_command: Option<CaptureCommandConfig>,
}

/// Effective configuration with defaults applied.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub text_model: String,
    pub vision_model: String,
    pub request_timeout_secs: u64,
    pub trigger_key: String,
    pub quit_key: String,
    /// Where screenshots are written. `None` means the working directory.
    pub screenshot_dir: Option<PathBuf>,
    pub max_dimension: u32,
    pub ocr_language: String,
    pub tesseract_paths: Vec<PathBuf>,
    pub capture_command: Option<CaptureCommandConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl AppConfig {
    fn from_raw(raw: RawConfig) -> Self {
        let log_level = raw
            .log_level
            .as_deref()
            .and_then(LogLevel::from_str)
            .unwrap_or_default();

        Self {
            log_level,
            api_key: non_empty(raw.api_key),
            api_base_url: non_empty(raw.api_base_url),
            text_model: non_empty(raw.text_model)
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            vision_model: non_empty(raw.vision_model)
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            request_timeout_secs: raw
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            trigger_key: non_empty(raw.trigger_key)
                .unwrap_or_else(|| DEFAULT_TRIGGER_KEY.to_string()),
            quit_key: non_empty(raw.quit_key).unwrap_or_else(|| DEFAULT_QUIT_KEY.to_string()),
            screenshot_dir: raw.screenshot_dir.filter(|p| !p.as_os_str().is_empty()),
            max_dimension: raw
                .max_dimension
                .filter(|dim| *dim > 0)
                .unwrap_or(DEFAULT_MAX_DIMENSION),
            ocr_language: non_empty(raw.ocr_language)
                .unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
            tesseract_paths: raw
                .tesseract_paths
                .filter(|paths| !paths.is_empty())
                .unwrap_or_else(|| DEFAULT_TESSERACT_PATHS.iter().map(PathBuf::from).collect()),
            capture_command: raw
                .capture_command
                .filter(|cmd| !cmd.program.trim().is_empty()),
        }
    }

    /// Parses a config document. Unknown keys are ignored.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(data)?;
        Ok(Self::from_raw(raw))
    }

    /// The credential: environment first, then the config file. Blank values count as missing.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Result<String, ConfigError> {
        non_empty(env_value)
            .or_else(|| self.api_key.clone())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Base URL precedence: config, then env, then the public endpoint.
    pub fn resolve_api_base_url(&self, env_value: Option<String>) -> String {
        self.api_base_url
            .clone()
            .or_else(|| non_empty(env_value))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }
}

pub fn config_path() -> Option<PathBuf> {
    let path = config_dir()?
        .join(APP_CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);
    Some(path)
}

fn ensure_config_dir_exists(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Reads a config file. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        debug!(?path, "Config file does not exist, using defaults");
        return Ok(AppConfig::default());
    }

    let data = fs::read_to_string(path)?;
    let cfg = AppConfig::from_json(&data)?;
    debug!(?path, "Config loaded");
    Ok(cfg)
}

/// Loads the user config, falling back to defaults when it is absent or unreadable.
///
/// Runs before logging is initialised, so failures go to stderr.
pub fn load_config() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };

    match load_config_from(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!(
                "Config: failed to load {}, using defaults: {err}",
                path.display()
            );
            AppConfig::default()
        }
    }
}

/// Loads `KEY=value` pairs from `path` into the process environment.
/// Variables that are already set keep their values.
pub fn load_dotenv_from(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path)?;
    Ok(())
}

/// Loads `.env` from the working directory or one of its parents, if there is one.
///
/// Like [`load_config`], this runs before logging is initialised.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(err) if err.not_found() => None,
        Err(err) => {
            eprintln!("Config: failed to load .env: {err}");
            None
        }
    }
}

/// Writes a default config file to `path` unless one exists. Returns true if a file was written.
pub fn write_default_config(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        warn!(?path, "Config file already exists, leaving it untouched");
        return Ok(false);
    }

    ensure_config_dir_exists(path)?;
    let defaults = AppConfig::default();
    let raw = RawConfig {
        log_level: Some(defaults.log_level.as_filter().to_string()),
        api_key: None,
        api_base_url: None,
        text_model: Some(defaults.text_model),
        vision_model: Some(defaults.vision_model),
        request_timeout_secs: Some(defaults.request_timeout_secs),
        trigger_key: Some(defaults.trigger_key),
        quit_key: Some(defaults.quit_key),
        screenshot_dir: None,
        max_dimension: Some(defaults.max_dimension),
        ocr_language: Some(defaults.ocr_language),
        tesseract_paths: Some(defaults.tesseract_paths),
        capture_command: None,
    };
    let data = serde_json::to_string_pretty(&raw)?;
    fs::write(path, data)?;
    debug!(?path, "Default config written");
    Ok(true)
}

/// Default config location, or an error on platforms without one.
pub fn require_config_path() -> Result<PathBuf, ConfigError> {
    config_path().ok_or(ConfigError::NoConfigDir)
}
