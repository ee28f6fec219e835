//! quiz-snap: answer the quiz on screen with one key press.
//!
//! Startup loads config, checks the credential, and builds the shared [`actions::Analyzer`];
//! only then is the key observer registered. A missing credential therefore stops the process
//! before any hotkey is live.

pub mod actions;
pub mod config;
pub mod hotkeys;
pub mod inference;
pub mod listener;
pub mod paths;
pub mod resolver;
pub mod system;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::actions::Analyzer;
use crate::config::{AppConfig, ConfigError};
use crate::hotkeys::HotkeyBindings;
use crate::inference::{InferenceError, OpenAiClient};
use crate::listener::ListenerError;
use crate::resolver::AnswerResolver;
use crate::system::{CaptureCommand, TesseractEngine};

pub const USAGE: &str = "Usage: quiz-snap [listen | once | analyze <image> | init-config]";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid hotkey configuration: {0}")]
    Hotkeys(String),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("Image not found: {0}")]
    MissingImage(PathBuf),
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Wait for hotkeys (default).
    Listen,
    /// Run a single capture cycle immediately.
    Once,
    /// Answer an existing image without capturing.
    Analyze(PathBuf),
    /// Write a default config file.
    InitConfig,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut args = args.iter().map(String::as_str);
        let command = match args.next() {
            None | Some("listen") => Self::Listen,
            Some("once") => Self::Once,
            Some("analyze") => {
                let path = args.next().ok_or_else(|| USAGE.to_string())?;
                Self::Analyze(PathBuf::from(path))
            }
            Some("init-config") => Self::InitConfig,
            Some("-h" | "--help" | "help") => return Err(USAGE.to_string()),
            Some(other) => return Err(format!("Unknown command: {other}\n{USAGE}")),
        };
        if let Some(extra) = args.next() {
            return Err(format!("Unexpected argument: {extra}\n{USAGE}"));
        }
        Ok(command)
    }
}

fn init_logging(config: &AppConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .try_init();
}

/// Builds the shared analyzer. Fails before anything is registered if the credential is missing.
pub fn build_analyzer(
    config: &AppConfig,
    env_api_key: Option<String>,
    env_base_url: Option<String>,
) -> Result<Analyzer, AppError> {
    let api_key = config.resolve_api_key(env_api_key)?;
    let base_url = config.resolve_api_base_url(env_base_url);

    match system::configure_tesseract_path(&config.tesseract_paths) {
        Some(path) => info!(path = %path.display(), "Tesseract configured"),
        None => info!("Using tesseract from PATH"),
    }

    let chat = OpenAiClient::new(
        &base_url,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let resolver = AnswerResolver::new(
        Box::new(TesseractEngine::new(config.ocr_language.clone())),
        Box::new(chat),
        config.text_model.clone(),
        config.vision_model.clone(),
    );

    let capture = CaptureCommand::resolve(config.capture_command.as_ref());
    if capture.is_none() {
        error!("No screenshot command available; set `capture_command` in the config");
    }

    Ok(Analyzer::new(
        resolver,
        capture,
        paths::screenshot_dir(config.screenshot_dir.as_deref()),
        config.max_dimension,
    ))
}

fn build_from_env(config: &AppConfig) -> Result<Analyzer, AppError> {
    build_analyzer(
        config,
        std::env::var(config::API_KEY_ENV).ok(),
        std::env::var(config::API_BASE_URL_ENV).ok(),
    )
}

fn print_instructions(bindings: &HotkeyBindings) {
    println!(
        "\nQuiz Answer Bot Ready!\n\
         Instructions:\n\
         1. Make sure the quiz is visible on screen\n\
         2. Press '{}' to analyze the current screen\n\
         3. Press '{}' to exit\n",
        bindings.trigger_label, bindings.quit_label
    );
}

/// Runs the key observer on the main thread. The quit key exits from inside the loop, so this
/// only returns when the observer fails.
fn listen(config: &AppConfig) -> Result<(), AppError> {
    let bindings = HotkeyBindings::from_config(config).map_err(AppError::Hotkeys)?;
    let analyzer = Arc::new(build_from_env(config)?);
    print_instructions(&bindings);

    let result = listener::run_trigger_loop(bindings, analyzer);
    println!("\nBot terminated");
    result.map_err(AppError::from)
}

pub fn run(command: Command) -> Result<(), AppError> {
    let dotenv = config::load_dotenv();
    let config = config::load_config();
    init_logging(&config);
    if let Some(path) = dotenv {
        debug!(path = %path.display(), "Loaded environment from .env");
    }

    match command {
        Command::Listen => {
            println!("Starting Quiz Answer Bot");
            listen(&config)
        }
        Command::Once => {
            let analyzer = build_from_env(&config)?;
            analyzer.run_cycle();
            Ok(())
        }
        Command::Analyze(path) => {
            if !path.is_file() {
                return Err(AppError::MissingImage(path));
            }
            let analyzer = build_from_env(&config)?;
            analyzer.analyze_file(&path);
            Ok(())
        }
        Command::InitConfig => {
            let path = config::require_config_path()?;
            if config::write_default_config(&path)? {
                println!("Wrote default config to {}", path.display());
            } else {
                println!("Config already exists at {}", path.display());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&[])).unwrap(), Command::Listen);
        assert_eq!(Command::parse(&args(&["listen"])).unwrap(), Command::Listen);
        assert_eq!(Command::parse(&args(&["once"])).unwrap(), Command::Once);
        assert_eq!(
            Command::parse(&args(&["analyze", "shot.png"])).unwrap(),
            Command::Analyze(PathBuf::from("shot.png"))
        );
        assert_eq!(
            Command::parse(&args(&["init-config"])).unwrap(),
            Command::InitConfig
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse(&args(&["analyze"])).is_err());
        assert!(Command::parse(&args(&["dance"])).is_err());
        assert!(Command::parse(&args(&["once", "extra"])).is_err());
        assert!(Command::parse(&args(&["--help"])).is_err());
    }

    #[test]
    fn test_missing_credential_is_fatal_before_registration() {
        let config = AppConfig::default();
        let err = build_analyzer(&config, None, None).err().unwrap();
        assert!(matches!(err, AppError::Config(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_blank_env_credential_is_missing() {
        let config = AppConfig::default();
        let err = build_analyzer(&config, Some("  ".to_string()), None)
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Config(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_analyzer_builds_with_credential() {
        let mut config = AppConfig::default();
        config.tesseract_paths = Vec::new();
        let analyzer = build_analyzer(&config, Some("sk-test".to_string()), None).unwrap();
        assert!(!analyzer.is_busy());
    }
}
