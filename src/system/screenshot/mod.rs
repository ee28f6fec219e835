//! Screenshot capture via an external command.
//!
//! The capture tool is a black box: it is given an output path and must leave a PNG there.
//! macOS has a built-in default (`screencapture`); elsewhere the command comes from config.

#[cfg(target_os = "macos")]
mod macos;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::CaptureCommandConfig;
use crate::paths;

#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error("Failed to create screenshot directory: {0}")]
    CreateDir(std::io::Error),
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Screenshot command failed: {0}")]
    CommandFailed(String),
    #[error("Screenshot file was not created: {0}")]
    MissingOutput(PathBuf),
    #[error("No screenshot command for this platform; set `capture_command` in the config")]
    Unsupported,
}

/// External program plus leading arguments. The output path is appended last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl CaptureCommand {
    /// Configured command if any, else the platform default.
    pub fn resolve(configured: Option<&CaptureCommandConfig>) -> Option<Self> {
        match configured {
            Some(cfg) => Some(Self {
                program: cfg.program.clone(),
                args: cfg.args.clone(),
            }),
            None => Self::platform_default(),
        }
    }

    #[cfg(target_os = "macos")]
    pub fn platform_default() -> Option<Self> {
        Some(macos::default_command())
    }

    #[cfg(not(target_os = "macos"))]
    pub fn platform_default() -> Option<Self> {
        None
    }
}

/// Captures the screen into a timestamped PNG inside `dir` and returns its path.
pub fn capture_screenshot(
    command: Option<&CaptureCommand>,
    dir: &Path,
) -> Result<PathBuf, ScreenshotError> {
    let command = command.ok_or(ScreenshotError::Unsupported)?;
    fs::create_dir_all(dir).map_err(ScreenshotError::CreateDir)?;
    let path = paths::new_screenshot_path(dir);
    run_capture(command, &path)?;
    Ok(path)
}

fn run_capture(command: &CaptureCommand, path: &Path) -> Result<(), ScreenshotError> {
    debug!(program = %command.program, path = %path.display(), "Running screenshot command");

    let output = Command::new(&command.program)
        .args(&command.args)
        .arg(path)
        .output()
        .map_err(|e| ScreenshotError::Spawn {
            program: command.program.clone(),
            source: e,
        })?;

    if !output.status.success() {
        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let error_msg = if stderr.trim().is_empty() {
            format!("{} exited with code {}", command.program, exit_code)
        } else {
            format!("{}: {}", command.program, stderr.trim())
        };
        error!(error = %error_msg, "Screenshot capture failed");
        return Err(ScreenshotError::CommandFailed(error_msg));
    }

    if !path.exists() {
        error!(path = %path.display(), "Screenshot file was not created");
        return Err(ScreenshotError::MissingOutput(path.to_path_buf()));
    }

    info!(path = %path.display(), "Screenshot captured");
    Ok(())
}
