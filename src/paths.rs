//! Path utilities for screenshot placement and naming.

use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Screenshot file name for a capture taken at `at`: `screenshot_<YYYYMMDD_HHMMSS>.png`.
pub fn screenshot_file_name(at: &DateTime<Local>) -> String {
    format!("screenshot_{}.png", at.format("%Y%m%d_%H%M%S"))
}

/// Directory screenshots are written to: the configured one, else the working directory.
pub fn screenshot_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Full path of a new screenshot taken now.
pub fn new_screenshot_path(dir: &Path) -> PathBuf {
    dir.join(screenshot_file_name(&Local::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_screenshot_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(screenshot_file_name(&at), "screenshot_20240307_090502.png");
    }

    #[test]
    fn test_screenshot_dir_prefers_configured() {
        let dir = screenshot_dir(Some(Path::new("/tmp/shots")));
        assert_eq!(dir, PathBuf::from("/tmp/shots"));
    }

    #[test]
    fn test_new_screenshot_path_is_inside_dir() {
        let path = new_screenshot_path(Path::new("/tmp/shots"));
        assert!(path.starts_with("/tmp/shots"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("screenshot_") && name.ends_with(".png"));
    }
}
