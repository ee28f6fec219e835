//! Key bindings for the trigger loop.
//!
//! Reads the configured trigger and quit key names (e.g. `q`, `esc`, `f8`) and maps observed
//! key presses to [`AppAction`]s. Keys are observed passively, without modifiers, so the bound
//! keys still reach the focused application.

use rdev::Key;

use crate::config::AppConfig;

/// Action requested by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Analyze,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotkeyBindings {
    pub trigger: Key,
    pub quit: Key,
    pub trigger_label: &'static str,
    pub quit_label: &'static str,
}

impl HotkeyBindings {
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let (trigger, trigger_label) = parse_key(&config.trigger_key)?;
        let (quit, quit_label) = parse_key(&config.quit_key)?;
        if trigger == quit {
            return Err(format!(
                "Trigger and quit keys must differ (both are {trigger_label})"
            ));
        }
        Ok(Self {
            trigger,
            quit,
            trigger_label,
            quit_label,
        })
    }

    pub fn action_for_key(&self, key: Key) -> Option<AppAction> {
        if key == self.trigger {
            Some(AppAction::Analyze)
        } else if key == self.quit {
            Some(AppAction::Quit)
        } else {
            None
        }
    }
}

// --- Parsing ---

/// Parses a key name into the observed key and its display label.
pub fn parse_key(raw: &str) -> Result<(Key, &'static str), String> {
    let parsed = match raw.trim().to_lowercase().as_str() {
        "a" => (Key::KeyA, "A"),
        "b" => (Key::KeyB, "B"),
        "c" => (Key::KeyC, "C"),
        "d" => (Key::KeyD, "D"),
        "e" => (Key::KeyE, "E"),
        "f" => (Key::KeyF, "F"),
        "g" => (Key::KeyG, "G"),
        "h" => (Key::KeyH, "H"),
        "i" => (Key::KeyI, "I"),
        "j" => (Key::KeyJ, "J"),
        "k" => (Key::KeyK, "K"),
        "l" => (Key::KeyL, "L"),
        "m" => (Key::KeyM, "M"),
        "n" => (Key::KeyN, "N"),
        "o" => (Key::KeyO, "O"),
        "p" => (Key::KeyP, "P"),
        "q" => (Key::KeyQ, "Q"),
        "r" => (Key::KeyR, "R"),
        "s" => (Key::KeyS, "S"),
        "t" => (Key::KeyT, "T"),
        "u" => (Key::KeyU, "U"),
        "v" => (Key::KeyV, "V"),
        "w" => (Key::KeyW, "W"),
        "x" => (Key::KeyX, "X"),
        "y" => (Key::KeyY, "Y"),
        "z" => (Key::KeyZ, "Z"),
        "0" => (Key::Num0, "0"),
        "1" => (Key::Num1, "1"),
        "2" => (Key::Num2, "2"),
        "3" => (Key::Num3, "3"),
        "4" => (Key::Num4, "4"),
        "5" => (Key::Num5, "5"),
        "6" => (Key::Num6, "6"),
        "7" => (Key::Num7, "7"),
        "8" => (Key::Num8, "8"),
        "9" => (Key::Num9, "9"),
        "f1" => (Key::F1, "F1"),
        "f2" => (Key::F2, "F2"),
        "f3" => (Key::F3, "F3"),
        "f4" => (Key::F4, "F4"),
        "f5" => (Key::F5, "F5"),
        "f6" => (Key::F6, "F6"),
        "f7" => (Key::F7, "F7"),
        "f8" => (Key::F8, "F8"),
        "f9" => (Key::F9, "F9"),
        "f10" => (Key::F10, "F10"),
        "f11" => (Key::F11, "F11"),
        "f12" => (Key::F12, "F12"),
        "esc" | "escape" => (Key::Escape, "Esc"),
        "space" => (Key::Space, "Space"),
        "tab" => (Key::Tab, "Tab"),
        "enter" | "return" => (Key::Return, "Enter"),
        other => return Err(format!("Unsupported hotkey key: {other}")),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = HotkeyBindings::from_config(&AppConfig::default()).unwrap();
        assert_eq!(bindings.trigger, Key::KeyQ);
        assert_eq!(bindings.quit, Key::Escape);
        assert_eq!(bindings.trigger_label, "Q");
        assert_eq!(bindings.quit_label, "Esc");
    }

    #[test]
    fn test_action_for_key() {
        let bindings = HotkeyBindings::from_config(&AppConfig::default()).unwrap();
        assert_eq!(bindings.action_for_key(Key::KeyQ), Some(AppAction::Analyze));
        assert_eq!(bindings.action_for_key(Key::Escape), Some(AppAction::Quit));
        assert_eq!(bindings.action_for_key(Key::KeyW), None);
    }

    #[test]
    fn test_parse_key_is_case_and_space_insensitive() {
        assert_eq!(parse_key(" F8 ").unwrap(), (Key::F8, "F8"));
        assert_eq!(parse_key("Escape").unwrap().0, Key::Escape);
        assert_eq!(parse_key("7").unwrap().0, Key::Num7);
    }

    #[test]
    fn test_parse_key_rejects_unknown() {
        assert!(parse_key("ctrl+q").is_err());
        assert!(parse_key("").is_err());
    }

    #[test]
    fn test_identical_keys_rejected() {
        let mut config = AppConfig::default();
        config.quit_key = "Q".to_string();
        assert!(HotkeyBindings::from_config(&config).is_err());
    }
}
