//! Global key observer and the blocking trigger loop.
//!
//! `rdev::listen` runs on the calling thread, which must be the main thread: on macOS the
//! event tap resolves key names through the keyboard layout, and that lookup is only allowed
//! there. The observer never returns while it is healthy, so the quit key ends the process
//! from inside the callback. An in-flight cycle on its worker thread is not waited for.

use std::sync::Arc;

use rdev::{Event, EventType};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::Analyzer;
use crate::hotkeys::{AppAction, HotkeyBindings};

#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("Key observer failed: {0}")]
    Observer(String),
    #[error("Key observer stopped unexpectedly")]
    Stopped,
}

/// Routes one observed event. Returns true when the quit key was pressed.
fn handle_event(
    event_type: &EventType,
    bindings: &HotkeyBindings,
    analyzer: &Arc<Analyzer>,
) -> bool {
    let EventType::KeyPress(key) = event_type else {
        return false;
    };

    match bindings.action_for_key(*key) {
        Some(AppAction::Analyze) => {
            analyzer.trigger("hotkey");
            false
        }
        Some(AppAction::Quit) => {
            debug!("Quit key pressed");
            true
        }
        None => false,
    }
}

fn terminate() -> ! {
    info!("Quit requested");
    println!("\nBot terminated");
    std::process::exit(0);
}

/// Observes keys on the calling thread until the quit key ends the process.
///
/// Returns only if the observer could not start or stopped on its own.
pub fn run_trigger_loop(
    bindings: HotkeyBindings,
    analyzer: Arc<Analyzer>,
) -> Result<(), ListenerError> {
    info!(
        trigger = bindings.trigger_label,
        quit = bindings.quit_label,
        "Listening for hotkeys"
    );

    let result = rdev::listen(move |event: Event| {
        if handle_event(&event.event_type, &bindings, &analyzer) {
            terminate();
        }
    });

    match result {
        Ok(()) => Err(ListenerError::Stopped),
        Err(e) => {
            let message = format!("{e:?}");
            warn!(error = %message, "Key observer failed");
            Err(ListenerError::Observer(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::inference::testing::ScriptedChat;
    use crate::resolver::AnswerResolver;
    use crate::system::ocr::testing::ScriptedOcr;
    use rdev::Key;

    fn fixtures() -> (HotkeyBindings, Arc<Analyzer>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AnswerResolver::new(
            Box::new(ScriptedOcr::texts(&[])),
            Box::new(ScriptedChat::answering("unused")),
            "text",
            "vision",
        );
        let analyzer = Arc::new(Analyzer::new(
            resolver,
            None,
            dir.path().to_path_buf(),
            1500,
        ));
        let bindings = HotkeyBindings::from_config(&AppConfig::default()).unwrap();
        (bindings, analyzer, dir)
    }

    #[test]
    fn test_quit_key_requests_exit() {
        let (bindings, analyzer, _dir) = fixtures();
        assert!(handle_event(
            &EventType::KeyPress(Key::Escape),
            &bindings,
            &analyzer
        ));
        assert!(!analyzer.is_busy());
    }

    #[test]
    fn test_releases_and_unbound_keys_are_ignored() {
        let (bindings, analyzer, _dir) = fixtures();
        assert!(!handle_event(
            &EventType::KeyRelease(Key::Escape),
            &bindings,
            &analyzer
        ));
        assert!(!handle_event(
            &EventType::KeyPress(Key::KeyA),
            &bindings,
            &analyzer
        ));
        assert!(!analyzer.is_busy());
    }

    #[test]
    fn test_trigger_key_does_not_request_exit() {
        let (bindings, analyzer, _dir) = fixtures();
        assert!(!handle_event(
            &EventType::KeyPress(Key::KeyQ),
            &bindings,
            &analyzer
        ));
    }
}
