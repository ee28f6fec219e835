//! macOS default screenshot command.

use super::CaptureCommand;

/// `screencapture -x <path>`: full screen, no shutter sound.
pub(super) fn default_command() -> CaptureCommand {
    CaptureCommand {
        program: "screencapture".to_string(),
        args: vec!["-x".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_silent_full_screen() {
        let cmd = default_command();
        assert_eq!(cmd.program, "screencapture");
        assert_eq!(cmd.args, vec!["-x"]);
    }
}
