//! Trigger cycles: capture, normalize, resolve, print.
//!
//! [`Analyzer`] holds everything a cycle needs, built once at startup. Key presses call
//! [`Analyzer::trigger`], which runs at most one cycle at a time on a worker thread; a press
//! that arrives while a cycle is running is dropped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::resolver::{Answer, AnswerResolver};
use crate::system::{self, CaptureCommand};

const SEPARATOR_WIDTH: usize = 30;

pub struct Analyzer {
    resolver: AnswerResolver,
    capture: Option<CaptureCommand>,
    screenshot_dir: PathBuf,
    max_dimension: u32,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when a cycle ends, including by unwinding.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Analyzer {
    pub fn new(
        resolver: AnswerResolver,
        capture: Option<CaptureCommand>,
        screenshot_dir: PathBuf,
        max_dimension: u32,
    ) -> Self {
        Self {
            resolver,
            capture,
            screenshot_dir,
            max_dimension,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.busy)))
    }

    /// Starts a cycle on a worker thread unless one is already running.
    /// Returns false when the trigger was dropped.
    pub fn trigger(self: &Arc<Self>, source: &'static str) -> bool {
        let Some(guard) = self.try_acquire() else {
            warn!(source, "Analysis already in progress, ignoring trigger");
            println!("Analysis already in progress, ignoring key press");
            return false;
        };

        let analyzer = Arc::clone(self);
        let spawned = std::thread::Builder::new()
            .name("quiz-snap-cycle".to_string())
            .spawn(move || {
                let _guard = guard;
                analyzer.run_cycle();
            });

        match spawned {
            Ok(_) => {
                debug!(source, "Analysis cycle started");
                true
            }
            Err(e) => {
                error!(source, error = %e, "Failed to start analysis thread");
                false
            }
        }
    }

    /// Runs one full capture → normalize → resolve → print cycle on the calling thread.
    pub fn run_cycle(&self) -> Option<Answer> {
        println!("\nAnalyzing screen...");

        let path = match system::capture_screenshot(self.capture.as_ref(), &self.screenshot_dir) {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "Error taking screenshot");
                println!("Failed to take screenshot: {e}");
                return None;
            }
        };
        println!("Screenshot saved as: {}", path.display());

        let answer = self.analyze_file(&path);
        println!("Screenshot saved at: {}", path.display());
        answer
    }

    /// Normalizes and answers an existing screenshot file, printing the result.
    pub fn analyze_file(&self, path: &Path) -> Option<Answer> {
        if let Err(e) = system::normalize_image(path, self.max_dimension) {
            warn!(error = %e, path = %path.display(), "Error optimizing image, using original");
        }

        println!("Processing...");
        let answer = self.resolver.resolve(path);
        match &answer {
            Some(answer) => print_answer(answer),
            None => println!("Analysis failed"),
        }
        answer
    }
}

fn print_answer(answer: &Answer) {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    println!("\nResult ({}):", answer.source.label());
    println!("{separator}");
    println!("{}", answer.text);
    println!("{separator}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::testing::ScriptedChat;
    use crate::inference::InferenceError;
    use crate::resolver::AnswerSource;
    use crate::system::ocr::testing::ScriptedOcr;
    use image::{Rgb, RgbImage};
    use std::time::{Duration, Instant};

    fn analyzer(
        ocr: ScriptedOcr,
        chat: ScriptedChat,
        capture: Option<CaptureCommand>,
        dir: &Path,
    ) -> Analyzer {
        let resolver = AnswerResolver::new(Box::new(ocr), Box::new(chat), "text", "vision");
        Analyzer::new(resolver, capture, dir.to_path_buf(), 1500)
    }

    #[test]
    fn test_analyze_file_downscales_then_answers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.png");
        RgbImage::from_pixel(3000, 1500, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let analyzer = analyzer(
            ScriptedOcr::texts(&["Q: 2+2? A) 3 B) 4 C) 5"]),
            ScriptedChat::answering("B) 4"),
            None,
            dir.path(),
        );
        let answer = analyzer.analyze_file(&path).unwrap();
        assert_eq!(answer.text, "B) 4");
        assert_eq!(answer.source, AnswerSource::OcrText);

        let normalized = image::open(&path).unwrap();
        assert_eq!((normalized.width(), normalized.height()), (1500, 750));
    }

    #[test]
    fn test_normalize_failure_still_answers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-really.png");
        std::fs::write(&path, b"garbage").unwrap();

        let analyzer = analyzer(
            ScriptedOcr::texts(&["", ""]),
            ScriptedChat::answering("C"),
            None,
            dir.path(),
        );
        let answer = analyzer.analyze_file(&path).unwrap();
        assert_eq!(answer.source, AnswerSource::Vision);
    }

    #[test]
    fn test_capture_failure_aborts_cycle_only() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = analyzer(
            ScriptedOcr::texts(&["unused"]),
            ScriptedChat::answering("unused"),
            None,
            dir.path(),
        );
        assert_eq!(analyzer.run_cycle(), None);
        assert_eq!(analyzer.run_cycle(), None);
        assert!(!analyzer.is_busy());
    }

    #[test]
    fn test_inference_failure_yields_no_answer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.png");
        RgbImage::from_pixel(10, 10, Rgb([0, 0, 0])).save(&path).unwrap();

        let analyzer = analyzer(
            ScriptedOcr::texts(&["Q?"]),
            ScriptedChat::new(vec![Err(InferenceError::EmptyResponse)]),
            None,
            dir.path(),
        );
        assert_eq!(analyzer.analyze_file(&path), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_cycle_with_capture_command() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("capture.sh");
        // Copies a fixture PNG to the path given as the last argument.
        let fixture = dir.path().join("fixture.png");
        RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]))
            .save(&fixture)
            .unwrap();
        std::fs::write(
            &script,
            format!("#!/bin/sh\ncp '{}' \"$1\"\n", fixture.display()),
        )
        .unwrap();

        let shots = dir.path().join("shots");
        let capture = CaptureCommand {
            program: "sh".to_string(),
            args: vec![script.display().to_string()],
        };
        let analyzer = analyzer(
            ScriptedOcr::texts(&["Capital of France? A) Paris B) Rome"]),
            ScriptedChat::answering("A) Paris"),
            Some(capture),
            &shots,
        );

        let answer = analyzer.run_cycle().unwrap();
        assert_eq!(answer.text, "A) Paris");
        let saved: Vec<_> = std::fs::read_dir(&shots).unwrap().collect();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn test_trigger_is_not_reentrant() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Arc::new(analyzer(
            ScriptedOcr::texts(&[]),
            ScriptedChat::answering("unused"),
            None,
            dir.path(),
        ));

        let held = analyzer.try_acquire().unwrap();
        assert!(analyzer.is_busy());
        assert!(!analyzer.trigger("test"));
        drop(held);
        assert!(!analyzer.is_busy());

        assert!(analyzer.trigger("test"));
        let deadline = Instant::now() + Duration::from_secs(5);
        while analyzer.is_busy() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!analyzer.is_busy());
    }
}
