//! OCR (Optical Character Recognition) functionality
//!
//! [`extract_text`] tries page segmentation modes in a fixed order and returns the first
//! non-empty result. Engine failures are logged and read as "no text", which sends the caller
//! down the vision path.

mod tesseract;

pub use tesseract::{configure_tesseract_path, resolve_tesseract_path, TesseractEngine};

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to load image for OCR: {0}")]
    ImageLoad(String),
    #[error("Tesseract error: {0}")]
    Tesseract(String),
}

/// Tesseract page segmentation modes used by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// Assume a single uniform block of text (psm 6).
    SingleBlock,
    /// Fully automatic page segmentation (psm 3).
    Auto,
}

impl PageSegMode {
    pub fn psm(&self) -> i32 {
        match self {
            Self::SingleBlock => 6,
            Self::Auto => 3,
        }
    }
}

/// Order in which segmentation modes are attempted.
pub const SEGMENTATION_ORDER: [PageSegMode; 2] = [PageSegMode::SingleBlock, PageSegMode::Auto];

/// Image-in, text-out OCR collaborator.
pub trait OcrEngine: Send + Sync {
    fn image_to_string(&self, image: &Path, mode: PageSegMode) -> Result<String, OcrError>;
}

/// Returns the first non-empty trimmed OCR result, or `None` if nothing readable was found.
pub fn extract_text(engine: &dyn OcrEngine, image: &Path) -> Option<String> {
    for mode in SEGMENTATION_ORDER {
        match engine.image_to_string(image, mode) {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    info!(psm = mode.psm(), chars = text.len(), "OCR found text");
                    return Some(text.to_string());
                }
                debug!(psm = mode.psm(), "OCR returned no text");
            }
            Err(e) => {
                warn!(error = %e, psm = mode.psm(), "OCR failed");
                return None;
            }
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedOcr;
    use super::*;

    #[test]
    fn test_first_mode_result_wins() {
        let engine = ScriptedOcr::texts(&["  Q: 2+2? A) 3 B) 4 C) 5 \n", "ignored"]);
        let text = extract_text(&engine, Path::new("shot.png"));
        assert_eq!(text.as_deref(), Some("Q: 2+2? A) 3 B) 4 C) 5"));
        assert_eq!(engine.modes(), vec![PageSegMode::SingleBlock]);
    }

    #[test]
    fn test_falls_back_to_automatic_segmentation() {
        let engine = ScriptedOcr::texts(&[" \n\t ", "Which planet is largest?"]);
        let text = extract_text(&engine, Path::new("shot.png"));
        assert_eq!(text.as_deref(), Some("Which planet is largest?"));
        assert_eq!(
            engine.modes(),
            vec![PageSegMode::SingleBlock, PageSegMode::Auto]
        );
    }

    #[test]
    fn test_whitespace_only_everywhere_is_none() {
        let engine = ScriptedOcr::texts(&["   ", "\n\n"]);
        assert_eq!(extract_text(&engine, Path::new("shot.png")), None);
        assert_eq!(engine.modes().len(), 2);
    }

    #[test]
    fn test_engine_error_is_treated_as_no_text() {
        let engine = ScriptedOcr::new(vec![Err(OcrError::Tesseract(
            "tesseract not found".to_string(),
        ))]);
        assert_eq!(extract_text(&engine, Path::new("shot.png")), None);
        assert_eq!(engine.modes(), vec![PageSegMode::SingleBlock]);
    }

    #[test]
    fn test_psm_values() {
        assert_eq!(PageSegMode::SingleBlock.psm(), 6);
        assert_eq!(PageSegMode::Auto.psm(), 3);
    }
}
