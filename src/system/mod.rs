//! System interactions (screenshot, image normalization, OCR)

mod normalize;
pub(crate) mod ocr;
mod screenshot;

pub use normalize::{normalize_image, target_dimensions, ImageError};
pub use ocr::{
    configure_tesseract_path, extract_text, resolve_tesseract_path, OcrEngine, OcrError,
    PageSegMode, TesseractEngine,
};
pub use screenshot::{capture_screenshot, CaptureCommand, ScreenshotError};
