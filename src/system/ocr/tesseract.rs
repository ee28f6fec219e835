//! Tesseract OCR engine using rusty-tesseract.
//!
//! rusty-tesseract runs the `tesseract` binary found on `PATH`, so a binary found at one of the
//! configured locations is made visible by prepending its directory to `PATH` once at startup.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use rusty_tesseract::{Args, Image};
use tracing::{debug, info};

use super::{OcrEngine, OcrError, PageSegMode};

/// Default OCR Engine Mode (LSTM when available).
const OEM_DEFAULT: i32 = 3;

pub struct TesseractEngine {
    lang: String,
}

impl TesseractEngine {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }

    fn args(&self, mode: PageSegMode) -> Args {
        Args {
            lang: self.lang.clone(),
            config_variables: HashMap::new(),
            dpi: Some(150),
            psm: Some(mode.psm()),
            oem: Some(OEM_DEFAULT),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn image_to_string(&self, image: &Path, mode: PageSegMode) -> Result<String, OcrError> {
        let tess_img = Image::from_path(image).map_err(|e| OcrError::ImageLoad(e.to_string()))?;
        debug!(path = %image.display(), psm = mode.psm(), "Running tesseract");
        rusty_tesseract::image_to_string(&tess_img, &self.args(mode))
            .map_err(|e| OcrError::Tesseract(e.to_string()))
    }
}

/// First candidate that exists on disk.
pub fn resolve_tesseract_path(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// Makes the first existing candidate the `tesseract` that rusty-tesseract will run.
///
/// Must be called before any other thread is started. Returns the chosen binary, or `None` when
/// no candidate exists and `PATH` lookup is left as is.
pub fn configure_tesseract_path(candidates: &[PathBuf]) -> Option<PathBuf> {
    let binary = resolve_tesseract_path(candidates)?;
    let dir = binary.parent()?;

    let mut search: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Some(existing) = env::var_os("PATH") {
        search.extend(env::split_paths(&existing).filter(|p| p != dir));
    }
    match env::join_paths(search) {
        Ok(joined) => {
            env::set_var("PATH", joined);
            info!(path = %binary.display(), "Using tesseract binary");
            Some(binary)
        }
        Err(e) => {
            debug!(error = %e, "Could not extend PATH for tesseract");
            None
        }
    }
}
