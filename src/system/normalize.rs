//! Screenshot normalization before OCR and upload.
//!
//! Converts to RGB, bounds the longest edge, and re-encodes the PNG in place so both the
//! OCR pass and a possible vision upload work on a smaller file.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("Failed to write image: {0}")]
    Write(std::io::Error),
    #[error("Failed to encode image: {0}")]
    Encode(image::ImageError),
}

/// Size after bounding the longer side to `max_dimension`, keeping the aspect ratio.
///
/// The longer side becomes exactly `max_dimension`; the shorter side is truncated, never below 1.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension || max_dimension == 0 {
        return (width, height);
    }

    let scale = |dim: u32| -> u32 {
        let scaled = u64::from(dim) * u64::from(max_dimension) / u64::from(longest);
        (scaled as u32).max(1)
    };

    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Normalizes the image at `path` in place and returns its final dimensions.
pub fn normalize_image(path: &Path, max_dimension: u32) -> Result<(u32, u32), ImageError> {
    let img = image::open(path).map_err(ImageError::Decode)?;
    let (width, height) = (img.width(), img.height());

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let (new_width, new_height) = target_dimensions(width, height, max_dimension);
    let normalized = if (new_width, new_height) != (width, height) {
        debug!(width, height, new_width, new_height, "Downscaling screenshot");
        rgb.resize_exact(new_width, new_height, FilterType::Lanczos3)
    } else {
        rgb
    };

    let mut encoded = Cursor::new(Vec::new());
    let encoder =
        PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, PngFilter::Adaptive);
    normalized
        .write_with_encoder(encoder)
        .map_err(ImageError::Encode)?;
    replace_file(path, encoded.get_ref())?;

    info!(
        path = %path.display(),
        width = new_width,
        height = new_height,
        "Screenshot normalized"
    );
    Ok((new_width, new_height))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Swaps `bytes` in for the file at `path`. The original stays intact if writing fails.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), ImageError> {
    let staging = staging_path(path);
    let result = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result.map_err(ImageError::Write)
}
