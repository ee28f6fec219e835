//! Answer resolution: OCR first, vision model as the fallback.
//!
//! When OCR reads anything, only that text goes to the (cheaper) text model. When it reads
//! nothing, the whole image is base64-encoded and sent to the vision model instead. Failures on
//! either path are logged and yield no answer; nothing here propagates out of a cycle.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::{error, info};

use crate::inference::{ChatCompletion, ChatRequest, InferenceError};
use crate::system::{extract_text, OcrEngine};

const DEFAULT_MIME_TYPE: &str = "image/png";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Failed to encode image: {0}")]
    Encode(std::io::Error),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    OcrText,
    Vision,
}

impl AnswerSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::OcrText => "OCR text",
            Self::Vision => "vision",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

pub struct AnswerResolver {
    ocr: Box<dyn OcrEngine>,
    chat: Box<dyn ChatCompletion>,
    text_model: String,
    vision_model: String,
}

impl AnswerResolver {
    pub fn new(
        ocr: Box<dyn OcrEngine>,
        chat: Box<dyn ChatCompletion>,
        text_model: impl Into<String>,
        vision_model: impl Into<String>,
    ) -> Self {
        Self {
            ocr,
            chat,
            text_model: text_model.into(),
            vision_model: vision_model.into(),
        }
    }

    /// Answers the quiz shown in `image`, or `None` if no answer could be obtained.
    pub fn resolve(&self, image: &Path) -> Option<Answer> {
        match self.try_resolve(image) {
            Ok(answer) => Some(answer),
            Err(e) => {
                error!(error = %e, path = %image.display(), "Error analyzing image");
                None
            }
        }
    }

    fn try_resolve(&self, image: &Path) -> Result<Answer, ResolveError> {
        if let Some(quiz_text) = extract_text(self.ocr.as_ref(), image) {
            info!(chars = quiz_text.len(), "Answering from OCR text");
            let request = ChatRequest::quiz_text(&self.text_model, &quiz_text);
            let text = self.chat.complete(&request)?;
            return Ok(Answer {
                text: text.trim().to_string(),
                source: AnswerSource::OcrText,
            });
        }

        info!("OCR unclear, falling back to vision model");
        let encoded = encode_image(image)?;
        let request =
            ChatRequest::quiz_image(&self.vision_model, encoded.mime_type, &encoded.base64);
        let text = self.chat.complete(&request)?;
        Ok(Answer {
            text: text.trim().to_string(),
            source: AnswerSource::Vision,
        })
    }
}

/// Raw image bytes ready for a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub base64: String,
}

/// Base64 (standard alphabet) of the raw file bytes, labelled with the format the bytes
/// actually hold. A screenshot that skipped normalization may not be PNG.
pub fn encode_image(image: &Path) -> Result<EncodedImage, ResolveError> {
    let bytes = fs::read(image).map_err(ResolveError::Encode)?;
    let mime_type = image::guess_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(DEFAULT_MIME_TYPE);
    Ok(EncodedImage {
        mime_type,
        base64: STANDARD.encode(bytes),
    })
}
