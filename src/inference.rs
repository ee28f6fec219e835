//! Chat-completions API client.
//!
//! Sends OpenAI-style `POST {base}/chat/completions` requests and returns the first choice's
//! message content. The client owns a small tokio runtime so synchronous trigger cycles can
//! drive the async reqwest client with `block_on`.
//!
//! Request builders for the two quiz prompts live here too: [`ChatRequest::quiz_text`] for OCR
//! output and [`ChatRequest::quiz_image`] for the vision fallback.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

const TEXT_SYSTEM_PROMPT: &str = "You are a quiz assistant. Quickly identify the question and options from the text, and provide the most likely answer. Be very concise.";

const VISION_SYSTEM_PROMPT: &str = "You are a quiz assistant. Quickly identify the question and options, and provide the most likely answer. Be very concise. If the answer is not supported by the text visible in the image, do not make one up from the prompt; only give the correct answer.";

const VISION_USER_PROMPT: &str = "What's the question and answer?";

pub const TEXT_MAX_TOKENS: u32 = 200;
pub const VISION_MAX_TOKENS: u32 = 300;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
    #[error("Failed to create async runtime: {0}")]
    Runtime(std::io::Error),
    #[error("Could not reach the inference API at {url}: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("Inference API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid inference API response: {0}")]
    InvalidResponse(String),
    #[error("Inference API returned no answer")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(content: MessageContent) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    /// Asks the text model to answer a quiz from OCR output.
    pub fn quiz_text(model: &str, quiz_text: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(TEXT_SYSTEM_PROMPT),
                ChatMessage::user(MessageContent::Text(format!(
                    "Analyze this quiz text and provide the answer:\n{quiz_text}"
                ))),
            ],
            max_tokens: TEXT_MAX_TOKENS,
            temperature: 1.0,
        }
    }

    /// Asks the vision model to read and answer a quiz from a base64-encoded image.
    pub fn quiz_image(model: &str, mime_type: &str, image_base64: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(VISION_SYSTEM_PROMPT),
                ChatMessage::user(MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: VISION_USER_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{mime_type};base64,{image_base64}"),
                        },
                    },
                ])),
            ],
            max_tokens: VISION_MAX_TOKENS,
            temperature: 0.0,
        }
    }

    /// True if any message carries an image part.
    pub fn has_image(&self) -> bool {
        self.messages.iter().any(|m| match &m.content {
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::ImageUrl { .. })),
            MessageContent::Text(_) => false,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extracts the answer from a successful response body. Whitespace-only answers are empty.
pub fn parse_chat_response(body: &str) -> Result<String, InferenceError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(InferenceError::EmptyResponse)
}

/// Builds the error for a non-success response, preferring the API's own message.
pub fn api_error(status: u16, body: &str) -> InferenceError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string());
    InferenceError::Api { status, message }
}

/// Text-in/answer-out (or image-in/answer-out) inference collaborator.
pub trait ChatCompletion: Send + Sync {
    fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    endpoint: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(InferenceError::Runtime)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Client(e.to_string()))?;

        let endpoint = chat_completions_url(base_url);
        debug!(endpoint = %endpoint, "Inference client created");

        Ok(Self {
            client,
            runtime,
            endpoint,
            api_key: api_key.into(),
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| InferenceError::Request {
                url: self.endpoint.clone(),
                source: e,
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Inference API returned error");
            return Err(api_error(status.as_u16(), &body));
        }
        parse_chat_response(&body)
    }
}

impl ChatCompletion for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        info!(
            model = %request.model,
            vision = request.has_image(),
            "Sending inference request"
        );
        self.runtime.block_on(self.send(request))
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim().trim_end_matches('/'))
}
