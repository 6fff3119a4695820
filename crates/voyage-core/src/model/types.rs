use std::pin::Pin;

use futures::Stream;

/// Lazy sequence of text chunks in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send>>;

/// Output format hint passed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
}

impl ResponseFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
        }
    }
}

/// A single-prompt generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub response_format: Option<ResponseFormat>,
}

impl GenerationRequest {
    /// Free-text request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_format: None,
        }
    }

    /// Request hinting that the answer should be a JSON document.
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_format: Some(ResponseFormat::Json),
        }
    }
}

/// Failures talking to the upstream model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model response: {0}")]
    Decode(String),

    #[error("prompt blocked by the model's safety filters: {reason}")]
    Blocked { reason: String },

    #[error("model API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("model stopped early: {reason}")]
    Stopped { reason: String },

    #[error("model returned no text")]
    EmptyResponse,
}
