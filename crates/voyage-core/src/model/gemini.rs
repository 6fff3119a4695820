//! Gemini REST adapter.
//!
//! Calls `models/{model}:generateContent` for buffered answers and
//! `models/{model}:streamGenerateContent?alt=sse` for streamed ones, and
//! pulls the text parts out of each response object.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::sse::SseDecoder;
use super::trait_def::TextModel;
use super::types::{GenerationRequest, ModelError, TextStream};

/// Public Gemini API endpoint.
pub const DEFAULT_GEMINI_API: &str = "https://generativelanguage.googleapis.com";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// [`TextModel`] over the Gemini `v1beta` REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_GEMINI_API.to_owned(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different API host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{method}", self.base_url, self.model)
    }

    async fn post(
        &self,
        method: &str,
        request: &GenerationRequest,
        sse: bool,
    ) -> Result<reqwest::Response, ModelError> {
        let mut builder = self
            .http
            .post(self.endpoint(method))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request));
        if sse {
            builder = builder.query(&[("alt", "sse")]);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

/// JSON body for both generate endpoints.
pub fn request_body(request: &GenerationRequest) -> Value {
    let safety: Vec<Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_MEDIUM_AND_ABOVE" }))
        .collect();
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "safetySettings": safety,
    });
    if let Some(format) = request.response_format {
        body["generationConfig"] = json!({ "responseMimeType": format.mime_type() });
    }
    body
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// One decoded response object: its text and, when the candidate ended
/// for any reason other than a normal stop, that reason.
#[derive(Debug, Default, PartialEq)]
pub struct ResponseChunk {
    pub text: String,
    pub stopped: Option<String>,
}

impl ResponseChunk {
    fn into_result(self) -> Result<String, ModelError> {
        match self.stopped {
            Some(reason) => Err(ModelError::Stopped { reason }),
            None => Ok(self.text),
        }
    }
}

fn is_normal_finish(reason: &str) -> bool {
    matches!(reason, "STOP" | "FINISH_REASON_UNSPECIFIED")
}

/// Decode one response object.
///
/// An `error` object and a blocked prompt (feedback reason and no
/// candidates) are errors. A response with no text parts has empty text.
pub fn decode_response(payload: &str) -> Result<ResponseChunk, ModelError> {
    let resp: GenerateContentResponse =
        serde_json::from_str(payload).map_err(|e| ModelError::Decode(e.to_string()))?;
    if let Some(err) = resp.error {
        return Err(ModelError::Api {
            code: err.code,
            message: err.message,
        });
    }
    if resp.candidates.is_empty() {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ModelError::Blocked { reason });
        }
    }
    let Some(first) = resp.candidates.into_iter().next() else {
        return Ok(ResponseChunk::default());
    };
    let text = first
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    let stopped = first.finish_reason.filter(|r| !is_normal_finish(r));
    Ok(ResponseChunk { text, stopped })
}

/// Text of the first candidate of one complete response, failing when the
/// candidate was cut short.
pub fn response_text(payload: &str) -> Result<String, ModelError> {
    decode_response(payload)?.into_result()
}

// ---------------------------------------------------------------------------
// TextModel implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl TextModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let resp = self.post("generateContent", request, false).await?;
        let payload = resp.text().await?;
        let text = response_text(&payload)?;
        if text.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }

    async fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream, ModelError> {
        let resp = self.post("streamGenerateContent", request, true).await?;
        let model = self.model.clone();

        let stream = async_stream::stream! {
            let mut bytes = resp.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut chunks = 0usize;

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(ModelError::Request(e));
                        return;
                    }
                };
                for payload in decoder.feed(&chunk) {
                    match decode_response(&payload) {
                        Ok(ResponseChunk { text, stopped }) => {
                            if !text.is_empty() {
                                chunks += 1;
                                yield Ok(text);
                            }
                            if let Some(reason) = stopped {
                                yield Err(ModelError::Stopped { reason });
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            for payload in decoder.finish() {
                match decode_response(&payload) {
                    Ok(ResponseChunk { text, stopped }) => {
                        if !text.is_empty() {
                            chunks += 1;
                            yield Ok(text);
                        }
                        if let Some(reason) = stopped {
                            yield Err(ModelError::Stopped { reason });
                            return;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            debug!(model = %model, chunks, "model stream finished");
        };

        Ok(Box::pin(stream))
    }
}
