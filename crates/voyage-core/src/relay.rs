//! Generation relay: one upstream model call, forwarded or materialized.

use std::sync::Arc;

use futures::{Stream, StreamExt, future, stream};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::DispatchError;
use crate::extract::parse_json_document;
use crate::model::{GenerationRequest, ModelError, TextModel, TextStream};

/// Longest slice of raw model output written to the log on a parse failure.
const RAW_LOG_LIMIT: usize = 2000;

// ---------------------------------------------------------------------------
// Action results
// ---------------------------------------------------------------------------

/// Body of an [`ActionResult`].
pub enum ActionBody {
    Json(Value),
    /// Raw text chunks to be written to the client as they arrive.
    Stream(TextStream),
}

impl std::fmt::Debug for ActionBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Uniform `{status, body}` returned by every dispatched action.
#[derive(Debug)]
pub struct ActionResult {
    pub status: u16,
    pub body: ActionBody,
}

impl ActionResult {
    pub fn ok(value: Value) -> Self {
        Self {
            status: 200,
            body: ActionBody::Json(value),
        }
    }

    pub fn stream(stream: TextStream) -> Self {
        Self {
            status: 200,
            body: ActionBody::Stream(stream),
        }
    }

    /// `{ "error": message }` with the given status.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ActionBody::Json(serde_json::json!({ "error": message.into() })),
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.body, ActionBody::Stream(_))
    }

    /// The JSON body, or `None` for a streamed result.
    pub fn into_json(self) -> Option<Value> {
        match self.body {
            ActionBody::Json(v) => Some(v),
            ActionBody::Stream(_) => None,
        }
    }
}

impl From<DispatchError> for ActionResult {
    fn from(e: DispatchError) -> Self {
        Self::error(e.status(), e.client_message())
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// How the relay consumes the upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// One non-streaming call; the full text is reduced to JSON.
    Buffered,
    /// Streaming call consumed to the end, then reduced to JSON.
    Materialize,
    /// Streaming call handed back unconsumed as the result body.
    Forward,
}

/// Drives one upstream model call per request.
#[derive(Clone)]
pub struct Relay {
    model: Arc<dyn TextModel>,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay").field("model", &self.model.name()).finish()
    }
}

impl Relay {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Run `prompt` as a JSON generation. Never fails: errors become a
    /// 500 result with a generic message.
    pub async fn relay(&self, prompt: &str, mode: RelayMode) -> ActionResult {
        match self.try_relay(prompt, mode).await {
            Ok(body) => ActionResult { status: 200, body },
            Err(e) => {
                error!(model = self.model.name(), ?mode, error = %e, "generation failed");
                e.into()
            }
        }
    }

    pub(crate) async fn try_relay(
        &self,
        prompt: &str,
        mode: RelayMode,
    ) -> Result<ActionBody, DispatchError> {
        let request = GenerationRequest::json(prompt);
        debug!(model = self.model.name(), ?mode, prompt_len = prompt.len(), "relaying prompt");
        match mode {
            RelayMode::Buffered => {
                let text = self.model.generate(&request).await?;
                Ok(ActionBody::Json(materialize(&text)?))
            }
            RelayMode::Materialize => {
                let stream = self.model.generate_stream(&request).await?;
                let text = collect_text(stream).await?;
                Ok(ActionBody::Json(materialize(&text)?))
            }
            RelayMode::Forward => {
                let stream = self.model.generate_stream(&request).await?;
                Ok(ActionBody::Stream(prime(stream).await?))
            }
        }
    }

    /// Plain-text completion (no JSON reduction).
    pub async fn complete_text(&self, prompt: &str) -> Result<String, DispatchError> {
        Ok(self.model.generate(&GenerationRequest::text(prompt)).await?)
    }
}

/// Reduce model output to a JSON value: raw text first, then the
/// extraction candidate.
fn materialize(text: &str) -> Result<Value, DispatchError> {
    parse_json_document(text).ok_or_else(|| {
        let raw: String = text.chars().take(RAW_LOG_LIMIT).collect();
        error!(raw = %raw, len = text.len(), "model output is not valid JSON");
        DispatchError::Unparseable
    })
}

/// Concatenate a whole stream; the first `Err` aborts.
pub async fn collect_text(mut stream: TextStream) -> Result<String, ModelError> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

/// Wait for the first chunk so that a failure before any output can still
/// be reported as an error result; the chunk is put back in front.
async fn prime(mut stream: TextStream) -> Result<TextStream, ModelError> {
    match stream.next().await {
        None => Ok(Box::pin(stream::empty())),
        Some(Err(e)) => Err(e),
        Some(Ok(first)) => Ok(Box::pin(stream::once(future::ready(Ok(first))).chain(stream))),
    }
}

/// Adapt a relay stream for writing to a client connection.
///
/// Yields non-empty chunks in order. An upstream error ends the stream
/// after logging it; nothing is appended, since bytes already sent cannot
/// be retracted. Dropping the returned stream drops the upstream one.
pub fn forward_chunks(mut stream: TextStream) -> impl Stream<Item = String> + Send {
    async_stream::stream! {
        let mut forwarded = 0usize;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) if chunk.is_empty() => continue,
                Ok(chunk) => {
                    forwarded += chunk.len();
                    yield chunk;
                }
                Err(e) => {
                    error!(error = %e, forwarded, "upstream failed mid-stream; closing response");
                    break;
                }
            }
        }
        debug!(forwarded, "forwarded stream ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(items: Vec<Result<&str, ModelError>>) -> TextStream {
        let items: Vec<Result<String, ModelError>> =
            items.into_iter().map(|r| r.map(str::to_owned)).collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn collect_text_concatenates() {
        let text = collect_text(chunks(vec![Ok("{\"a\""), Ok(":1}")])).await.unwrap();
        assert_eq!(text, "{\"a\":1}");
    }

    #[tokio::test]
    async fn collect_text_stops_on_error() {
        let result = collect_text(chunks(vec![Ok("{"), Err(ModelError::EmptyResponse), Ok("}")])).await;
        assert!(matches!(result, Err(ModelError::EmptyResponse)));
    }

    #[tokio::test]
    async fn prime_reports_leading_error() {
        let result = prime(chunks(vec![Err(ModelError::EmptyResponse)])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn prime_preserves_first_chunk() {
        let primed = prime(chunks(vec![Ok("a"), Ok("b")])).await.unwrap();
        assert_eq!(collect_text(primed).await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn forward_chunks_stops_at_error_without_suffix() {
        let out: Vec<String> = forward_chunks(chunks(vec![
            Ok("one"),
            Ok(""),
            Ok("two"),
            Err(ModelError::EmptyResponse),
            Ok("never"),
        ]))
        .collect()
        .await;
        assert_eq!(out, vec!["one", "two"]);
    }

    #[test]
    fn materialize_rejects_prose() {
        assert!(matches!(materialize("sorry, no plan"), Err(DispatchError::Unparseable)));
    }

    #[test]
    fn error_result_has_error_body() {
        let result: ActionResult = DispatchError::Configuration.into();
        assert_eq!(result.status, 500);
        assert!(!result.is_stream());
        assert!(result.into_json().unwrap()["error"].is_string());
    }
}
