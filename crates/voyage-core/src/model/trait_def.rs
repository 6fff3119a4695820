//! The `TextModel` trait -- the adapter interface for generative-text APIs.

use async_trait::async_trait;

use super::types::{GenerationRequest, ModelError, TextStream};

/// A generative-text capability that answers one prompt either in full or
/// as a stream of chunks.
///
/// Object-safe so the dispatcher can hold an `Arc<dyn TextModel>`.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier for logs (e.g. "gemini-2.5-flash").
    fn name(&self) -> &str;

    /// Generate the complete response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError>;

    /// Start a streaming generation.
    ///
    /// Errors that occur before the stream is established are returned
    /// here; later failures arrive as `Err` items, after which the stream
    /// ends.
    async fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream, ModelError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn TextModel) {}
};
