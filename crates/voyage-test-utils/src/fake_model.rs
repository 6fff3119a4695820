use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;

use voyage_core::model::{GenerationRequest, ModelError, TextModel, TextStream};

/// Scripted [`TextModel`].
///
/// Every call answers with the same script: `generate` returns the chunks
/// concatenated, `generate_stream` yields them one by one. Calls and the
/// last prompt are recorded for assertions.
#[derive(Debug)]
pub struct FakeModel {
    chunks: Vec<String>,
    /// Stream yields this many chunks and then an error.
    fail_after: Option<usize>,
    /// Both calls fail before producing anything.
    unavailable: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl FakeModel {
    /// Answers with `text` as a single chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self::chunks([text.into()])
    }

    /// Answers with `chunks` in order.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            fail_after: None,
            unavailable: false,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Rejects every request with a 503.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::chunks(Vec::<String>::new())
        }
    }

    /// Streams fail with an error after `n` chunks.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Number of `generate` plus `generate_stream` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    fn record(&self, request: &GenerationRequest) -> Result<(), ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
        if self.unavailable {
            return Err(ModelError::Status {
                status: 503,
                body: "model overloaded".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TextModel for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        self.record(request)?;
        Ok(self.chunks.concat())
    }

    async fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream, ModelError> {
        self.record(request)?;
        let take = self.fail_after.unwrap_or(self.chunks.len());
        let mut items: Vec<Result<String, ModelError>> =
            self.chunks.iter().take(take).cloned().map(Ok).collect();
        if self.fail_after.is_some() {
            items.push(Err(ModelError::Decode("stream interrupted".to_owned())));
        }
        Ok(Box::pin(stream::iter(items)))
    }
}
