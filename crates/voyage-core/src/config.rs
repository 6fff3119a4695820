use crate::model::gemini::DEFAULT_GEMINI_API;

/// Upstream model configuration.
///
/// `api_key` is optional: without it the service still serves the plan
/// store, and model-backed actions report a configuration error.
#[derive(Clone, PartialEq)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl ModelConfig {
    /// Model used when none is configured.
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    /// Config with an explicit key and the default model and endpoint.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: Self::DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_GEMINI_API.to_owned(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}
