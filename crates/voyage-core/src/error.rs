//! Errors surfaced by the dispatcher and relay, and their client mapping.

use voyage_store::StoreError;

use crate::model::ModelError;

/// Shown when the model call fails or its output cannot be parsed.
pub const GENERATION_ERROR: &str =
    "Failed to generate the travel plan. Please try again in a moment.";

/// Shown when no model credential is configured.
pub const MISSING_API_KEY_ERROR: &str = "The server has no model API key configured.";

/// Shown when the plan store cannot be read or written.
pub const STORE_ERROR: &str = "Failed to access saved plans.";

/// Shown for any other internal failure.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred while processing the request.";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("model API key is not configured")]
    Configuration,

    #[error("unknown action {0:?}")]
    UnknownAction(String),

    #[error("{0}")]
    Validation(String),

    #[error("upstream model failed: {0}")]
    Upstream(#[from] ModelError),

    #[error("model output could not be reduced to a JSON document")]
    Unparseable,

    #[error("plan store failed: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// HTTP-style status code for the action result.
    pub fn status(&self) -> u16 {
        match self {
            Self::UnknownAction(_) | Self::Validation(_) => 400,
            Self::Configuration
            | Self::Upstream(_)
            | Self::Unparseable
            | Self::Store(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Message safe to return to a client. Upstream text and I/O details
    /// are never included.
    pub fn client_message(&self) -> String {
        match self {
            Self::Configuration => MISSING_API_KEY_ERROR.to_owned(),
            Self::UnknownAction(_) => "Invalid action".to_owned(),
            Self::Validation(msg) => msg.clone(),
            Self::Upstream(_) | Self::Unparseable => GENERATION_ERROR.to_owned(),
            Self::Store(_) => STORE_ERROR.to_owned(),
            Self::Internal(_) => UNKNOWN_ERROR.to_owned(),
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
