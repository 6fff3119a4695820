use std::path::PathBuf;

/// Errors raised by a [`crate::PlanStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access plan file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("plan file {path:?} is not a valid plan list: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode plan: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("blob store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("blob store returned {status} for {url}")]
    Status { status: u16, url: String },
}

impl StoreError {
    /// `true` when the backend reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
