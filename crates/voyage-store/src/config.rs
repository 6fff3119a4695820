use std::path::PathBuf;
use std::sync::Arc;

use crate::blob::{BlobClient, BlobStore, DEFAULT_BLOB_API};
use crate::file::FileStore;
use crate::store::PlanStore;

/// Which backend holds saved plans.
///
/// The networked backend is selected whenever a blob token is available;
/// otherwise plans live in a local JSON file.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    File { path: PathBuf },
    Blob { base_url: String, token: String },
}

impl StoreConfig {
    /// Directory used for the file backend when nothing else is configured.
    pub const DEFAULT_DATA_DIR: &str = "local-data";

    /// File name of the plan collection inside the data directory.
    pub const PLANS_FILE: &str = "plans.json";

    /// File backend storing [`Self::PLANS_FILE`] inside `dir`.
    pub fn file_in(dir: impl Into<PathBuf>) -> Self {
        Self::File {
            path: dir.into().join(Self::PLANS_FILE),
        }
    }

    /// Blob backend against the public endpoint.
    pub fn blob(token: impl Into<String>) -> Self {
        Self::Blob {
            base_url: DEFAULT_BLOB_API.to_owned(),
            token: token.into(),
        }
    }

    /// Construct the configured backend.
    pub fn open(&self) -> Arc<dyn PlanStore> {
        match self {
            Self::File { path } => Arc::new(FileStore::new(path.clone())),
            Self::Blob { base_url, token } => {
                Arc::new(BlobStore::new(BlobClient::new(base_url.clone(), token.clone())))
            }
        }
    }

    /// Human-readable location for startup logs. Never includes the token.
    pub fn describe(&self) -> String {
        match self {
            Self::File { path } => format!("file:{}", path.display()),
            Self::Blob { base_url, .. } => format!("blob:{base_url}"),
        }
    }
}

impl Default for StoreConfig {
    /// File backend under [`Self::DEFAULT_DATA_DIR`].
    fn default() -> Self {
        Self::file_in(Self::DEFAULT_DATA_DIR)
    }
}
