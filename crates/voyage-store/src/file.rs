//! Local-disk backend: the whole collection lives in one JSON array file.
//!
//! Every mutation is a read-modify-write of that file. There is no locking;
//! two concurrent writers can lose an update.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::models::SavedPlan;
use crate::store::{PlanStore, into_listing};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sibling temp path unique to this process and this write.
fn temp_path_for(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// [`PlanStore`] backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw records as stored. A missing file is an empty store.
    async fn read_all(&self) -> Result<Vec<SavedPlan>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file contents, creating parent directories on first write.
    ///
    /// Each write goes to its own sibling temp file which is then renamed
    /// over the target. Readers see either the old or the new collection.
    async fn write_all(&self, plans: &[SavedPlan]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        let contents = serde_json::to_vec_pretty(plans)?;
        let tmp = temp_path_for(&self.path);
        if let Err(source) = tokio::fs::write(&tmp, contents).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(source));
        }
        if let Err(source) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(source));
        }
        debug!(path = %self.path.display(), count = plans.len(), "wrote plan file");
        Ok(())
    }
}

#[async_trait]
impl PlanStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn list(&self) -> Result<Vec<SavedPlan>, StoreError> {
        Ok(into_listing(self.read_all().await?))
    }

    async fn put(&self, plan: &SavedPlan) -> Result<(), StoreError> {
        let mut plans = self.read_all().await?;
        match plans.iter_mut().find(|p| p.id == plan.id) {
            Some(existing) => *existing = plan.clone(),
            None => plans.push(plan.clone()),
        }
        self.write_all(&plans).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut plans = self.read_all().await?;
        let before = plans.len();
        plans.retain(|p| p.id != id);
        if plans.len() == before {
            debug!(plan_id = id, "delete: no such plan in file store");
            return Ok(());
        }
        self.write_all(&plans).await
    }
}
