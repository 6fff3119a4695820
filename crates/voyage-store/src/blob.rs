//! Networked object store backend.
//!
//! Each plan is one public object at `plans/<id>.json`. The object store
//! has no multi-get, so `list` enumerates the prefix and then fetches every
//! object on its own; `delete` enumerates to resolve the id to the object's
//! URL before removing it.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::models::SavedPlan;
use crate::store::{PlanStore, into_listing};

/// Public Vercel Blob API endpoint.
pub const DEFAULT_BLOB_API: &str = "https://blob.vercel-storage.com";

/// Key prefix under which all plans live.
pub const PLAN_PREFIX: &str = "plans/";

/// Upper bound on in-flight object fetches during `list`.
const FETCH_CONCURRENCY: usize = 8;

/// Object key for a plan id.
pub fn object_key(id: i64) -> String {
    format!("{PLAN_PREFIX}{id}.json")
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Metadata for one stored object, as returned by list and put.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobObject {
    /// Public URL the object content is served from.
    pub url: String,
    /// Object key, e.g. `plans/17.json`.
    pub pathname: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    blobs: Vec<BlobObject>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin HTTP client for the object store API.
#[derive(Clone)]
pub struct BlobClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for BlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BlobClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Enumerate every object under `prefix`, following pagination.
    pub async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>, StoreError> {
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut query = vec![("prefix", prefix.to_owned())];
            if let Some(c) = cursor.take() {
                query.push(("cursor", c));
            }
            let url = format!("{}/", self.base_url);
            let resp = self
                .http
                .get(&url)
                .header(AUTHORIZATION, self.bearer())
                .query(&query)
                .send()
                .await?;
            let page: ListPage = check_status(resp, &url)?.json().await?;
            objects.extend(page.blobs);
            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }
        Ok(objects)
    }

    /// Upload `body` as a public JSON object at exactly `pathname`,
    /// overwriting any existing object.
    pub async fn put_json(&self, pathname: &str, body: Vec<u8>) -> Result<BlobObject, StoreError> {
        let url = format!("{}/{pathname}", self.base_url);
        let resp = self
            .http
            .put(&url)
            .header(AUTHORIZATION, self.bearer())
            .header("x-content-type", "application/json")
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "1")
            .header("x-vercel-blob-access", "public")
            .body(body)
            .send()
            .await?;
        Ok(check_status(resp, &url)?.json().await?)
    }

    pub async fn delete(&self, urls: &[String]) -> Result<(), StoreError> {
        let url = format!("{}/delete", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .json(&serde_json::json!({ "urls": urls }))
            .send()
            .await?;
        check_status(resp, &url)?;
        Ok(())
    }

    /// Download a public object's content.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let resp = self.http.get(url).send().await?;
        let bytes = check_status(resp, url)?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(StoreError::Status {
            status: status.as_u16(),
            url: url.to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`PlanStore`] backed by the object store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    client: BlobClient,
}

impl BlobStore {
    pub fn new(client: BlobClient) -> Self {
        Self { client }
    }

    async fn fetch_plan(&self, object: &BlobObject) -> Result<SavedPlan, StoreError> {
        let raw = self.client.fetch(&object.url).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn remove(&self, id: i64) -> Result<bool, StoreError> {
        let key = object_key(id);
        let objects = self.client.list(PLAN_PREFIX).await?;
        let Some(object) = objects.into_iter().find(|o| o.pathname == key) else {
            return Ok(false);
        };
        self.client.delete(&[object.url]).await?;
        Ok(true)
    }
}

#[async_trait]
impl PlanStore for BlobStore {
    fn backend(&self) -> &'static str {
        "blob"
    }

    /// Objects that disappear between enumeration and fetch (404) are
    /// skipped with a warning; any other fetch failure fails the listing.
    async fn list(&self) -> Result<Vec<SavedPlan>, StoreError> {
        let objects = self.client.list(PLAN_PREFIX).await?;
        debug!(count = objects.len(), "listed plan objects");

        let plans: Vec<Option<SavedPlan>> = stream::iter(objects)
            .map(|object| async move {
                match self.fetch_plan(&object).await {
                    Ok(plan) => Ok(Some(plan)),
                    Err(e) if e.is_not_found() => {
                        warn!(pathname = %object.pathname, "plan vanished between list and fetch; skipping");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .buffer_unordered(FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(into_listing(plans.into_iter().flatten().collect()))
    }

    async fn put(&self, plan: &SavedPlan) -> Result<(), StoreError> {
        let body = serde_json::to_vec(plan)?;
        let object = self.client.put_json(&object_key(plan.id), body).await?;
        debug!(pathname = %object.pathname, "stored plan object");
        Ok(())
    }

    /// Deletion is best-effort: failures while resolving or removing the
    /// object are logged and swallowed.
    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        match self.remove(id).await {
            Ok(true) => debug!(plan_id = id, "deleted plan object"),
            Ok(false) => debug!(plan_id = id, "delete: no such plan object"),
            Err(e) => error!(plan_id = id, error = %e, "failed to delete plan object"),
        }
        Ok(())
    }
}
