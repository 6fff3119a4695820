use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Bearer token the fake server accepts.
pub const FAKE_BLOB_TOKEN: &str = "test-blob-token";

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Vec<u8>>,
    /// Listed but answer 404 when fetched.
    vanished: HashSet<String>,
    page_size: Option<usize>,
    fail_deletes: bool,
    list_requests: usize,
}

#[derive(Clone)]
struct ServerState {
    base_url: String,
    inner: Arc<Mutex<Inner>>,
}

/// In-process object store on `127.0.0.1:<ephemeral>`.
///
/// Objects are served back unauthenticated at `<base_url>/<pathname>`.
/// The server task is aborted when this value is dropped.
pub struct FakeBlobServer {
    base_url: String,
    inner: Arc<Mutex<Inner>>,
    task: JoinHandle<()>,
}

impl FakeBlobServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake blob server");
        let addr: SocketAddr = listener.local_addr().expect("no local addr");
        let base_url = format!("http://{addr}");
        let inner = Arc::new(Mutex::new(Inner::default()));
        let state = ServerState {
            base_url: base_url.clone(),
            inner: inner.clone(),
        };

        let app = Router::new()
            .route("/", get(list))
            .route("/delete", post(delete))
            .route("/{*pathname}", get(fetch).put(put))
            .with_state(state);

        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake blob server failed");
        });

        Self {
            base_url,
            inner,
            task,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &'static str {
        FAKE_BLOB_TOKEN
    }

    /// A client pointed at this server with the accepted token.
    pub fn client(&self) -> voyage_store::BlobClient {
        voyage_store::BlobClient::new(self.base_url.clone(), FAKE_BLOB_TOKEN)
    }

    /// Pathnames currently stored, in key order.
    pub fn pathnames(&self) -> Vec<String> {
        self.inner.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn object(&self, pathname: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().objects.get(pathname).cloned()
    }

    /// Store raw bytes directly, bypassing the API.
    pub fn insert_raw(&self, pathname: &str, body: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert(pathname.to_owned(), body.into());
    }

    /// Keep `pathname` in listings but answer 404 when it is fetched,
    /// as if it was deleted between the two requests.
    pub fn vanish_on_fetch(&self, pathname: &str) {
        self.inner
            .lock()
            .unwrap()
            .vanished
            .insert(pathname.to_owned());
    }

    /// Return at most `n` objects per list page.
    pub fn set_page_size(&self, n: usize) {
        self.inner.lock().unwrap().page_size = Some(n);
    }

    /// Make `POST /delete` answer 500.
    pub fn fail_deletes(&self) {
        self.inner.lock().unwrap().fail_deletes = true;
    }

    pub fn list_requests(&self) -> usize {
        self.inner.lock().unwrap().list_requests
    }
}

impl Drop for FakeBlobServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {FAKE_BLOB_TOKEN}"))
}

fn object_json(base_url: &str, pathname: &str) -> serde_json::Value {
    json!({
        "url": format!("{base_url}/{pathname}"),
        "pathname": pathname,
        "contentType": "application/json",
    })
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    prefix: String,
    cursor: Option<String>,
}

async fn list(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut inner = state.inner.lock().unwrap();
    inner.list_requests += 1;

    let keys: Vec<&String> = inner
        .objects
        .keys()
        .filter(|k| k.starts_with(&query.prefix))
        .collect();
    let start: usize = query.cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
    let size = inner.page_size.unwrap_or(usize::MAX);
    let end = start.saturating_add(size).min(keys.len());
    let blobs: Vec<_> = keys[start.min(end)..end]
        .iter()
        .map(|k| object_json(&state.base_url, k))
        .collect();
    let has_more = end < keys.len();

    let mut body = json!({ "blobs": blobs, "hasMore": has_more });
    if has_more {
        body["cursor"] = json!(end.to_string());
    }
    Json(body).into_response()
}

async fn put(
    State(state): State<ServerState>,
    Path(pathname): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut inner = state.inner.lock().unwrap();
    let overwrite = headers
        .get("x-allow-overwrite")
        .is_some_and(|v| v.as_bytes() == b"1");
    if inner.objects.contains_key(&pathname) && !overwrite {
        return (StatusCode::BAD_REQUEST, "object already exists").into_response();
    }
    inner.objects.insert(pathname.clone(), body.to_vec());
    inner.vanished.remove(&pathname);
    Json(object_json(&state.base_url, &pathname)).into_response()
}

#[derive(Deserialize)]
struct DeleteRequest {
    urls: Vec<String>,
}

async fn delete(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(req): Json<DeleteRequest>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut inner = state.inner.lock().unwrap();
    if inner.fail_deletes {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let prefix = format!("{}/", state.base_url);
    for url in req.urls {
        if let Some(pathname) = url.strip_prefix(&prefix) {
            inner.objects.remove(pathname);
        }
    }
    Json(json!({})).into_response()
}

async fn fetch(State(state): State<ServerState>, Path(pathname): Path<String>) -> Response {
    let inner = state.inner.lock().unwrap();
    if inner.vanished.contains(&pathname) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match inner.objects.get(&pathname) {
        Some(body) => (
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
