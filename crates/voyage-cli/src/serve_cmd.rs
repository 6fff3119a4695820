use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;

use voyage_core::relay::forward_chunks;
use voyage_core::{ActionBody, ActionResult, Dispatcher};

/// Content type of streamed generation bodies.
const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// `{ action, payload, stream }` as posted by the client.
#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    stream: bool,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    let endpoint = post(handle_action)
        .options(preflight)
        .fallback(method_not_allowed);
    Router::new()
        .route("/api/travel", endpoint.clone())
        .route("/api/japan-travel", endpoint)
        .layer(CorsLayer::permissive())
        .with_state(dispatcher)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(dispatcher: Dispatcher, bind: &str, port: u16) -> Result<()> {
    let app = build_router(Arc::new(dispatcher));
    let ip: IpAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {bind}"))?;
    let addr = SocketAddr::new(ip, port);
    tracing::info!("voyage serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("voyage serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_action(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    let request: ActionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "rejected malformed request body");
            return json_error(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };
    let result = dispatcher
        .dispatch(&request.action, request.payload, request.stream)
        .await;
    action_response(result)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Write an [`ActionResult`] to the wire. Streamed bodies are sent one
/// frame per upstream chunk.
fn action_response(result: ActionResult) -> Response {
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match result.body {
        ActionBody::Json(value) => (status, Json(value)).into_response(),
        ActionBody::Stream(stream) => {
            let frames = forward_chunks(stream).map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk)));
            (
                status,
                [(header::CONTENT_TYPE, STREAM_CONTENT_TYPE)],
                Body::from_stream(frames),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
