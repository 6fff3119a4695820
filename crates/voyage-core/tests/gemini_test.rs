//! GeminiClient against a local stand-in for the REST API.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use voyage_core::model::{GeminiClient, GenerationRequest, ModelError, TextModel};
use voyage_core::relay::collect_text;

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

fn candidate(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }] })
}

async fn generate(
    State(seen): State<Seen>,
    Path(target): Path<String>,
    Query(query): Query<std::collections::HashMap<String, String>>,
    headers: HeaderMap,
    body: axum::Json<Value>,
) -> Response {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    seen.requests
        .lock()
        .unwrap()
        .push((target.clone(), query.get("alt").cloned(), body.0.clone()));
    if key != "test-key" {
        return (StatusCode::FORBIDDEN, "API key not valid").into_response();
    }

    let (model, method) = target.split_once(':').unwrap_or((target.as_str(), ""));
    if model == "blocked-model" {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        if method == "streamGenerateContent" {
            return format!("data: {blocked}\n\n").into_response();
        }
        return axum::Json(blocked).into_response();
    }
    if model == "truncated-model" {
        let cut = json!({ "candidates": [{
            "content": { "parts": [{ "text": "{\"tripTitle\": " }], "role": "model" },
            "finishReason": "MAX_TOKENS"
        }] });
        if method == "streamGenerateContent" {
            return format!("data: {}\n\ndata: {cut}\n\n", candidate("{")).into_response();
        }
        return axum::Json(cut).into_response();
    }
    if model == "failing-model" {
        let failure = json!({ "error": { "code": 500, "message": "backend error", "status": "INTERNAL" } });
        return format!("data: {}\n\ndata: {failure}\n\n", candidate("{")).into_response();
    }
    match method {
        "generateContent" => axum::Json(candidate("{\"tripTitle\": \"Buffered\"}")).into_response(),
        "streamGenerateContent" => {
            // CRLF line endings and an event split across the final frame
            // without a trailing blank line.
            let events = [
                format!("data: {}\r\n\r\n", candidate("{\"tripTitle\": ")),
                ": keep-alive\r\n\r\n".to_owned(),
                format!("data: {}\r\n\r\n", candidate("\"Streamed\"")),
                format!("data: {}", candidate("}")),
            ];
            ([("content-type", "text/event-stream")], events.concat()).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/v1beta/models/{target}", post(generate))
        .with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

#[tokio::test]
async fn buffered_generation_returns_candidate_text() {
    let (url, seen) = start().await;
    let client = GeminiClient::new("test-key", "gemini-2.5-flash").with_base_url(url);

    let text = client.generate(&GenerationRequest::json("plan")).await.unwrap();
    assert_eq!(text, "{\"tripTitle\": \"Buffered\"}");

    let requests = seen.requests.lock().unwrap();
    let (target, alt, body) = &requests[0];
    assert_eq!(target, "gemini-2.5-flash:generateContent");
    assert!(alt.is_none());
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
}

#[tokio::test]
async fn streamed_generation_yields_chunks_in_order() {
    let (url, seen) = start().await;
    let client = GeminiClient::new("test-key", "gemini-2.5-flash").with_base_url(url);

    let stream = client
        .generate_stream(&GenerationRequest::json("plan"))
        .await
        .unwrap();
    let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
    assert_eq!(chunks, vec!["{\"tripTitle\": ", "\"Streamed\"", "}"]);

    let requests = seen.requests.lock().unwrap();
    assert_eq!(requests[0].0, "gemini-2.5-flash:streamGenerateContent");
    assert_eq!(requests[0].1.as_deref(), Some("sse"));
}

#[tokio::test]
async fn rejected_key_is_status_error() {
    let (url, _seen) = start().await;
    let client = GeminiClient::new("wrong", "gemini-2.5-flash").with_base_url(url);

    match client.generate(&GenerationRequest::text("hi")).await {
        Err(ModelError::Status { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(client.generate_stream(&GenerationRequest::text("hi")).await.is_err());
}

#[tokio::test]
async fn blocked_prompt_surfaces_reason() {
    let (url, _seen) = start().await;
    let client = GeminiClient::new("test-key", "blocked-model").with_base_url(url.clone());
    assert!(matches!(
        client.generate(&GenerationRequest::text("hi")).await,
        Err(ModelError::Blocked { .. })
    ));

    let stream = client
        .generate_stream(&GenerationRequest::text("hi"))
        .await
        .unwrap();
    assert!(matches!(collect_text(stream).await, Err(ModelError::Blocked { .. })));
}

#[tokio::test]
async fn abnormal_finish_ends_stream_with_error() {
    let (url, _) = start().await;
    let client = GeminiClient::new("test-key", "truncated-model").with_base_url(url);

    let items: Vec<_> = client
        .generate_stream(&GenerationRequest::json("plan"))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_deref().unwrap(), "{");
    assert_eq!(items[1].as_deref().unwrap(), "{\"tripTitle\": ");
    match &items[2] {
        Err(ModelError::Stopped { reason }) => assert_eq!(reason, "MAX_TOKENS"),
        other => panic!("expected Stopped, got {other:?}"),
    }

    assert!(matches!(
        client.generate(&GenerationRequest::json("plan")).await,
        Err(ModelError::Stopped { .. })
    ));
}

#[tokio::test]
async fn error_event_mid_stream_is_api_error() {
    let (url, _) = start().await;
    let client = GeminiClient::new("test-key", "failing-model").with_base_url(url);

    let mut stream = client
        .generate_stream(&GenerationRequest::json("plan"))
        .await
        .unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "{");
    match stream.next().await {
        Some(Err(ModelError::Api { code, .. })) => assert_eq!(code, 500),
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(stream.next().await.is_none());
}
