//! Fake upstream backend for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use fimgate_proxy::{ProxyConfig, create_router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const TEST_API_KEY: &str = "test-key";

/// What the fake upstream answers with.
#[derive(Clone)]
pub enum Canned {
    Json(serde_json::Value),
    Sse(String),
    Status(StatusCode, String),
}

/// A request the fake upstream received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct FakeState {
    canned: Canned,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

pub struct FakeUpstream {
    pub url: String,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeUpstream {
    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }
}

async fn fake_chat(State(state): State<FakeState>, headers: HeaderMap, body: Bytes) -> Response {
    state.seen.lock().unwrap().push(Recorded {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    match state.canned {
        Canned::Json(value) => axum::Json(value).into_response(),
        Canned::Sse(text) => ([(header::CONTENT_TYPE, "text/event-stream")], text).into_response(),
        Canned::Status(status, text) => (status, text).into_response(),
    }
}

/// Bind a fake chat-completions backend on an ephemeral port.
pub async fn spawn_upstream(canned: Canned) -> FakeUpstream {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(fake_chat))
        .with_state(FakeState {
            canned,
            seen: Arc::clone(&seen),
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeUpstream {
        url: format!("http://{addr}/v1/chat/completions"),
        seen,
    }
}

pub fn config_for(upstream_url: &str) -> ProxyConfig {
    ProxyConfig::new()
        .with_upstream_url(upstream_url)
        .with_api_key(TEST_API_KEY)
}

/// Router whose upstream is never reachable (discovery-only tests).
pub fn offline_router() -> Router {
    create_router(config_for("http://127.0.0.1:9/unused"), CancellationToken::new()).unwrap()
}

/// One upstream SSE content event.
pub fn sse_delta(content: &str, finish_reason: Option<&str>) -> String {
    let chunk = serde_json::json!({
        "id": "chatcmpl-abc",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": "glm-4.5-air",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": finish_reason}]
    });
    format!("data: {chunk}\n\n")
}
