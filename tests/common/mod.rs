//! Mock webhook shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use serde_json::{Value, json};

/// A request the mock webhook received.
#[derive(Debug, Clone)]
pub struct Received {
    pub body: Value,
    pub content_type: Option<String>,
    pub accept: Option<String>,
}

/// Running mock webhook.
#[derive(Debug, Clone)]
pub struct MockWebhook {
    pub addr: SocketAddr,
    pub received: Arc<Mutex<Vec<Received>>>,
    /// Set once a `/slow` handler has started.
    pub slow_started: Arc<AtomicBool>,
    /// Set when a `/slow` handler is dropped before answering.
    pub slow_cancelled: Arc<AtomicBool>,
}

/// Sets `flag` when dropped while still armed.
struct SetOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

impl MockWebhook {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn slow_cancelled(&self) -> bool {
        self.slow_cancelled.load(Ordering::SeqCst)
    }
}

/// Start the mock webhook on an ephemeral port.
///
/// Routes:
/// - `/output`, `/array`, `/unknown`, `/both`: fixed JSON replies
/// - `/plain`: non-JSON text body
/// - `/empty`: empty 200 body
/// - `/error`: HTTP 500 with a body
/// - `/slow`: answers after ten seconds, noting if it is dropped first
/// - `/echo`: records the request and replies with its `userMessage`
pub async fn spawn_webhook() -> MockWebhook {
    let received: Arc<Mutex<Vec<Received>>> = Arc::default();
    let recorder = Arc::clone(&received);
    let slow_started: Arc<AtomicBool> = Arc::default();
    let slow_cancelled: Arc<AtomicBool> = Arc::default();
    let (started, cancelled) = (Arc::clone(&slow_started), Arc::clone(&slow_cancelled));

    let app = Router::new()
        .route("/output", post(|| async { Json(json!({ "output": "hello" })) }))
        .route(
            "/array",
            post(|| async { Json(json!([{ "message": "hi" }, { "message": "ignored" }])) }),
        )
        .route("/unknown", post(|| async { Json(json!({ "foo": "bar" })) }))
        .route(
            "/both",
            post(|| async { Json(json!({ "message": "second", "output": "first" })) }),
        )
        .route(
            "/plain",
            post(|| async { ([(header::CONTENT_TYPE, "text/plain")], "plain text reply") }),
        )
        .route("/empty", post(|| async { StatusCode::OK }))
        .route(
            "/error",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "internal details") }),
        )
        .route(
            "/slow",
            post(move || {
                let started = Arc::clone(&started);
                let cancelled = Arc::clone(&cancelled);
                async move {
                    started.store(true, Ordering::SeqCst);
                    let mut on_drop = SetOnDrop {
                        flag: cancelled,
                        armed: true,
                    };
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    on_drop.armed = false;
                    Json(json!({ "output": "too late" }))
                }
            }),
        )
        .route(
            "/echo",
            post(move |headers: HeaderMap, body: Bytes| {
                let recorder = Arc::clone(&recorder);
                async move {
                    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                    let reply = json!({ "reply": body["userMessage"] });
                    let read = |name: header::HeaderName| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(ToString::to_string)
                    };
                    recorder.lock().unwrap().push(Received {
                        body,
                        content_type: read(header::CONTENT_TYPE),
                        accept: read(header::ACCEPT),
                    });
                    Json(reply).into_response()
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve webhook") });

    MockWebhook {
        addr,
        received,
        slow_started,
        slow_cancelled,
    }
}

/// URL of a port nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/webhook")
}
