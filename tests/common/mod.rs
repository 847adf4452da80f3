//! Scripted stand-in for the GitHub Models HTTP API.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use futures::stream::{self, BoxStream};

use ghmodels::GithubModels;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A complete body with a status code.
    Body(StatusCode, String),
    /// A 200 response whose body is written chunk by chunk.
    Chunks(Vec<String>),
    /// Like `Chunks`, but the connection is then held open without more data.
    ChunksThenHang(Vec<String>),
    /// Like `Chunks`, waiting the given interval before each chunk.
    Paced(Vec<String>, Duration),
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Body(StatusCode::OK, body.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Reply::Body(
            StatusCode::from_u16(status).expect("valid status"),
            body.into(),
        )
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Reply::Chunks(chunks.iter().map(|c| c.to_string()).collect())
    }

    pub fn chunks_then_hang(chunks: &[&str]) -> Self {
        Reply::ChunksThenHang(chunks.iter().map(|c| c.to_string()).collect())
    }
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

/// A local server answering every request with the next scripted reply.
pub struct MockServer {
    addr: SocketAddr,
    script: Arc<Script>,
}

impl MockServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let script = Arc::new(Script {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&script));
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, script }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.script.requests.lock().unwrap().len()
    }

    /// A client pointed at this server with a short retry backoff.
    pub fn client(&self) -> GithubModels {
        GithubModels::with_options(
            Some("test-token".to_string()),
            Some(&self.url("/")),
            Some(&self.url("/catalog/models")),
            Some(Duration::from_secs(10)),
        )
        .unwrap()
        .with_retry_backoff(Duration::from_millis(10))
    }
}

async fn handle(
    State(script): State<Arc<Script>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    script.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });
    let reply = script.replies.lock().unwrap().pop_front();
    match reply {
        Some(Reply::Body(status, body)) => (status, body).into_response(),
        Some(Reply::Chunks(chunks)) => streamed(chunks, false),
        Some(Reply::ChunksThenHang(chunks)) => streamed(chunks, true),
        Some(Reply::Paced(chunks, interval)) => paced(chunks, interval),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "script exhausted").into_response(),
    }
}

fn streamed(chunks: Vec<String>, hang: bool) -> Response {
    let head = stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
    let body: BoxStream<'static, Result<String, Infallible>> = if hang {
        head.chain(stream::pending()).boxed()
    } else {
        head.boxed()
    };
    Response::new(Body::from_stream(body))
}

fn paced(chunks: Vec<String>, interval: Duration) -> Response {
    let body = stream::iter(chunks).then(move |chunk| async move {
        tokio::time::sleep(interval).await;
        Ok::<_, Infallible>(chunk)
    });
    Response::new(Body::from_stream(body))
}

/// A streamed body delivering `fragments` in nested-delta frames, then `[DONE]`.
pub fn delta_frames(fragments: &[&str]) -> Vec<String> {
    let mut frames: Vec<String> = fragments
        .iter()
        .map(|f| format!("{}\n", serde_json::json!({"delta": {"content": f}})))
        .collect();
    frames.push("[DONE]\n".to_string());
    frames
}

/// A non-streamed completion body with `content`.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}
