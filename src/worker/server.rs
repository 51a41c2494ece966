//! HTTP server exposing a worker over the NLIP wire protocol.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use super::Application;
use crate::error::{Error, Result};
use crate::protocol::{conversation_id, Envelope};
use crate::session::Session;

/// Worker server configuration.
pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8010,
        }
    }
}

struct WorkerState {
    app: Arc<dyn Application>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl WorkerState {
    /// Find or create the session for an envelope's conversation.
    ///
    /// Sessions are keyed by the conversation token; an envelope without one
    /// gets a fresh session scoped to that request.
    async fn session_for(&self, envelope: &Envelope) -> Arc<Session> {
        if let Some(conv) = conversation_id(envelope) {
            let mut sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get(conv) {
                return session.clone();
            }
            let session = Arc::new(self.app.create_session().await);
            session.start().await;
            tracing::debug!("New session for conversation {}", conv);
            sessions.insert(conv.to_string(), session.clone());
            session
        } else {
            let session = Arc::new(self.app.create_session().await);
            session.start().await;
            session
        }
    }

    async fn stop_all(&self) {
        let mut sessions = self.sessions.lock().await;
        for (_, session) in sessions.drain() {
            session.stop().await;
        }
    }
}

/// Build the worker router for an application.
pub fn worker_router(app: Arc<dyn Application>) -> Router {
    router_with_state(Arc::new(WorkerState {
        app,
        sessions: Mutex::new(HashMap::new()),
    }))
}

fn router_with_state(state: Arc<WorkerState>) -> Router {
    Router::new()
        .route("/nlip/", post(handle_envelope))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Handle one inbound envelope.
///
/// A body that does not parse into the envelope shape is a 400 for the
/// caller; everything past the parse is a 200 with a reply envelope, even
/// when the collaborator failed (the dispatcher answers with a diagnostic).
async fn handle_envelope(
    State(state): State<Arc<WorkerState>>,
    Json(body): Json<Value>,
) -> std::result::Result<Json<Envelope>, (StatusCode, String)> {
    let envelope =
        Envelope::from_value(&body).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let session = state.session_for(&envelope).await;
    let reply = session.execute(envelope).await;
    Ok(Json(reply))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Run a worker until ctrl-c, then tear down sessions and the application.
pub async fn run_worker(config: WorkerConfig, app: Arc<dyn Application>) -> Result<()> {
    app.startup().await;

    let state = Arc::new(WorkerState {
        app: app.clone(),
        sessions: Mutex::new(HashMap::new()),
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| Error::Worker(format!("Invalid address: {}", e)))?;

    tracing::info!("Worker listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router_with_state(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.stop_all().await;
    app.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::attach_conversation;
    use crate::session::ToolRegistry;
    use crate::worker::{EchoTool, ToolWorker};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn echo_app() -> Arc<dyn Application> {
        let registry = ToolRegistry::new(Arc::new(EchoTool)).register("echo", Arc::new(EchoTool));
        Arc::new(ToolWorker::new("echo", registry))
    }

    fn post_envelope(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/nlip/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn reply_envelope(response: axum::response::Response) -> Envelope {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Envelope::from_json(std::str::from_utf8(&bytes).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_free_text_round_trip() {
        let app = worker_router(echo_app());

        let body = serde_json::to_string(&Envelope::text("Tell me about NVDA")).unwrap();
        let response = app.oneshot(post_envelope(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let reply = reply_envelope(response).await;
        assert_eq!(reply.extract_text(), "ECHO:Tell me about NVDA");
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let app = worker_router(echo_app());

        let mut args = serde_json::Map::new();
        args.insert("query".to_string(), json!("AAPL"));
        let body = serde_json::to_string(&Envelope::tool_call("echo", args)).unwrap();

        let response = app.oneshot(post_envelope(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply = reply_envelope(response).await;
        assert_eq!(reply.extract_text(), "ECHO:AAPL");
    }

    #[tokio::test]
    async fn test_capitalized_fields_parse_identically() {
        let app = worker_router(echo_app());

        let body = json!({
            "Format": "text",
            "Subformat": "english",
            "Content": "hello",
        })
        .to_string();

        let response = app.oneshot(post_envelope(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply = reply_envelope(response).await;
        assert_eq!(reply.extract_text(), "ECHO:hello");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = worker_router(echo_app());

        let response = app
            .oneshot(post_envelope(json!({"format": "text"}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_probe() {
        let app = worker_router(echo_app());

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sessions_are_reused_per_conversation() {
        let state = Arc::new(WorkerState {
            app: echo_app(),
            sessions: Mutex::new(HashMap::new()),
        });

        let stamped = attach_conversation(Envelope::text("one"), "conv-1");
        let first = state.session_for(&stamped).await;
        let second = state.session_for(&stamped).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = attach_conversation(Envelope::text("two"), "conv-2");
        let third = state.session_for(&other).await;
        assert!(!Arc::ptr_eq(&first, &third));

        // Token-less envelopes never share a session.
        let bare = state.session_for(&Envelope::text("three")).await;
        let bare_again = state.session_for(&Envelope::text("three")).await;
        assert!(!Arc::ptr_eq(&bare, &bare_again));

        state.stop_all().await;
        assert!(state.sessions.lock().await.is_empty());
    }
}
