//! MCP HTTP Transport
//!
//! `POST /mcp` takes one JSON-RPC message and answers with its JSON-RPC
//! response; `GET /health` reports liveness and the tool count. Configured
//! inbound headers are captured per request and forwarded to the upstream API.
//!
//! `initialize` opens a session identified by the `mcp-session-id` header.
//! Each session is its own cancellation scope, so request ids and
//! `notifications/cancelled` never reach another client's calls. Requests
//! without a known session get a scope of their own. `DELETE /mcp` ends a
//! session and cancels whatever it still has in flight.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::mcp::cancellation::CancellationManager;
use crate::mcp::error::McpError;
use crate::mcp::gateway::executor::CallContext;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Header carrying the session id assigned on `initialize`
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

#[derive(Clone)]
pub struct HttpState {
    handler: McpHandler,
    forward_headers: Arc<Vec<String>>,
    sessions: Arc<DashMap<String, Arc<CancellationManager>>>,
    shutdown: CancellationToken,
}

impl HttpState {
    pub fn new(handler: McpHandler, forward_headers: Vec<String>) -> Self {
        Self {
            handler,
            forward_headers: Arc::new(forward_headers),
            sessions: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// In-flight calls across open sessions
    pub fn active_calls(&self) -> usize {
        self.sessions.iter().map(|entry| entry.value().active_count()).sum()
    }

    /// Cancel every in-flight call of every session
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn session_scope(&self, session_id: Option<&str>) -> Arc<CancellationManager> {
        session_id
            .and_then(|id| self.sessions.get(id).map(|entry| Arc::clone(entry.value())))
            .unwrap_or_else(|| Arc::new(CancellationManager::child_of(&self.shutdown)))
    }
}

/// Values of the configured forward headers present on the inbound request
fn capture_forwarded(headers: &HeaderMap, names: &[String]) -> Vec<(String, String)> {
    names
        .iter()
        .filter_map(|name| {
            let value = headers.get(name.as_str())?.to_str().ok()?;
            Some((name.clone(), value.to_string()))
        })
        .collect()
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(MCP_SESSION_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// POST /mcp
async fn post_handler(State(state): State<HttpState>, headers: HeaderMap, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "Failed to parse JSON-RPC request");
            let response = JsonRpcResponse::failure(None, McpError::ParseError(e.to_string()).into());
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let is_initialize = request.method == "initialize";
    let session_id = session_header(&headers);
    let context = CallContext {
        forwarded_headers: capture_forwarded(&headers, &state.forward_headers),
        ..CallContext::for_transport("http")
    }
    .with_cancellations(state.session_scope(session_id));
    debug!(
        method = %request.method,
        session = ?session_id,
        forwarded = context.forwarded_headers.len(),
        "Handling HTTP MCP request"
    );

    match state.handler.handle_request(request, context).await {
        Some(response) => {
            let opened = is_initialize && response.error.is_none();
            let mut http_response = Json(response).into_response();
            if opened {
                let session_id = uuid::Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&session_id) {
                    state
                        .sessions
                        .insert(session_id.clone(), Arc::new(CancellationManager::child_of(&state.shutdown)));
                    http_response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
                    debug!(session = %session_id, "Opened MCP session");
                }
            }
            http_response
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// DELETE /mcp
async fn delete_handler(State(state): State<HttpState>, headers: HeaderMap) -> StatusCode {
    let Some(session_id) = session_header(&headers) else {
        warn!("DELETE request missing {} header", MCP_SESSION_ID_HEADER);
        return StatusCode::BAD_REQUEST;
    };

    match state.sessions.remove(session_id) {
        Some((_, scope)) => {
            scope.cancel_all();
            debug!(session = %session_id, "Session terminated via DELETE");
            StatusCode::OK
        }
        None => {
            debug!(session = %session_id, "DELETE request for non-existent session");
            StatusCode::NOT_FOUND
        }
    }
}

/// GET /health
async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "tools": state.handler.registry().len(),
    }))
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/mcp", post(post_handler).delete(delete_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind_address` and serve until Ctrl-C
pub async fn serve_http(state: HttpState, bind_address: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(|e| Error::transport(format!("Failed to bind MCP HTTP server: {e}")))?;

    info!(address = %bind_address, "Starting MCP HTTP server");

    let on_shutdown = state.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "MCP HTTP server shutdown listener failed");
            }
            on_shutdown.shutdown();
        })
        .await
        .map_err(|e| Error::transport(format!("MCP HTTP server error: {e}")))?;

    info!("MCP HTTP server shutdown completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_forwarded_skips_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer inbound"));
        headers.insert("x-other", HeaderValue::from_static("ignored"));

        let captured = capture_forwarded(
            &headers,
            &["Authorization".to_string(), "X-Request-Id".to_string()],
        );
        assert_eq!(captured, vec![("Authorization".to_string(), "Bearer inbound".to_string())]);
    }
}
