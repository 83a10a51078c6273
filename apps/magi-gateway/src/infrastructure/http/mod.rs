//! Inbound HTTP Surface
//!
//! The gateway's axum router: prefix-based forwarding to plain-bearer
//! backends, the tool-backend RPC endpoints, and a liveness probe.
//!
//! # Endpoints
//!
//! - `ANY /proxy/{backend}/{*rest}` - forward to the named backend
//! - `POST /proxy/rpc/call` - invoke a tool on the tool backend
//! - `GET /proxy/rpc/tools` - enumerate the tool backend's tools
//! - `GET /healthz` - liveness probe
//!
//! Every failure on a request path is recovered here and answered as
//! `{"error": <message>}` with status 500; the process never crashes
//! on behalf of an upstream.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::UpstreamError;
use crate::application::services::RpcDispatcher;
use crate::domain::backend::BackendRegistry;
use crate::infrastructure::upstream::UpstreamForwarder;

// =============================================================================
// State and Router
// =============================================================================

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<BackendRegistry>,
    forwarder: Arc<UpstreamForwarder>,
    dispatcher: Option<Arc<RpcDispatcher>>,
}

impl AppState {
    /// Create the handler state. `dispatcher` is `None` when no tool
    /// backend is configured in this deployment.
    #[must_use]
    pub const fn new(
        registry: Arc<BackendRegistry>,
        forwarder: Arc<UpstreamForwarder>,
        dispatcher: Option<Arc<RpcDispatcher>>,
    ) -> Self {
        Self {
            registry,
            forwarder,
            dispatcher,
        }
    }
}

/// Build the gateway router.
///
/// The static `/proxy/rpc/...` routes take precedence over the
/// `{backend}` capture, so `rpc` is a reserved backend name.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/proxy/rpc/call", post(rpc_call_handler))
        .route("/proxy/rpc/tools", get(rpc_tools_handler))
        .route("/proxy/{backend}", any(forward_root_handler))
        .route("/proxy/{backend}/{*rest}", any(forward_handler))
        .with_state(state)
}

// =============================================================================
// Gateway Server
// =============================================================================

/// Inbound HTTP server.
pub struct GatewayServer {
    port: u16,
    state: AppState,
    cancel: CancellationToken,
}

impl GatewayServer {
    /// Create a server on the given port.
    #[must_use]
    pub const fn new(port: u16, state: AppState, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] if binding fails or the HTTP
    /// server encounters a fatal error while running.
    pub async fn run(self) -> Result<(), GatewayServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| GatewayServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

/// Liveness response.
#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    current_time: DateTime<Utc>,
}

async fn healthz_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        current_time: Utc::now(),
    })
}

/// Body of `POST /proxy/rpc/call`.
#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    tool: String,
    #[serde(default = "empty_object")]
    arguments: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

async fn rpc_call_handler(
    State(state): State<AppState>,
    Json(request): Json<ToolCallRequest>,
) -> Response {
    let Some(dispatcher) = state.dispatcher.as_ref() else {
        return tool_backend_unconfigured();
    };

    match dispatcher.call_tool(&request.tool, request.arguments).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!(tool = request.tool, error = %e, "Tool call failed");
            upstream_failure(&e)
        }
    }
}

async fn rpc_tools_handler(State(state): State<AppState>) -> Response {
    let Some(dispatcher) = state.dispatcher.as_ref() else {
        return tool_backend_unconfigured();
    };

    match dispatcher.list_tools().await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Tool enumeration failed");
            upstream_failure(&e)
        }
    }
}

async fn forward_root_handler(
    State(state): State<AppState>,
    Path(backend): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward(state, backend, String::new(), method, query, &headers, body).await
}

async fn forward_handler(
    State(state): State<AppState>,
    Path((backend, rest)): Path<(String, String)>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward(state, backend, rest, method, query, &headers, body).await
}

async fn forward(
    state: AppState,
    backend_name: String,
    rest: String,
    method: Method,
    query: Option<String>,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let Some(backend) = state.registry.get(&backend_name) else {
        let e = UpstreamError::UnknownBackend(backend_name);
        tracing::warn!(error = %e, "Rejected forward to unregistered backend");
        return upstream_failure(&e);
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let correlation_id = Uuid::new_v4();
    tracing::info!(
        backend = backend.name(),
        %method,
        path = rest,
        correlation_id = %correlation_id,
        "Forwarding request"
    );

    match state
        .forwarder
        .forward(backend, method, &rest, query.as_deref(), content_type, body)
        .await
    {
        // Upstream status is deliberately collapsed to 200: callers see
        // either the payload or the gateway's own error shape.
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => {
            tracing::error!(
                backend = backend.name(),
                correlation_id = %correlation_id,
                error = %e,
                "Forward failed"
            );
            upstream_failure(&e)
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Pure mapping from a failure to the caller-visible error body.
/// Callers distinguish failure kinds only by message content.
fn error_body(message: &str) -> Value {
    serde_json::json!({ "error": message })
}

fn upstream_failure(e: &UpstreamError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(error_body(&e.to_string())),
    )
        .into_response()
}

fn tool_backend_unconfigured() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(error_body("tool backend not configured")),
    )
        .into_response()
}

/// Gateway server errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
