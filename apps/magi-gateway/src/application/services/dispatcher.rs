//! RPC Call Dispatcher
//!
//! Composes RPC envelopes for the tool backend, attaching the cached
//! session handle and a bearer token, and decodes the response
//! envelope. Any send or decode failure invalidates the cached session
//! before propagating, so the next call re-handshakes instead of
//! retrying a dead session.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::application::ports::{RpcTransportPort, TokenProviderPort, UpstreamError};
use crate::application::services::{SessionCache, SessionHandle, maybe_bearer};
use crate::domain::backend::BackendDescriptor;
use crate::domain::envelope::decode;
use crate::domain::rpc::{RequestIdSource, RpcEnvelope, method};

/// Dispatches tool calls to one session-rpc backend.
pub struct RpcDispatcher {
    backend: BackendDescriptor,
    sessions: Arc<SessionCache>,
    tokens: Arc<dyn TokenProviderPort>,
    transport: Arc<dyn RpcTransportPort>,
    ids: Arc<RequestIdSource>,
}

impl RpcDispatcher {
    /// Create a dispatcher bound to `backend`.
    #[must_use]
    pub fn new(
        backend: BackendDescriptor,
        sessions: Arc<SessionCache>,
        tokens: Arc<dyn TokenProviderPort>,
        transport: Arc<dyn RpcTransportPort>,
        ids: Arc<RequestIdSource>,
    ) -> Self {
        Self {
            backend,
            sessions,
            tokens,
            transport,
            ids,
        }
    }

    /// Invoke a named tool with caller-supplied arguments.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the session handshake, the send,
    /// or envelope decoding fails.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, UpstreamError> {
        self.dispatch(
            method::TOOLS_CALL,
            json!({ "name": tool, "arguments": arguments }),
        )
        .await
    }

    /// Enumerate the tools the backend exposes.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the session handshake, the send,
    /// or envelope decoding fails.
    pub async fn list_tools(&self) -> Result<Value, UpstreamError> {
        self.dispatch(method::TOOLS_LIST, json!({})).await
    }

    /// Shared session/token/send/decode pipeline.
    async fn dispatch(&self, rpc_method: &str, params: Value) -> Result<Value, UpstreamError> {
        let handle = self.sessions.get(&self.backend).await?;
        let bearer = maybe_bearer(self.tokens.as_ref(), self.backend.audience()).await;
        let envelope = RpcEnvelope::new(self.ids.next_id(), rpc_method, params);

        let outcome = self
            .round_trip(&handle, bearer.as_deref(), &envelope)
            .await;

        if let Err(e) = &outcome {
            // A dead or rejected session is never retried as-is: drop
            // it so the very next call performs a fresh handshake.
            tracing::warn!(
                backend = self.backend.name(),
                method = rpc_method,
                request_id = envelope.id,
                error = %e,
                "RPC call failed, invalidating session"
            );
            self.sessions.invalidate(self.backend.name()).await;
        }
        outcome
    }

    async fn round_trip(
        &self,
        handle: &SessionHandle,
        bearer: Option<&str>,
        envelope: &RpcEnvelope,
    ) -> Result<Value, UpstreamError> {
        let body = self
            .transport
            .send(&self.backend, &handle.session_id, bearer, envelope)
            .await?;
        decode(body).map_err(UpstreamError::from)
    }
}
