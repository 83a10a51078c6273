//! RPC Transport Port (Driven Port)
//!
//! Interface for the tool backend's session-oriented RPC protocol:
//! the initialize handshake that yields a session id, and envelope
//! sends under an established session.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::backend::BackendDescriptor;
use crate::domain::envelope::{DecodeError, ResponseBody};
use crate::domain::rpc::RpcEnvelope;

/// Failure while talking to an upstream service.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Transport-level failure (connect, DNS, TLS, broken stream).
    #[error("upstream request failed: {0}")]
    Network(String),

    /// The upstream call exceeded the configured timeout.
    #[error("upstream request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The upstream answered with a non-success status and an
    /// unusable body.
    #[error("upstream returned status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The session-establishment handshake failed.
    #[error("session handshake failed: {0}")]
    Handshake(String),

    /// No backend is registered under the requested prefix.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// The response envelope could not be decoded.
    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] DecodeError),

    /// The upstream body was neither an event stream nor valid JSON.
    #[error("invalid JSON from upstream: {0}")]
    InvalidJson(String),
}

/// Transport for the tool backend's RPC endpoint.
#[async_trait]
pub trait RpcTransportPort: Send + Sync {
    /// Perform the initialize handshake and return the opaque session
    /// id carried in the designated response header.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] on transport failure, a non-success
    /// status, or a response missing the session header.
    async fn initialize(
        &self,
        backend: &BackendDescriptor,
        bearer: Option<&str>,
        envelope: &RpcEnvelope,
    ) -> Result<String, UpstreamError>;

    /// Send an envelope under an established session and return the
    /// classified response body.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] on transport failure or a non-success
    /// status (including a session rejection).
    async fn send(
        &self,
        backend: &BackendDescriptor,
        session_id: &str,
        bearer: Option<&str>,
        envelope: &RpcEnvelope,
    ) -> Result<ResponseBody, UpstreamError>;
}
