//! Session-RPC HTTP Transport
//!
//! Implements [`RpcTransportPort`] over HTTP for the tool backend.
//! The initialize handshake yields a session id in the
//! `Mcp-Session-Id` response header; subsequent sends carry it back.
//! Response bodies are classified by content type into the envelope
//! sum type here, at the transport boundary, so no other layer sniffs
//! strings.

use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{RpcTransportPort, UpstreamError};
use crate::domain::backend::BackendDescriptor;
use crate::domain::envelope::ResponseBody;
use crate::domain::rpc::RpcEnvelope;
use crate::infrastructure::upstream::{classify_transport_error, truncate_body};

/// Response header carrying the opaque session id.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Accept header offering both response shapes the backend produces.
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// HTTP transport for the tool backend's RPC endpoint.
pub struct RpcHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl RpcHttpClient {
    /// Create a transport with a bounded per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Network`] if the HTTP client cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn post(
        &self,
        backend: &BackendDescriptor,
        bearer: Option<&str>,
        envelope: &RpcEnvelope,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(backend.rpc_url())
            .header(reqwest::header::ACCEPT, ACCEPT_BOTH)
            .json(envelope);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait]
impl RpcTransportPort for RpcHttpClient {
    async fn initialize(
        &self,
        backend: &BackendDescriptor,
        bearer: Option<&str>,
        envelope: &RpcEnvelope,
    ) -> Result<String, UpstreamError> {
        let response = self
            .post(backend, bearer, envelope)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Handshake(format!(
                "initialize returned status {}: {}",
                status.as_u16(),
                truncate_body(body)
            )));
        }

        // The session id travels in a header, not the body.
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                UpstreamError::Handshake(format!("missing {SESSION_HEADER} response header"))
            })?;

        tracing::debug!(backend = backend.name(), "Initialize handshake completed");
        Ok(session_id)
    }

    async fn send(
        &self,
        backend: &BackendDescriptor,
        session_id: &str,
        bearer: Option<&str>,
        envelope: &RpcEnvelope,
    ) -> Result<ResponseBody, UpstreamError> {
        let response = self
            .post(backend, bearer, envelope)
            .header(SESSION_HEADER, session_id)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, self.timeout))?;

        let status = response.status();
        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e, self.timeout))?;

        if is_event_stream {
            Ok(ResponseBody::EventStream(text))
        } else {
            serde_json::from_str(&text)
                .map(ResponseBody::PlainJson)
                .map_err(|e| UpstreamError::InvalidJson(e.to_string()))
        }
    }
}
