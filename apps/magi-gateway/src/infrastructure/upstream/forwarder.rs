//! Plain-Bearer Forwarder
//!
//! Forwards an inbound request to a plain-bearer backend: method,
//! path suffix, query, and body pass through unchanged; a freshly
//! minted bearer token is attached when the provider produces one.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::Method;
use serde_json::Value;

use crate::application::ports::{TokenProviderPort, UpstreamError};
use crate::application::services::maybe_bearer;
use crate::domain::backend::BackendDescriptor;
use crate::infrastructure::upstream::{classify_transport_error, truncate_body};

/// Forwards requests to plain-bearer backends.
pub struct UpstreamForwarder {
    client: reqwest::Client,
    tokens: Arc<dyn TokenProviderPort>,
    timeout: Duration,
}

impl UpstreamForwarder {
    /// Create a forwarder with a bounded per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Network`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        timeout: Duration,
        tokens: Arc<dyn TokenProviderPort>,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;
        Ok(Self {
            client,
            tokens,
            timeout,
        })
    }

    /// Forward one request and return the upstream body as JSON.
    ///
    /// The upstream's own status code is not propagated: any response
    /// with a JSON-parseable body (or any success) counts as a relay,
    /// and only transport failures or non-success responses with
    /// unusable bodies are errors.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] on connect failure, timeout, or a
    /// non-success status whose body is not JSON.
    pub async fn forward(
        &self,
        backend: &BackendDescriptor,
        method: Method,
        rest: &str,
        query: Option<&str>,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<Value, UpstreamError> {
        let url = backend.join(rest, query);
        let bearer = maybe_bearer(self.tokens.as_ref(), backend.audience()).await;

        let mut request = self.client.request(method, &url);
        if let Some(ct) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, ct);
        }
        if let Some(token) = bearer {
            // Attached only when minting succeeded; never an empty or
            // malformed Authorization header.
            request = request.bearer_auth(token);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e, self.timeout))?;

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Ok(value),
            Err(_) if status.is_success() => Ok(Value::String(text)),
            Err(_) => Err(UpstreamError::Api {
                status: status.as_u16(),
                body: truncate_body(text),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::application::ports::TokenError;
    use crate::domain::backend::ProtocolKind;

    struct StaticTokens(&'static str);

    #[async_trait]
    impl TokenProviderPort for StaticTokens {
        async fn acquire(&self, _audience: &str) -> Result<String, TokenError> {
            Ok(self.0.to_string())
        }
    }

    struct NoTokens;

    #[async_trait]
    impl TokenProviderPort for NoTokens {
        async fn acquire(&self, _audience: &str) -> Result<String, TokenError> {
            Err(TokenError::Network("no metadata server".to_string()))
        }
    }

    fn backend_for(server: &MockServer) -> BackendDescriptor {
        BackendDescriptor::new("api", &server.uri(), &server.uri(), ProtocolKind::PlainBearer)
    }

    #[tokio::test]
    async fn preserves_method_path_query_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/compare"))
            .and(query_param("mode", "consensus"))
            .and(body_string("{\"symbols\":[\"NVDA\"]}"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let forwarder =
            UpstreamForwarder::new(Duration::from_secs(5), Arc::new(StaticTokens("tok-1")))
                .unwrap();
        let value = forwarder
            .forward(
                &backend_for(&server),
                Method::POST,
                "api/compare",
                Some("mode=consensus"),
                Some("application/json"),
                Bytes::from_static(b"{\"symbols\":[\"NVDA\"]}"),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn omits_authorization_when_token_fails() {
        let server = MockServer::start().await;
        // Expect exactly the unauthenticated request.
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let forwarder =
            UpstreamForwarder::new(Duration::from_secs(5), Arc::new(NoTokens)).unwrap();
        let value = forwarder
            .forward(
                &backend_for(&server),
                Method::GET,
                "api/status",
                None,
                None,
                Bytes::new(),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn non_success_json_body_still_relayed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
            .mount(&server)
            .await;

        let forwarder =
            UpstreamForwarder::new(Duration::from_secs(5), Arc::new(NoTokens)).unwrap();
        let value = forwarder
            .forward(
                &backend_for(&server),
                Method::GET,
                "missing",
                None,
                None,
                Bytes::new(),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"error": "not found"}));
    }

    #[tokio::test]
    async fn non_success_unparseable_body_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let forwarder =
            UpstreamForwarder::new(Duration::from_secs(5), Arc::new(NoTokens)).unwrap();
        let err = forwarder
            .forward(
                &backend_for(&server),
                Method::GET,
                "broken",
                None,
                None,
                Bytes::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let forwarder =
            UpstreamForwarder::new(Duration::from_millis(200), Arc::new(NoTokens)).unwrap();
        let err = forwarder
            .forward(
                &backend_for(&server),
                Method::GET,
                "slow",
                None,
                None,
                Bytes::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
