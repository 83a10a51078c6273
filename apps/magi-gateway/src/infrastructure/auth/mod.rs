//! Identity Token Adapter
//!
//! Implements [`TokenProviderPort`] against the compute metadata
//! service: the identity endpoint mints an ID token scoped to the
//! requested audience. Runs unmodified on the serverless platform;
//! local development has no metadata server, so every call fails fast
//! and call sites degrade to unauthenticated forwarding.

use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{TokenError, TokenProviderPort};

/// Path of the identity-token endpoint under the metadata base URL.
const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";

/// Token provider backed by the compute metadata identity endpoint.
#[derive(Debug, Clone)]
pub struct MetadataTokenProvider {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataTokenProvider {
    /// Create a provider for the given metadata base URL.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Network`] if the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TokenError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TokenError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TokenProviderPort for MetadataTokenProvider {
    async fn acquire(&self, audience: &str) -> Result<String, TokenError> {
        let url = format!("{}{IDENTITY_PATH}", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("audience", audience)])
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TokenError::Api { status, message });
        }

        let token = response
            .text()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Api {
                status: 200,
                message: "empty token body".to_string(),
            });
        }

        tracing::debug!(audience, "Identity token minted");
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn mints_token_for_audience() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IDENTITY_PATH))
            .and(query_param("audience", "https://magi-api.example"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_string("tok-123\n"))
            .mount(&server)
            .await;

        let provider =
            MetadataTokenProvider::new(&server.uri(), Duration::from_secs(1)).unwrap();
        let token = provider.acquire("https://magi-api.example").await.unwrap();
        assert_eq!(token, "tok-123");
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IDENTITY_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("audience not allowed"))
            .mount(&server)
            .await;

        let provider =
            MetadataTokenProvider::new(&server.uri(), Duration::from_secs(1)).unwrap();
        let err = provider.acquire("https://other.example").await.unwrap_err();
        assert!(matches!(err, TokenError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn unreachable_metadata_server_is_a_network_error() {
        // Nothing listens on this port.
        let provider =
            MetadataTokenProvider::new("http://127.0.0.1:9", Duration::from_millis(300)).unwrap();
        let err = provider.acquire("https://magi-api.example").await.unwrap_err();
        assert!(matches!(err, TokenError::Network(_)));
    }

    #[tokio::test]
    async fn empty_token_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IDENTITY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
            .mount(&server)
            .await;

        let provider =
            MetadataTokenProvider::new(&server.uri(), Duration::from_secs(1)).unwrap();
        let err = provider.acquire("https://magi-api.example").await.unwrap_err();
        assert!(matches!(err, TokenError::Api { .. }));
    }
}
