//! Token Provider Port (Driven Port)
//!
//! Interface for minting identity tokens scoped to an upstream
//! audience. Each call may reach a network-bound credential service;
//! nothing is cached, so a token for one audience is never replayed
//! against another.

use async_trait::async_trait;

/// Failure to mint a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The credential service could not be reached.
    #[error("credential service unreachable: {0}")]
    Network(String),

    /// The credential service rejected the request.
    #[error("credential service returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },
}

/// Mints a bearer token valid for calls to a given audience.
///
/// Callers treat a failure as "proceed without an `Authorization`
/// header" rather than a hard failure; environments without enforced
/// authentication run fine without tokens.
#[async_trait]
pub trait TokenProviderPort: Send + Sync {
    /// Produce an opaque bearer token scoped to `audience`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the credential service is
    /// unreachable or rejects the audience.
    async fn acquire(&self, audience: &str) -> Result<String, TokenError>;
}
