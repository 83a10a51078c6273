//! Application Services
//!
//! The session cache and RPC dispatcher, plus the shared
//! token-degradation helper used by every outbound call site.

mod dispatcher;
mod session_cache;

pub use dispatcher::RpcDispatcher;
pub use session_cache::{SessionCache, SessionHandle};

use crate::application::ports::TokenProviderPort;

/// Mint a bearer token for `audience`, degrading to `None` on failure.
///
/// A credential failure is never fatal to the request path: the caller
/// proceeds without an `Authorization` header and the failure is only
/// logged. Unauthenticated local backends accept such requests.
pub async fn maybe_bearer(provider: &dyn TokenProviderPort, audience: &str) -> Option<String> {
    match provider.acquire(audience).await {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!(audience, error = %e, "Token acquisition failed, forwarding unauthenticated");
            None
        }
    }
}
