//! Upstream HTTP Adapters
//!
//! Outbound `reqwest` adapters: the plain-bearer forwarder and the
//! session-rpc transport for the tool backend.

mod forwarder;
mod rpc_client;

pub use forwarder::UpstreamForwarder;
pub use rpc_client::{RpcHttpClient, SESSION_HEADER};

use std::time::Duration;

use crate::application::ports::UpstreamError;

/// Longest upstream body fragment carried inside an error.
const ERROR_BODY_LIMIT: usize = 2048;

/// Map a transport failure, distinguishing timeouts so callers can see
/// the configured bound in the message.
fn classify_transport_error(e: &reqwest::Error, timeout: Duration) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout(timeout)
    } else {
        UpstreamError::Network(e.to_string())
    }
}

/// Truncate an upstream body for inclusion in an error message.
fn truncate_body(body: String) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
