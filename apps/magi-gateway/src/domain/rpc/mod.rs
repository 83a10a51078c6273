//! RPC Envelopes
//!
//! JSON-RPC 2.0 request envelopes for the tool backend, plus the
//! process-wide monotonic request-id source. An envelope is created
//! fresh for every outbound call and its id is never reused.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision sent during the initialize handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Well-known RPC method names.
pub mod method {
    /// Session-establishment handshake.
    pub const INITIALIZE: &str = "initialize";
    /// Generic tool invocation.
    pub const TOOLS_CALL: &str = "tools/call";
    /// Tool enumeration.
    pub const TOOLS_LIST: &str = "tools/list";
}

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcEnvelope {
    /// Protocol version tag, always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Unique, monotonically increasing request id.
    pub id: u64,
    /// Method name.
    pub method: String,
    /// Method parameters.
    pub params: Value,
}

impl RpcEnvelope {
    /// Build an envelope for one outbound call.
    #[must_use]
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Parameters for the initialize handshake.
#[must_use]
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "magi-gateway",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Process-wide source of unique request ids.
///
/// Ids start at 1 and increase monotonically for the life of the
/// process. Shared freely between handlers; incrementing is lock-free.
#[derive(Debug, Default)]
pub struct RequestIdSource {
    next: AtomicU64,
}

impl RequestIdSource {
    /// Create a source starting at id 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Take the next unique id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}
