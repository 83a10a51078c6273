//! Backend Descriptors
//!
//! Immutable descriptions of the upstream services the gateway fronts.
//! Descriptors are built once at startup from configuration and shared
//! read-only across all request handlers.

use std::collections::HashMap;

/// How the gateway talks to an upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Plain HTTP with a bearer token per request.
    PlainBearer,
    /// Stateful JSON-RPC over HTTP with a cached session handle.
    SessionRpc,
}

impl ProtocolKind {
    /// Get the protocol name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlainBearer => "plain-bearer",
            Self::SessionRpc => "session-rpc",
        }
    }
}

/// An upstream service the gateway can route to.
///
/// The `name` doubles as the inbound route prefix (`/proxy/<name>/...`).
/// The `audience` is the identity a minted token must be scoped to; a
/// token minted for one audience is never presented to another.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    name: String,
    base_url: String,
    audience: String,
    kind: ProtocolKind,
}

impl BackendDescriptor {
    /// Create a descriptor. The base URL is normalized without a
    /// trailing slash so path joining is unambiguous.
    #[must_use]
    pub fn new(name: &str, base_url: &str, audience: &str, kind: ProtocolKind) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            audience: audience.to_string(),
            kind,
        }
    }

    /// Logical name, also the route prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upstream base URL (no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token audience for this backend.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Protocol kind.
    #[must_use]
    pub const fn kind(&self) -> ProtocolKind {
        self.kind
    }

    /// Join a path suffix (and optional query string) onto the base URL.
    #[must_use]
    pub fn join(&self, rest: &str, query: Option<&str>) -> String {
        let rest = rest.trim_start_matches('/');
        match query {
            Some(q) if !q.is_empty() => format!("{}/{}?{}", self.base_url, rest, q),
            _ => format!("{}/{}", self.base_url, rest),
        }
    }

    /// The RPC endpoint for a session-rpc backend.
    #[must_use]
    pub fn rpc_url(&self) -> String {
        format!("{}/mcp", self.base_url)
    }
}

/// Read-only registry of backends, keyed by route prefix.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, BackendDescriptor>,
}

impl BackendRegistry {
    /// Build a registry from descriptors. Later duplicates replace
    /// earlier ones.
    #[must_use]
    pub fn new(descriptors: Vec<BackendDescriptor>) -> Self {
        let backends = descriptors
            .into_iter()
            .map(|d| (d.name().to_string(), d))
            .collect();
        Self { backends }
    }

    /// Look up a backend by route prefix.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BackendDescriptor> {
        self.backends.get(name)
    }

    /// Iterate all registered backends.
    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.values()
    }

    /// The session-rpc backends (the "tool" backends).
    pub fn session_rpc(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends
            .values()
            .filter(|d| d.kind() == ProtocolKind::SessionRpc)
    }

    /// Number of registered backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backends are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
