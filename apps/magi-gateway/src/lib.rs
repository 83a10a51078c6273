#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::default_trait_access
    )
)]

//! Magi Gateway - Authenticated Reverse Proxy
//!
//! An HTTP gateway that fronts the Magi backend services. Plain
//! bearer-token backends get transparent forwarding with freshly
//! minted identity tokens; the stateful tool backend gets a cached,
//! self-healing RPC session and envelope decoding.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure gateway types and logic
//!   - `backend`: Backend descriptors and the routing registry
//!   - `envelope`: JSON / event-stream response decoding
//!   - `rpc`: RPC envelopes and request-id generation
//!
//! - **Application**: Services and port definitions
//!   - `ports`: Interfaces for token minting and the RPC transport
//!   - `services`: Session cache and RPC dispatcher
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `auth`: Metadata-service identity tokens
//!   - `upstream`: Outbound HTTP adapters
//!   - `http`: Inbound axum router and handlers
//!   - `config`: Environment configuration
//!   - `telemetry`: Tracing initialization
//!
//! # Request Flow
//!
//! ```text
//! caller ──► Proxy Router ──► plain backend (token attached)
//!               │
//!               └──► RPC Dispatcher ──► Session Cache ──► handshake
//!                         │
//!                         └──► tool backend ──► Envelope Decoder ──► JSON
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Pure gateway types with no I/O dependencies.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::backend::{BackendDescriptor, BackendRegistry, ProtocolKind};
pub use domain::envelope::{DecodeError, ResponseBody, decode};
pub use domain::rpc::{RequestIdSource, RpcEnvelope};

// Ports
pub use application::ports::{RpcTransportPort, TokenError, TokenProviderPort, UpstreamError};

// Services
pub use application::services::{RpcDispatcher, SessionCache, SessionHandle, maybe_bearer};

// Infrastructure config
pub use infrastructure::config::{ConfigError, GatewayConfig};

// HTTP surface (for integration tests)
pub use infrastructure::http::{AppState, GatewayServer, GatewayServerError, router};

// Outbound adapters
pub use infrastructure::auth::MetadataTokenProvider;
pub use infrastructure::upstream::{RpcHttpClient, SESSION_HEADER, UpstreamForwarder};
