//! Port Interfaces
//!
//! Contracts the infrastructure adapters implement, following the
//! Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`TokenProviderPort`]: mint a bearer token for an audience
//! - [`RpcTransportPort`]: session handshake and RPC send for the tool
//!   backend

mod rpc_transport_port;
mod token_provider_port;

pub use rpc_transport_port::{RpcTransportPort, UpstreamError};
pub use token_provider_port::{TokenError, TokenProviderPort};
