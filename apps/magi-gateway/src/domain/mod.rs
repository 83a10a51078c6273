//! Domain Layer - Core gateway types and business logic.
//!
//! This layer contains the core domain types for upstream routing and
//! RPC envelope handling with no I/O dependencies. All types here are
//! pure Rust with serialization support.

/// Backend descriptors and the routing registry.
pub mod backend;

/// JSON-or-event-stream response envelope decoding.
pub mod envelope;

/// RPC envelope types and request-id generation.
pub mod rpc;
