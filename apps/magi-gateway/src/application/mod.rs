//! Application Layer - Services and port definitions.
//!
//! This layer contains the gateway services (session caching, RPC
//! dispatch) and the port interfaces that define how they reach
//! external systems.

/// Port interfaces for external systems (credentials, RPC transport).
pub mod ports;

/// Application services for session caching and RPC dispatch.
pub mod services;
