//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port
//! interfaces defined in the application layer, plus the inbound HTTP
//! surface.

/// Identity-token adapter backed by the metadata service.
pub mod auth;

/// Configuration loading and dependency injection.
pub mod config;

/// Inbound HTTP router and handlers.
pub mod http;

/// Tracing and log subscriber initialization.
pub mod telemetry;

/// Outbound HTTP adapters for upstream backends.
pub mod upstream;
