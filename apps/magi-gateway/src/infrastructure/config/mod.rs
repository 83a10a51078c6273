//! Configuration Module
//!
//! Configuration loading for the gateway service.

mod settings;

pub use settings::{
    AGENT_BACKEND, API_BACKEND, AuthSettings, BackendSettings, ConfigError, GatewayConfig,
    ServerSettings, SessionSettings, TOOL_BACKEND, UpstreamSettings,
};
