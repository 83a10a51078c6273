//! Gateway Configuration Settings
//!
//! Configuration types for the gateway, loaded from environment
//! variables. Backends are registered only when their base-URL
//! variable is set, so a deployment can front any subset of the
//! upstream services.

use std::time::Duration;

use crate::domain::backend::{BackendDescriptor, BackendRegistry, ProtocolKind};

/// Route prefix of the plain-bearer analysis API backend.
pub const API_BACKEND: &str = "api";

/// Route prefix of the plain-bearer agent backend.
pub const AGENT_BACKEND: &str = "agent";

/// Route prefix of the session-rpc tool backend.
pub const TOOL_BACKEND: &str = "tool";

/// Listening-port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Inbound HTTP port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Outbound call settings.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Total per-request timeout for upstream calls. Generous because
    /// upstream services may be cold-starting.
    pub timeout: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
        }
    }
}

/// Session-cache settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Lease duration for cached session handles. Short, because the
    /// only staleness bound is time.
    pub lease: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(300),
        }
    }
}

/// Credential-service settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Base URL of the identity metadata service.
    pub metadata_url: String,
    /// Timeout for token requests; short so a missing metadata server
    /// degrades quickly to unauthenticated forwarding.
    pub timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            metadata_url: "http://metadata.google.internal".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

/// Configured upstream base URLs. `None` means the backend is not
/// registered in this deployment.
#[derive(Debug, Clone, Default)]
pub struct BackendSettings {
    /// Analysis API base URL (`MAGI_API_URL`).
    pub api_url: Option<String>,
    /// Agent service base URL (`MAGI_AGENT_URL`).
    pub agent_url: Option<String>,
    /// Tool backend base URL (`MAGI_TOOL_URL`).
    pub tool_url: Option<String>,
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Listening-port settings.
    pub server: ServerSettings,
    /// Outbound call settings.
    pub upstream: UpstreamSettings,
    /// Session-cache settings.
    pub session: SessionSettings,
    /// Credential-service settings.
    pub auth: AuthSettings,
    /// Upstream base URLs.
    pub backends: BackendSettings,
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend base URL is configured at all.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backends = BackendSettings {
            api_url: non_empty_env("MAGI_API_URL"),
            agent_url: non_empty_env("MAGI_AGENT_URL"),
            tool_url: non_empty_env("MAGI_TOOL_URL"),
        };

        if backends.api_url.is_none()
            && backends.agent_url.is_none()
            && backends.tool_url.is_none()
        {
            return Err(ConfigError::NoBackends);
        }

        let server = ServerSettings {
            port: parse_env_u16("PORT", ServerSettings::default().port),
        };

        let upstream = UpstreamSettings {
            timeout: parse_env_duration_secs(
                "GATEWAY_UPSTREAM_TIMEOUT_SECS",
                UpstreamSettings::default().timeout,
            ),
        };

        let session = SessionSettings {
            lease: parse_env_duration_secs(
                "GATEWAY_SESSION_LEASE_SECS",
                SessionSettings::default().lease,
            ),
        };

        let auth = AuthSettings {
            metadata_url: std::env::var("GATEWAY_METADATA_URL")
                .unwrap_or_else(|_| AuthSettings::default().metadata_url),
            timeout: AuthSettings::default().timeout,
        };

        Ok(Self {
            server,
            upstream,
            session,
            auth,
            backends,
        })
    }

    /// Build the backend registry from the configured base URLs.
    ///
    /// Each backend's token audience is its own base URL, matching how
    /// the upstream platform scopes identity tokens to the service
    /// being called.
    #[must_use]
    pub fn registry(&self) -> BackendRegistry {
        let mut descriptors = Vec::new();
        if let Some(url) = &self.backends.api_url {
            descriptors.push(BackendDescriptor::new(
                API_BACKEND,
                url,
                url,
                ProtocolKind::PlainBearer,
            ));
        }
        if let Some(url) = &self.backends.agent_url {
            descriptors.push(BackendDescriptor::new(
                AGENT_BACKEND,
                url,
                url,
                ProtocolKind::PlainBearer,
            ));
        }
        if let Some(url) = &self.backends.tool_url {
            descriptors.push(BackendDescriptor::new(
                TOOL_BACKEND,
                url,
                url,
                ProtocolKind::SessionRpc,
            ));
        }
        BackendRegistry::new(descriptors)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No backend base URL was configured.
    #[error("no backend configured: set MAGI_API_URL, MAGI_AGENT_URL, or MAGI_TOOL_URL")]
    NoBackends,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_settings_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn upstream_settings_defaults() {
        let settings = UpstreamSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(120));
    }

    #[test]
    fn session_settings_defaults() {
        let settings = SessionSettings::default();
        assert_eq!(settings.lease, Duration::from_secs(300));
    }

    #[test]
    fn auth_settings_defaults() {
        let settings = AuthSettings::default();
        assert_eq!(settings.metadata_url, "http://metadata.google.internal");
        assert_eq!(settings.timeout, Duration::from_secs(3));
    }

    #[test]
    fn registry_registers_only_configured_backends() {
        let config = GatewayConfig {
            backends: BackendSettings {
                api_url: Some("https://api.example".to_string()),
                agent_url: None,
                tool_url: Some("https://tool.example".to_string()),
            },
            ..GatewayConfig::default()
        };

        let registry = config.registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(AGENT_BACKEND).is_none());

        let api = registry.get(API_BACKEND).unwrap();
        assert_eq!(api.kind(), ProtocolKind::PlainBearer);
        assert_eq!(api.audience(), "https://api.example");

        let tool = registry.get(TOOL_BACKEND).unwrap();
        assert_eq!(tool.kind(), ProtocolKind::SessionRpc);
    }

    #[test]
    fn registry_audience_matches_base_url() {
        let config = GatewayConfig {
            backends: BackendSettings {
                api_url: Some("https://api.example/".to_string()),
                agent_url: None,
                tool_url: None,
            },
            ..GatewayConfig::default()
        };

        let api = config.registry().get(API_BACKEND).cloned().unwrap();
        // Trailing slash trimmed on the base URL, audience kept as given.
        assert_eq!(api.base_url(), "https://api.example");
        assert_eq!(api.audience(), "https://api.example/");
    }
}
