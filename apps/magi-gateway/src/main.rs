//! Magi Gateway Binary
//!
//! Starts the authenticated reverse proxy.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin magi-gateway
//! ```
//!
//! # Environment Variables
//!
//! ## Backends (at least one required)
//! - `MAGI_API_URL`: Analysis API base URL (plain bearer)
//! - `MAGI_AGENT_URL`: Agent service base URL (plain bearer)
//! - `MAGI_TOOL_URL`: Tool backend base URL (session RPC)
//!
//! ## Optional
//! - `PORT`: Listen port (default: 8080)
//! - `GATEWAY_UPSTREAM_TIMEOUT_SECS`: Upstream timeout (default: 120)
//! - `GATEWAY_SESSION_LEASE_SECS`: Session lease (default: 300)
//! - `GATEWAY_METADATA_URL`: Identity metadata base URL
//!   (default: <http://metadata.google.internal>)
//! - `RUST_LOG`: Log filter (default: magi_gateway=info)

use std::sync::Arc;

use magi_gateway::infrastructure::config::TOOL_BACKEND;
use magi_gateway::infrastructure::telemetry;
use magi_gateway::{
    AppState, GatewayConfig, GatewayServer, MetadataTokenProvider, RequestIdSource, RpcDispatcher,
    RpcHttpClient, RpcTransportPort, SessionCache, TokenProviderPort, UpstreamForwarder,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    telemetry::init();

    tracing::info!("Starting Magi Gateway");

    let config = GatewayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let registry = Arc::new(config.registry());

    let tokens: Arc<dyn TokenProviderPort> = Arc::new(MetadataTokenProvider::new(
        &config.auth.metadata_url,
        config.auth.timeout,
    )?);

    let forwarder = Arc::new(UpstreamForwarder::new(
        config.upstream.timeout,
        Arc::clone(&tokens),
    )?);

    // The RPC pipeline exists only when a tool backend is configured.
    let dispatcher = match registry.get(TOOL_BACKEND) {
        Some(tool) => {
            let transport: Arc<dyn RpcTransportPort> =
                Arc::new(RpcHttpClient::new(config.upstream.timeout)?);
            let ids = Arc::new(RequestIdSource::new());
            let sessions = Arc::new(SessionCache::new(
                &registry,
                config.session.lease,
                Arc::clone(&tokens),
                Arc::clone(&transport),
                Arc::clone(&ids),
            ));
            Some(Arc::new(RpcDispatcher::new(
                tool.clone(),
                sessions,
                Arc::clone(&tokens),
                transport,
                ids,
            )))
        }
        None => None,
    };

    let state = AppState::new(registry, forwarder, dispatcher);
    let server = GatewayServer::new(config.server.port, state, shutdown_token.clone());

    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Gateway server error");
        }
    });

    tracing::info!("Gateway ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &GatewayConfig) {
    tracing::info!(
        port = config.server.port,
        upstream_timeout_secs = config.upstream.timeout.as_secs(),
        session_lease_secs = config.session.lease.as_secs(),
        "Configuration loaded"
    );
    tracing::debug!(
        api_url = config.backends.api_url.as_deref().unwrap_or("-"),
        agent_url = config.backends.agent_url.as_deref().unwrap_or("-"),
        tool_url = config.backends.tool_url.as_deref().unwrap_or("-"),
        metadata_url = %config.auth.metadata_url,
        "Backend endpoints"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }

    shutdown_token.cancel();
}
