//! Tracing Initialization
//!
//! Structured logging via `tracing` with an `EnvFilter`. `RUST_LOG`
//! overrides the default filter.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "magi_gateway=info";

/// Initialize the global tracing subscriber.
///
/// Safe to call once at startup; a second call is ignored so tests
/// that race on initialization do not panic.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
