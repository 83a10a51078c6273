//! Session Cache
//!
//! Holds at most one live session handle per session-rpc backend,
//! process-wide. A miss or an expired handle triggers the initialize
//! handshake; the per-backend lock is held across check-and-handshake
//! so concurrent misses collapse into a single handshake (single
//! flight) and every waiter observes the handle it produced.
//!
//! The lease is deliberately short: the backend gives no out-of-band
//! invalidation signal, so staleness is bounded by time alone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::application::ports::{RpcTransportPort, TokenProviderPort, UpstreamError};
use crate::application::services::maybe_bearer;
use crate::domain::backend::{BackendDescriptor, BackendRegistry};
use crate::domain::rpc::{RequestIdSource, RpcEnvelope, initialize_params, method};

/// An established session with a session-rpc backend.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Opaque session identifier issued by the backend.
    pub session_id: String,
    /// Instant after which the handle is treated as absent.
    pub expires_at: Instant,
}

impl SessionHandle {
    /// Whether the handle is still within its lease.
    #[must_use]
    pub fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Per-backend cache of session handles with single-flight handshakes.
pub struct SessionCache {
    lease: Duration,
    tokens: Arc<dyn TokenProviderPort>,
    transport: Arc<dyn RpcTransportPort>,
    ids: Arc<RequestIdSource>,
    slots: HashMap<String, Mutex<Option<SessionHandle>>>,
}

impl SessionCache {
    /// Build a cache with one slot per session-rpc backend in the
    /// registry. The slot set is fixed at startup.
    #[must_use]
    pub fn new(
        registry: &BackendRegistry,
        lease: Duration,
        tokens: Arc<dyn TokenProviderPort>,
        transport: Arc<dyn RpcTransportPort>,
        ids: Arc<RequestIdSource>,
    ) -> Self {
        let slots = registry
            .session_rpc()
            .map(|d| (d.name().to_string(), Mutex::new(None)))
            .collect();
        Self {
            lease,
            tokens,
            transport,
            ids,
            slots,
        }
    }

    /// Get a live session handle for `backend`, performing the
    /// initialize handshake on miss or expiry.
    ///
    /// The backend's slot lock is held for the whole check-handshake-
    /// store sequence, so at most one handshake is in flight per
    /// backend and concurrent callers share its result.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the backend has no slot or the
    /// handshake fails; nothing is cached on failure.
    pub async fn get(&self, backend: &BackendDescriptor) -> Result<SessionHandle, UpstreamError> {
        let slot = self
            .slots
            .get(backend.name())
            .ok_or_else(|| UpstreamError::UnknownBackend(backend.name().to_string()))?;

        let mut guard = slot.lock().await;
        if let Some(handle) = guard.as_ref()
            && handle.is_live()
        {
            return Ok(handle.clone());
        }

        let bearer = maybe_bearer(self.tokens.as_ref(), backend.audience()).await;
        let envelope = RpcEnvelope::new(self.ids.next_id(), method::INITIALIZE, initialize_params());
        let session_id = self
            .transport
            .initialize(backend, bearer.as_deref(), &envelope)
            .await?;

        let handle = SessionHandle {
            session_id,
            expires_at: Instant::now() + self.lease,
        };
        tracing::info!(
            backend = backend.name(),
            lease_secs = self.lease.as_secs(),
            "Session established"
        );
        *guard = Some(handle.clone());
        Ok(handle)
    }

    /// Drop any cached handle for `backend_name` unconditionally. The
    /// next `get` re-handshakes instead of retrying a dead session.
    pub async fn invalidate(&self, backend_name: &str) {
        if let Some(slot) = self.slots.get(backend_name) {
            let mut guard = slot.lock().await;
            if guard.take().is_some() {
                tracing::info!(backend = backend_name, "Session invalidated");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio_test::assert_ok;

    use super::*;
    use crate::application::ports::TokenError;
    use crate::domain::backend::ProtocolKind;
    use crate::domain::envelope::ResponseBody;

    struct StaticTokens;

    #[async_trait]
    impl TokenProviderPort for StaticTokens {
        async fn acquire(&self, _audience: &str) -> Result<String, TokenError> {
            Ok("test-token".to_string())
        }
    }

    /// Counts handshakes and hands out sequential session ids.
    struct CountingTransport {
        handshakes: AtomicUsize,
        handshake_delay: Duration,
        fail_next: AtomicBool,
    }

    impl CountingTransport {
        fn new() -> Self {
            Self {
                handshakes: AtomicUsize::new(0),
                handshake_delay: Duration::ZERO,
                fail_next: AtomicBool::new(false),
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                handshake_delay: delay,
                ..Self::new()
            }
        }

        fn count(&self) -> usize {
            self.handshakes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RpcTransportPort for CountingTransport {
        async fn initialize(
            &self,
            _backend: &BackendDescriptor,
            bearer: Option<&str>,
            envelope: &RpcEnvelope,
        ) -> Result<String, UpstreamError> {
            assert_eq!(envelope.method, method::INITIALIZE);
            assert_eq!(bearer, Some("test-token"));
            tokio::time::sleep(self.handshake_delay).await;
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(UpstreamError::Handshake("connection reset".to_string()));
            }
            let n = self.handshakes.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("session-{n}"))
        }

        async fn send(
            &self,
            _backend: &BackendDescriptor,
            _session_id: &str,
            _bearer: Option<&str>,
            _envelope: &RpcEnvelope,
        ) -> Result<ResponseBody, UpstreamError> {
            Ok(ResponseBody::PlainJson(Value::Null))
        }
    }

    fn tool_backend() -> BackendDescriptor {
        BackendDescriptor::new(
            "tool",
            "http://tool.test",
            "http://tool.test",
            ProtocolKind::SessionRpc,
        )
    }

    fn cache_with(transport: Arc<CountingTransport>, lease: Duration) -> SessionCache {
        let registry = BackendRegistry::new(vec![tool_backend()]);
        SessionCache::new(
            &registry,
            lease,
            Arc::new(StaticTokens),
            transport,
            Arc::new(RequestIdSource::new()),
        )
    }

    #[tokio::test]
    async fn handle_reused_within_lease() {
        let transport = Arc::new(CountingTransport::new());
        let cache = cache_with(Arc::clone(&transport), Duration::from_secs(300));
        let backend = tool_backend();

        let first = assert_ok!(cache.get(&backend).await);
        let second = assert_ok!(cache.get(&backend).await);

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test]
    async fn expired_handle_triggers_one_new_handshake() {
        let transport = Arc::new(CountingTransport::new());
        let cache = cache_with(Arc::clone(&transport), Duration::from_millis(20));
        let backend = tool_backend();

        let first = assert_ok!(cache.get(&backend).await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = assert_ok!(cache.get(&backend).await);

        assert_ne!(first.session_id, second.session_id);
        assert_eq!(transport.count(), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_handshake() {
        let transport = Arc::new(CountingTransport::with_delay(Duration::from_millis(30)));
        let cache = Arc::new(cache_with(Arc::clone(&transport), Duration::from_secs(300)));
        let backend = tool_backend();

        let a = {
            let cache = Arc::clone(&cache);
            let backend = backend.clone();
            tokio::spawn(async move { cache.get(&backend).await })
        };
        let b = {
            let cache = Arc::clone(&cache);
            let backend = backend.clone();
            tokio::spawn(async move { cache.get(&backend).await })
        };

        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test]
    async fn failed_handshake_caches_nothing() {
        let transport = Arc::new(CountingTransport::new());
        transport.fail_next.store(true, Ordering::SeqCst);
        let cache = cache_with(Arc::clone(&transport), Duration::from_secs(300));
        let backend = tool_backend();

        let err = cache.get(&backend).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Handshake(_)));

        // Next call performs a fresh handshake rather than seeing a
        // stored partial handle.
        let handle = assert_ok!(cache.get(&backend).await);
        assert_eq!(handle.session_id, "session-1");
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_rehandshake() {
        let transport = Arc::new(CountingTransport::new());
        let cache = cache_with(Arc::clone(&transport), Duration::from_secs(300));
        let backend = tool_backend();

        let first = assert_ok!(cache.get(&backend).await);
        cache.invalidate(backend.name()).await;
        let second = assert_ok!(cache.get(&backend).await);

        assert_ne!(first.session_id, second.session_id);
        assert_eq!(transport.count(), 2);
    }

    #[tokio::test]
    async fn unknown_backend_is_an_error() {
        let transport = Arc::new(CountingTransport::new());
        let cache = cache_with(transport, Duration::from_secs(300));
        let stranger = BackendDescriptor::new(
            "stranger",
            "http://stranger.test",
            "http://stranger.test",
            ProtocolKind::SessionRpc,
        );

        let err = cache.get(&stranger).await.unwrap_err();
        assert!(matches!(err, UpstreamError::UnknownBackend(_)));
    }
}
