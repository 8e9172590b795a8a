pub mod fingerprint;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::model::ContextResponse;
use moka::future::Cache;
use moka::Expiry;
use tracing::instrument;

pub use fingerprint::fingerprint;

/// Memoizes `fingerprint -> ContextResponse` (spec.md §4.5). `get` returns
/// `Some` only for present, unexpired entries; `set` inserts or replaces.
/// Implementations must be safe under concurrent reads.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Option<ContextResponse>;
    async fn set(&self, fingerprint: String, response: ContextResponse, ttl: Duration);
    async fn len(&self) -> u64;
}

struct Entry {
    response: ContextResponse,
    ttl: Duration,
}

/// Expires each entry after its own recorded TTL rather than a single
/// cache-wide value, matching spec.md §4.5's "per-entry TTL".
struct PerEntryExpiry;

impl Expiry<String, Arc<Entry>> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<Entry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// `moka`-backed cache: bounded by entry count, size-evicted under the
/// TinyLFU policy `moka` uses in place of strict LRU bookkeeping, and
/// expired per-entry via [`PerEntryExpiry`] (spec.md §4.5, §6
/// `cache_ttl`/capacity).
pub struct MokaResponseCache {
    inner: Cache<String, Arc<Entry>>,
}

impl MokaResponseCache {
    pub fn new(capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .expire_after(PerEntryExpiry)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl ResponseCache for MokaResponseCache {
    #[instrument(level = "trace", skip(self))]
    async fn get(&self, fingerprint: &str) -> Option<ContextResponse> {
        self.inner
            .get(fingerprint)
            .await
            .map(|entry| entry.response.clone())
    }

    #[instrument(level = "trace", skip_all)]
    async fn set(&self, fingerprint: String, response: ContextResponse, ttl: Duration) {
        self.inner
            .insert(fingerprint, Arc::new(Entry { response, ttl }))
            .await;
    }

    async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

/// A cache that never hits; used when `enable_caching` is `false` (spec.md
/// §6) so the orchestrator can always hold a `dyn ResponseCache` rather
/// than branching on an `Option`.
#[derive(Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get(&self, _fingerprint: &str) -> Option<ContextResponse> {
        None
    }

    async fn set(&self, _fingerprint: String, _response: ContextResponse, _ttl: Duration) {}

    async fn len(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::ContextResponse;

    fn response(query: &str) -> ContextResponse {
        ContextResponse::new(query, Vec::new())
    }

    #[tokio::test]
    async fn round_trip_hit() {
        let cache = MokaResponseCache::new(100);
        cache
            .set("fp1".into(), response("q"), Duration::from_secs(60))
            .await;
        let hit = cache.get("fp1").await;
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().query, "q");
    }

    #[tokio::test]
    async fn miss_for_unknown_fingerprint() {
        let cache = MokaResponseCache::new(100);
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = MokaResponseCache::new(100);
        cache
            .set("fp1".into(), response("q"), Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("fp1").await.is_none());
    }

    #[tokio::test]
    async fn noop_cache_never_hits() {
        let cache = NoopCache;
        cache
            .set("fp1".into(), response("q"), Duration::from_secs(60))
            .await;
        assert!(cache.get("fp1").await.is_none());
    }
}
