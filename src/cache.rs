//! TTL memoization for the privileged sampler.
//!
//! `powermetrics` is expensive and needs elevated privileges, so a dashboard
//! refreshing every second must not invoke it every tick. [`SamplerCache`]
//! wraps exactly one collector and serves the last successful result until
//! its TTL lapses. The cache itself implements [`Collector`], so the registry
//! holds it in place of the wrapped sampler.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::collector::{Collector, CollectorResult, SampleData};
use crate::error::Result;

struct CacheEntry {
    value: CollectorResult,
    expires_at: Instant,
}

/// Short-TTL cache around one expensive collector.
///
/// Refresh is single-flight: the slot lock is held across the wrapped
/// collector's invocation, so two concurrent misses cannot both run the
/// sampler or race on `expires_at`.
pub struct SamplerCache {
    inner: Box<dyn Collector>,
    ttl: Duration,
    slot: tokio::sync::Mutex<Option<CacheEntry>>,
}

impl SamplerCache {
    pub fn new(inner: Box<dyn Collector>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            slot: tokio::sync::Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value while fresh; otherwise refresh from the wrapped
    /// collector.
    ///
    /// A failed refresh is returned honestly and not cached: the expired
    /// entry it would have replaced is dropped rather than served, so callers
    /// can distinguish "no fresh data" from a stale reading.
    pub async fn get(&self) -> CollectorResult {
        self.get_at(Instant::now()).await
    }

    async fn get_at(&self, now: Instant) -> CollectorResult {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref() {
            if now < entry.expires_at {
                return entry.value.clone();
            }
        }
        let fresh = self.inner.collect_safe().await;
        if fresh.success {
            *slot = Some(CacheEntry {
                value: fresh.clone(),
                expires_at: now + self.ttl,
            });
        } else {
            tracing::debug!(
                collector = self.inner.name(),
                "cache refresh failed, dropping expired entry"
            );
            *slot = None;
        }
        fresh
    }
}

#[async_trait]
impl Collector for SamplerCache {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn collect(&self) -> Result<SampleData> {
        // Unused: collect_safe is overridden to preserve the wrapped
        // collector's error string instead of re-wrapping it.
        Ok(self.get().await.data)
    }

    async fn collect_safe(&self) -> CollectorResult {
        self.get().await
    }
}
