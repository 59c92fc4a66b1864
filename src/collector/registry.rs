//! Owns the active collector set and drives one tick's invocations.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;

use crate::collector::{Collector, CollectorResult};

/// The set of collectors polled each tick.
///
/// Collectors run concurrently and independently: a failure or timeout in
/// one never blocks or corrupts another's result. Each invocation is bounded
/// by the registry timeout so one slow external tool cannot stall a tick.
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
    timeout: Duration,
}

impl CollectorRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            collectors: Vec::new(),
            timeout,
        }
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Invoke every collector once, keyed by collector name.
    pub async fn collect_all(&self) -> HashMap<&'static str, CollectorResult> {
        let invocations = self.collectors.iter().map(|collector| async move {
            let name = collector.name();
            let result = match tokio::time::timeout(self.timeout, collector.collect_safe()).await
            {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(collector = name, timeout = ?self.timeout, "collector timed out");
                    CollectorResult::failed(format!(
                        "{name} timed out after {:?}",
                        self.timeout
                    ))
                }
            };
            (name, result)
        });
        join_all(invocations).await.into_iter().collect()
    }
}
