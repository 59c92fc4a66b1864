//! The driving loop tying the pipeline together.
//!
//! One [`Monitor`] owns a collector registry, a history buffer and an alert
//! engine. Each [`tick`](Monitor::tick) polls every collector, merges the
//! results into a snapshot, pushes it into history and evaluates the alert
//! rules. [`run`](Monitor::run) repeats that on the configured interval
//! until told to stop.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::alert::{AlertEngine, AlertEvent};
use crate::cache::SamplerCache;
use crate::collector::{
    CollectorRegistry, NetworkCollector, PowermetricsCollector, ProcessCollector,
    SensorToolsCollector, SystemCollector,
};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::history::HistoryBuffer;
use crate::snapshot::{merge, MetricsSnapshot, SensorPrecedence};

pub struct Monitor {
    registry: CollectorRegistry,
    history: Mutex<HistoryBuffer>,
    engine: Mutex<AlertEngine>,
    /// Most recent error string per collector, for the diagnostics surface.
    last_errors: Mutex<HashMap<&'static str, String>>,
    poll_interval: Duration,
    precedence: SensorPrecedence,
}

impl Monitor {
    /// Build a monitor with the standard collector set: primary system,
    /// cached privileged sampler, sensor-tool fallback, network and process
    /// table.
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        let mut registry = CollectorRegistry::new(config.collector_timeout());
        registry.register(Box::new(SystemCollector::new(
            config.disk_mounts_max,
            config.include_system_info,
        )));
        registry.register(Box::new(SamplerCache::new(
            Box::new(PowermetricsCollector::new(config.sampler_timeout())),
            config.sampler_cache_ttl(),
        )));
        registry.register(Box::new(SensorToolsCollector::new(config.sensor_timeout())));
        registry.register(Box::new(NetworkCollector::new(
            config.network_per_interface,
        )));
        registry.register(Box::new(ProcessCollector::new(config.process_top_n)));
        Self::with_registry(config, registry)
    }

    /// Build a monitor around a caller-assembled registry. Used by embedders
    /// that swap in their own collector set.
    pub fn with_registry(config: &MonitorConfig, registry: CollectorRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            history: Mutex::new(HistoryBuffer::new(config.history_capacity)),
            engine: Mutex::new(AlertEngine::with_rules(config.rules.clone())),
            last_errors: Mutex::new(HashMap::new()),
            poll_interval: config.poll_interval(),
            precedence: config.sensor_precedence,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// One complete poll: collect, merge, record, evaluate.
    ///
    /// All awaiting happens in the collect phase; merge, history push and
    /// alert evaluation are synchronous, so a tick cancelled mid-flight
    /// leaves no partial state behind.
    pub async fn tick(&self) -> (MetricsSnapshot, Vec<AlertEvent>) {
        let results = self.registry.collect_all().await;
        let timestamp = SystemTime::now();

        let snapshot = merge(&results, timestamp, self.precedence);
        {
            let mut errors = self.last_errors.lock();
            for (name, result) in &results {
                match &result.error {
                    Some(error) => {
                        errors.insert(*name, error.clone());
                    }
                    None => {
                        errors.remove(*name);
                    }
                }
            }
        }
        self.history.lock().push(snapshot.clone());
        let events = self.engine.lock().evaluate(&snapshot);
        tracing::trace!(
            collectors = results.len(),
            failed = results.values().filter(|r| !r.success).count(),
            alerts = events.len(),
            "tick complete"
        );
        (snapshot, events)
    }

    /// Tick on the configured interval until the shutdown flag flips true
    /// (or its sender is dropped). An in-flight tick always completes before
    /// the loop observes shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("monitor loop stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Read-only history sequence, oldest-to-newest.
    pub fn history(&self) -> Vec<MetricsSnapshot> {
        self.history.lock().to_vec()
    }

    pub fn latest(&self) -> Option<MetricsSnapshot> {
        self.history.lock().latest().cloned()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Most recent fired events, newest first.
    pub fn events(&self, limit: usize) -> Vec<AlertEvent> {
        self.engine.lock().events(limit)
    }

    /// Last error string per collector, for "unavailable" diagnostics in the
    /// presentation layer.
    pub fn last_errors(&self) -> HashMap<&'static str, String> {
        self.last_errors.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::alert::{AlertRule, AlertSeverity, Operator};
    use crate::collector::{self, Collector, SampleData};
    use crate::error::Error;
    use crate::snapshot::types::CpuSample;

    struct StubSystem {
        percent: f64,
    }

    #[async_trait]
    impl Collector for StubSystem {
        fn name(&self) -> &'static str {
            collector::SYSTEM
        }

        async fn collect(&self) -> crate::error::Result<SampleData> {
            Ok(SampleData {
                cpu: Some(CpuSample {
                    percent: self.percent,
                    count: 4,
                    per_core: Vec::new(),
                }),
                ..Default::default()
            })
        }
    }

    struct StubSampler;

    #[async_trait]
    impl Collector for StubSampler {
        fn name(&self) -> &'static str {
            collector::POWERMETRICS
        }

        async fn collect(&self) -> crate::error::Result<SampleData> {
            Err(Error::not_available("powermetrics requires sudo"))
        }
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval_sec: 0.01,
            history_capacity: 3,
            rules: vec![AlertRule {
                id: "cpu-high".to_string(),
                name: "CPU high".to_string(),
                metric: "cpu_percent".to_string(),
                operator: Operator::Gt,
                threshold: 90.0,
                severity: AlertSeverity::Critical,
                enabled: true,
                cooldown_sec: 60.0,
            }],
            ..Default::default()
        }
    }

    fn stub_monitor(percent: f64) -> Monitor {
        let config = test_config();
        let mut registry = CollectorRegistry::new(config.collector_timeout());
        registry.register(Box::new(StubSystem { percent }));
        registry.register(Box::new(StubSampler));
        Monitor::with_registry(&config, registry).expect("monitor")
    }

    #[tokio::test]
    async fn tick_records_history_and_evaluates_rules() {
        let monitor = stub_monitor(95.0);
        let (snapshot, events) = monitor.tick().await;
        assert_eq!(snapshot.metric("cpu_percent"), Some(95.0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule_id, "cpu-high");
        assert_eq!(monitor.history().len(), 1);
        assert_eq!(monitor.events(10).len(), 1);
    }

    #[tokio::test]
    async fn failed_sampler_leaves_thermal_absent_and_error_recorded() {
        let monitor = stub_monitor(10.0);
        let (snapshot, events) = monitor.tick().await;
        assert!(snapshot.cpu.is_some());
        assert!(snapshot.thermal.is_none());
        assert!(events.is_empty());
        let errors = monitor.last_errors();
        assert!(errors[collector::POWERMETRICS].contains("sudo"));
        assert!(!errors.contains_key(collector::SYSTEM));
    }

    #[tokio::test]
    async fn history_is_bounded_and_ordered() {
        let monitor = stub_monitor(10.0);
        for _ in 0..5 {
            monitor.tick().await;
        }
        let history = monitor.history();
        assert_eq!(history.len(), 3);
        for pair in history.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let config = MonitorConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(Monitor::with_registry(&config, CollectorRegistry::new(Duration::from_secs(1))).is_err());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let monitor = std::sync::Arc::new(stub_monitor(10.0));
        let (tx, rx) = watch::channel(false);
        let handle = {
            let monitor = std::sync::Arc::clone(&monitor);
            tokio::spawn(async move { monitor.run(rx).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).expect("send shutdown");
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop stopped")
            .expect("task join");
        assert!(!monitor.history().is_empty());
    }
}
