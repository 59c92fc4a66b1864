//! End-to-end pipeline scenarios with stub collectors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use darwin_monitor::alert::{AlertEngine, AlertRule, AlertSeverity, Operator};
use darwin_monitor::cache::SamplerCache;
use darwin_monitor::collector::{
    self, Collector, CollectorRegistry, CollectorResult, SampleData,
};
use darwin_monitor::snapshot::types::{CpuSample, MemorySample, ThermalSample};
use darwin_monitor::snapshot::MetricsSnapshot;
use darwin_monitor::{Error, Monitor, MonitorConfig};

struct StubCollector {
    name: &'static str,
    data: SampleData,
    fail_with: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StubCollector {
    fn ok(name: &'static str, data: SampleData) -> Self {
        Self {
            name,
            data,
            fail_with: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(name: &'static str, error: &str) -> Self {
        Self {
            name,
            data: SampleData::default(),
            fail_with: Some(error.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Collector for StubCollector {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn collect(&self) -> darwin_monitor::Result<SampleData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(error) => Err(Error::Collector(error.clone())),
            None => Ok(self.data.clone()),
        }
    }
}

fn system_data(cpu_percent: f64) -> SampleData {
    SampleData {
        cpu: Some(CpuSample {
            percent: cpu_percent,
            count: 8,
            per_core: vec![cpu_percent; 8],
        }),
        memory: Some(MemorySample {
            total_bytes: 16 << 30,
            used_bytes: 8 << 30,
            available_bytes: 8 << 30,
            percent: 50.0,
        }),
        uptime_sec: Some(12_345),
        ..Default::default()
    }
}

fn cpu_rule(threshold: f64, cooldown_sec: f64) -> AlertRule {
    AlertRule {
        id: "cpu-high".to_string(),
        name: "CPU high".to_string(),
        metric: "cpu_percent".to_string(),
        operator: Operator::Gt,
        threshold,
        severity: AlertSeverity::Critical,
        enabled: true,
        cooldown_sec,
    }
}

/// Scenario 1: the primary-system collector succeeds while the privileged
/// sampler fails (no sudo). Core fields are populated, thermal fields are
/// absent, and the tick completes without error.
#[tokio::test]
async fn system_succeeds_while_sampler_fails() {
    let config = MonitorConfig {
        history_capacity: 10,
        ..Default::default()
    };
    let mut registry = CollectorRegistry::new(config.collector_timeout());
    registry.register(Box::new(StubCollector::ok(collector::SYSTEM, system_data(35.0))));
    registry.register(Box::new(StubCollector::failing(
        collector::POWERMETRICS,
        "powermetrics requires sudo",
    )));
    let monitor = Monitor::with_registry(&config, registry).unwrap();

    let (snapshot, events) = monitor.tick().await;
    assert_eq!(snapshot.metric("cpu_percent"), Some(35.0));
    assert_eq!(snapshot.metric("memory_percent"), Some(50.0));
    assert!(snapshot.thermal.is_none());
    assert_eq!(snapshot.metric("thermal_pressure"), None);
    assert!(events.is_empty());
    assert!(monitor.last_errors()[collector::POWERMETRICS].contains("sudo"));
}

/// Scenario 2: rule `cpu_percent > 90` with a 60 s cooldown, breaches at
/// t=0,10,20,70. Events fire at t=0 and t=70 only.
#[test]
fn sustained_breach_fires_once_per_cooldown_window() {
    let mut engine = AlertEngine::with_rules(vec![cpu_rule(90.0, 60.0)]);
    let mut fired = Vec::new();
    for t in [0u64, 10, 20, 70] {
        let mut snap = MetricsSnapshot::empty(UNIX_EPOCH + Duration::from_secs(t));
        snap.cpu = Some(CpuSample {
            percent: 95.0,
            count: 8,
            per_core: Vec::new(),
        });
        fired.extend(engine.evaluate(&snap));
    }
    let stamps: Vec<_> = fired.iter().map(|e| e.timestamp).collect();
    assert_eq!(
        stamps,
        vec![UNIX_EPOCH, UNIX_EPOCH + Duration::from_secs(70)]
    );
}

/// Scenario 3: a capacity-3 history holds exactly the last three snapshots
/// in insertion order after four ticks.
#[tokio::test]
async fn history_keeps_the_last_three_ticks() {
    let config = MonitorConfig {
        history_capacity: 3,
        ..Default::default()
    };
    let mut registry = CollectorRegistry::new(config.collector_timeout());
    registry.register(Box::new(StubCollector::ok(collector::SYSTEM, system_data(10.0))));
    let monitor = Monitor::with_registry(&config, registry).unwrap();

    for _ in 0..4 {
        monitor.tick().await;
    }
    let history = monitor.history();
    assert_eq!(history.len(), 3);
    for pair in history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    assert_eq!(monitor.latest().unwrap().timestamp, history[2].timestamp);
}

/// Scenario 4: with a TTL wider than the first gap and narrower than the
/// second, three cache reads invoke the wrapped sampler exactly twice.
#[tokio::test]
async fn sampler_cache_refreshes_only_after_ttl() {
    let mut thermal = ThermalSample::default();
    thermal.temperatures.insert("CPU".to_string(), 55.0);
    let stub = StubCollector::ok(
        collector::POWERMETRICS,
        SampleData {
            thermal: Some(thermal),
            ..Default::default()
        },
    );
    let calls = Arc::clone(&stub.calls);
    let cache = SamplerCache::new(Box::new(stub), Duration::from_millis(500));

    let first = cache.get().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = cache.get().await;
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let third = cache.get().await;
    assert!(third.success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// The cached sampler slots into a registry like any other collector, and
/// repeated ticks within the TTL reuse its result.
#[tokio::test]
async fn cached_sampler_is_shared_across_ticks() {
    let mut thermal = ThermalSample::default();
    thermal.temperatures.insert("CPU_die".to_string(), 58.0);
    let stub = StubCollector::ok(
        collector::POWERMETRICS,
        SampleData {
            thermal: Some(thermal),
            ..Default::default()
        },
    );
    let calls = Arc::clone(&stub.calls);

    let config = MonitorConfig {
        history_capacity: 10,
        ..Default::default()
    };
    let mut registry = CollectorRegistry::new(config.collector_timeout());
    registry.register(Box::new(StubCollector::ok(collector::SYSTEM, system_data(20.0))));
    registry.register(Box::new(SamplerCache::new(
        Box::new(stub),
        Duration::from_secs(60),
    )));
    let monitor = Monitor::with_registry(&config, registry).unwrap();

    for _ in 0..3 {
        let (snapshot, _) = monitor.tick().await;
        assert_eq!(snapshot.metric("temperatures.CPU_die"), Some(58.0));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Sensor tools backfill temperature keys the sampler is missing, while the
/// sampler keeps precedence on shared keys.
#[tokio::test]
async fn sensor_fallback_backfills_missing_keys() {
    let mut sampler_thermal = ThermalSample::default();
    sampler_thermal
        .temperatures
        .insert("CPU_die".to_string(), 58.0);
    let mut sensor_thermal = ThermalSample::default();
    sensor_thermal
        .temperatures
        .insert("CPU_die".to_string(), 61.0);
    sensor_thermal.temperatures.insert("GPU".to_string(), 52.0);
    sensor_thermal.fans.insert("fan_0".to_string(), 2000);

    let config = MonitorConfig::default();
    let mut registry = CollectorRegistry::new(config.collector_timeout());
    registry.register(Box::new(StubCollector::ok(
        collector::POWERMETRICS,
        SampleData {
            thermal: Some(sampler_thermal),
            ..Default::default()
        },
    )));
    registry.register(Box::new(StubCollector::ok(
        collector::SENSORS,
        SampleData {
            thermal: Some(sensor_thermal),
            ..Default::default()
        },
    )));
    let monitor = Monitor::with_registry(&config, registry).unwrap();

    let (snapshot, _) = monitor.tick().await;
    assert_eq!(snapshot.metric("temperatures.CPU_die"), Some(58.0));
    assert_eq!(snapshot.metric("temperatures.GPU"), Some(52.0));
    assert_eq!(snapshot.metric("fans.fan_0"), Some(2000.0));
}

/// A rule whose metric never appears (its collector keeps failing) never
/// fires and never starts a cooldown.
#[tokio::test]
async fn absent_metric_never_fires() {
    let config = MonitorConfig {
        rules: vec![AlertRule {
            id: "thermal".to_string(),
            name: "Thermal pressure heavy".to_string(),
            metric: "thermal_pressure".to_string(),
            operator: Operator::Ge,
            threshold: 3.0,
            severity: AlertSeverity::Warning,
            enabled: true,
            cooldown_sec: 60.0,
        }],
        ..Default::default()
    };
    let mut registry = CollectorRegistry::new(config.collector_timeout());
    registry.register(Box::new(StubCollector::ok(collector::SYSTEM, system_data(99.0))));
    registry.register(Box::new(StubCollector::failing(
        collector::POWERMETRICS,
        "no output",
    )));
    let monitor = Monitor::with_registry(&config, registry).unwrap();

    for _ in 0..3 {
        let (_, events) = monitor.tick().await;
        assert!(events.is_empty());
    }
    assert!(monitor.events(10).is_empty());
}

/// Snapshots serialize for the export surface with absent groups omitted,
/// and collector results retain their envelope shape.
#[tokio::test]
async fn export_surface_omits_absent_fields() {
    let config = MonitorConfig::default();
    let mut registry = CollectorRegistry::new(config.collector_timeout());
    registry.register(Box::new(StubCollector::ok(collector::SYSTEM, system_data(42.0))));
    let monitor = Monitor::with_registry(&config, registry).unwrap();

    let (snapshot, _) = monitor.tick().await;
    let json = snapshot.to_json().unwrap();
    let obj = json.as_object().unwrap();
    assert!(obj.contains_key("cpu"));
    assert!(!obj.contains_key("thermal"));
    assert!(!obj.contains_key("network"));

    let flat = snapshot.flatten();
    assert_eq!(flat.get("cpu_percent"), Some(&42.0));
    assert!(!flat.contains_key("disk_percent"));

    let envelope = CollectorResult::failed("tool missing");
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "tool missing");
}
