//! Folding per-collector results into one snapshot.
//!
//! `merge` is a pure function of its inputs: the same result set and
//! timestamp always produce the same snapshot, regardless of the order the
//! collectors finished in. Field ownership is fixed and non-overlapping
//! except for temperatures and fans, where the privileged sampler and the
//! sensor-tool fallback are combined per key.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::collector::{self, CollectorResult, SampleData};
use crate::snapshot::types::ThermalSample;
use crate::snapshot::MetricsSnapshot;

/// Which source wins when the privileged sampler and the sensor tools both
/// report the same temperature or fan key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorPrecedence {
    /// Prefer the privileged sampler, fill gaps from the sensor tools.
    #[default]
    SamplerPreferred,
    /// Prefer the sensor tools, fill gaps from the sampler.
    SensorPreferred,
}

/// Merge one tick's collector results into a snapshot.
///
/// A collector that failed (or omitted a field) contributes nothing; the
/// corresponding snapshot fields stay absent rather than defaulting to zero.
pub fn merge(
    results: &HashMap<&'static str, CollectorResult>,
    timestamp: SystemTime,
    precedence: SensorPrecedence,
) -> MetricsSnapshot {
    let data_of = |name: &'static str| -> Option<&SampleData> {
        results.get(name).filter(|r| r.success).map(|r| &r.data)
    };

    let system = data_of(collector::SYSTEM);
    let network = data_of(collector::NETWORK);
    let process = data_of(collector::PROCESS);
    let sampler = data_of(collector::POWERMETRICS);
    let sensors = data_of(collector::SENSORS);

    let mut snapshot = MetricsSnapshot::empty(timestamp);
    if let Some(sys) = system {
        snapshot.cpu = sys.cpu.clone();
        snapshot.memory = sys.memory.clone();
        snapshot.swap = sys.swap.clone();
        snapshot.disk_root = sys.disk_root.clone();
        snapshot.disk_mounts = sys.disk_mounts.clone();
        snapshot.disk_io = sys.disk_io.clone();
        snapshot.battery = sys.battery.clone();
        snapshot.uptime_sec = sys.uptime_sec;
        snapshot.load_average = sys.load_average;
        snapshot.system_info = sys.system_info.clone();
    }
    snapshot.network = network.and_then(|n| n.network.clone());
    snapshot.processes = process.and_then(|p| p.processes.clone());
    snapshot.thermal = merge_thermal(
        sampler.and_then(|s| s.thermal.as_ref()),
        sensors.and_then(|s| s.thermal.as_ref()),
        precedence,
    );
    snapshot
}

/// Per-key union of the two thermal sources. Keys present in both go to the
/// preferred source; pressure and power only ever come from the sampler, so
/// the union is a no-op for them in practice.
fn merge_thermal(
    sampler: Option<&ThermalSample>,
    sensors: Option<&ThermalSample>,
    precedence: SensorPrecedence,
) -> Option<ThermalSample> {
    let (preferred, fallback) = match precedence {
        SensorPrecedence::SamplerPreferred => (sampler, sensors),
        SensorPrecedence::SensorPreferred => (sensors, sampler),
    };
    match (preferred, fallback) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(preferred), Some(fallback)) => {
            let mut merged = preferred.clone();
            for (name, celsius) in &fallback.temperatures {
                merged.temperatures.entry(name.clone()).or_insert(*celsius);
            }
            for (name, rpm) in &fallback.fans {
                merged.fans.entry(name.clone()).or_insert(*rpm);
            }
            for (name, watts) in &fallback.power_watts {
                merged.power_watts.entry(name.clone()).or_insert(*watts);
            }
            if merged.pressure.is_none() {
                merged.pressure = fallback.pressure;
            }
            Some(merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;
    use crate::collector::{CollectorResult, SampleData};
    use crate::snapshot::types::{CpuSample, MemorySample, ThermalPressure};

    fn system_result() -> CollectorResult {
        CollectorResult::ok(SampleData {
            cpu: Some(CpuSample {
                percent: 35.0,
                count: 10,
                per_core: vec![30.0, 40.0],
            }),
            memory: Some(MemorySample {
                total_bytes: 16 << 30,
                used_bytes: 8 << 30,
                available_bytes: 8 << 30,
                percent: 50.0,
            }),
            uptime_sec: Some(3600),
            ..Default::default()
        })
    }

    fn sampler_result() -> CollectorResult {
        let mut thermal = ThermalSample {
            pressure: Some(ThermalPressure::Nominal),
            ..Default::default()
        };
        thermal.temperatures.insert("CPU_die".into(), 58.0);
        thermal.fans.insert("fan_0".into(), 1800);
        thermal.power_watts.insert("Combined".into(), 6.5);
        CollectorResult::ok(SampleData {
            thermal: Some(thermal),
            ..Default::default()
        })
    }

    fn sensors_result() -> CollectorResult {
        let mut thermal = ThermalSample::default();
        thermal.temperatures.insert("CPU_die".into(), 61.5);
        thermal.temperatures.insert("Battery".into(), 33.0);
        thermal.fans.insert("fan_1".into(), 2100);
        CollectorResult::ok(SampleData {
            thermal: Some(thermal),
            ..Default::default()
        })
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn merge_is_deterministic() {
        let mut results = HashMap::new();
        results.insert(collector::SYSTEM, system_result());
        results.insert(collector::POWERMETRICS, sampler_result());
        results.insert(collector::SENSORS, sensors_result());

        let a = merge(&results, at(100), SensorPrecedence::SamplerPreferred);
        let b = merge(&results, at(100), SensorPrecedence::SamplerPreferred);
        assert_eq!(a, b);
    }

    #[test]
    fn failed_collector_leaves_fields_absent() {
        let mut results = HashMap::new();
        results.insert(collector::SYSTEM, system_result());
        results.insert(
            collector::POWERMETRICS,
            CollectorResult::failed("powermetrics requires sudo"),
        );

        let snap = merge(&results, at(100), SensorPrecedence::SamplerPreferred);
        assert!(snap.cpu.is_some());
        assert!(snap.thermal.is_none());
        assert_eq!(snap.metric("thermal_pressure"), None);
    }

    #[test]
    fn missing_collector_leaves_fields_absent() {
        let results = HashMap::new();
        let snap = merge(&results, at(5), SensorPrecedence::SamplerPreferred);
        assert!(snap.cpu.is_none());
        assert!(snap.network.is_none());
        assert_eq!(snap.timestamp, at(5));
    }

    #[test]
    fn sampler_wins_shared_keys_and_sensors_fill_gaps() {
        let mut results = HashMap::new();
        results.insert(collector::POWERMETRICS, sampler_result());
        results.insert(collector::SENSORS, sensors_result());

        let snap = merge(&results, at(100), SensorPrecedence::SamplerPreferred);
        let thermal = snap.thermal.unwrap();
        // Shared key keeps the sampler reading.
        assert_eq!(thermal.temperatures["CPU_die"], 58.0);
        // Sensor-only keys are merged in.
        assert_eq!(thermal.temperatures["Battery"], 33.0);
        assert_eq!(thermal.fans["fan_0"], 1800);
        assert_eq!(thermal.fans["fan_1"], 2100);
        assert_eq!(thermal.pressure, Some(ThermalPressure::Nominal));
    }

    #[test]
    fn sensor_precedence_flips_shared_keys() {
        let mut results = HashMap::new();
        results.insert(collector::POWERMETRICS, sampler_result());
        results.insert(collector::SENSORS, sensors_result());

        let snap = merge(&results, at(100), SensorPrecedence::SensorPreferred);
        let thermal = snap.thermal.unwrap();
        assert_eq!(thermal.temperatures["CPU_die"], 61.5);
        // Pressure still comes from the sampler: the sensors never report it.
        assert_eq!(thermal.pressure, Some(ThermalPressure::Nominal));
    }

    #[test]
    fn sensors_alone_supply_thermal() {
        let mut results = HashMap::new();
        results.insert(
            collector::POWERMETRICS,
            CollectorResult::failed("no output"),
        );
        results.insert(collector::SENSORS, sensors_result());

        let snap = merge(&results, at(100), SensorPrecedence::SamplerPreferred);
        let thermal = snap.thermal.unwrap();
        assert_eq!(thermal.temperatures["CPU_die"], 61.5);
        assert_eq!(thermal.pressure, None);
    }
}
