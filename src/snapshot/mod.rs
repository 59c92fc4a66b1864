//! The unified, immutable view of one poll tick.
//!
//! A [`MetricsSnapshot`] is produced by [`merge`](crate::snapshot::merge) from
//! the per-collector results of a single tick. Every field group is optional:
//! a field is present only when its owning collector succeeded that tick, so
//! consumers can distinguish "unavailable" from zero.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub mod merge;
pub mod types;

pub use merge::{merge, SensorPrecedence};
pub use types::{
    BatterySample, CpuSample, DiskIoSample, DiskMount, DiskUsageSample, InterfaceSample,
    LoadAverage, MemorySample, NetworkSample, ProcessSample, SwapSample, SystemInfo,
    ThermalPressure, ThermalSample,
};

/// One timestamped bundle of merged telemetry.
///
/// Immutable after construction; owned by whichever component holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: SystemTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<SwapSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_root: Option<DiskUsageSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_mounts: Option<Vec<DiskMount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_io: Option<DiskIoSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatterySample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_sec: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_average: Option<LoadAverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_info: Option<SystemInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessSample>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermal: Option<ThermalSample>,
}

impl MetricsSnapshot {
    /// An empty snapshot carrying only a timestamp.
    pub fn empty(timestamp: SystemTime) -> Self {
        Self {
            timestamp,
            cpu: None,
            memory: None,
            swap: None,
            disk_root: None,
            disk_mounts: None,
            disk_io: None,
            battery: None,
            uptime_sec: None,
            load_average: None,
            system_info: None,
            processes: None,
            network: None,
            thermal: None,
        }
    }

    /// Seconds since the Unix epoch, for export and logging.
    pub fn unix_timestamp(&self) -> f64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Resolve a dotted metric path to a numeric value.
    ///
    /// Returns `None` when the path's field group is absent from this
    /// snapshot (its collector failed that tick) or the path names a sensor
    /// key that was not reported. `thermal_pressure` resolves to its numeric
    /// severity level so threshold rules can compare against it.
    pub fn metric(&self, path: &str) -> Option<f64> {
        match path {
            "cpu_percent" => self.cpu.as_ref().map(|c| c.percent),
            "cpu_count" => self.cpu.as_ref().map(|c| c.count as f64),
            "memory_percent" => self.memory.as_ref().map(|m| m.percent),
            "memory_total_bytes" => self.memory.as_ref().map(|m| m.total_bytes as f64),
            "memory_used_bytes" => self.memory.as_ref().map(|m| m.used_bytes as f64),
            "memory_available_bytes" => self.memory.as_ref().map(|m| m.available_bytes as f64),
            "swap_percent" => self.swap.as_ref().map(|s| s.percent),
            "swap_total_bytes" => self.swap.as_ref().map(|s| s.total_bytes as f64),
            "swap_used_bytes" => self.swap.as_ref().map(|s| s.used_bytes as f64),
            "disk_percent" => self.disk_root.as_ref().map(|d| d.percent),
            "disk_total_bytes" => self.disk_root.as_ref().map(|d| d.total_bytes as f64),
            "disk_used_bytes" => self.disk_root.as_ref().map(|d| d.used_bytes as f64),
            "disk_available_bytes" => self.disk_root.as_ref().map(|d| d.available_bytes as f64),
            "disk_read_bytes" => self.disk_io.as_ref().map(|io| io.read_bytes as f64),
            "disk_write_bytes" => self.disk_io.as_ref().map(|io| io.written_bytes as f64),
            "battery_percent" => self.battery.as_ref().map(|b| b.percent),
            "battery_health_percent" => self.battery.as_ref().and_then(|b| b.health_percent),
            "uptime_sec" => self.uptime_sec.map(|u| u as f64),
            "load_1" => self.load_average.map(|l| l.one),
            "load_5" => self.load_average.map(|l| l.five),
            "load_15" => self.load_average.map(|l| l.fifteen),
            "process_count" => self.processes.as_ref().map(|p| p.len() as f64),
            "thermal_pressure" => self
                .thermal
                .as_ref()
                .and_then(|t| t.pressure)
                .map(|p| f64::from(p.level())),
            "network.bytes_sent" => self.network.as_ref().map(|n| n.bytes_sent as f64),
            "network.bytes_recv" => self.network.as_ref().map(|n| n.bytes_recv as f64),
            "network.packets_sent" => self.network.as_ref().map(|n| n.packets_sent as f64),
            "network.packets_recv" => self.network.as_ref().map(|n| n.packets_recv as f64),
            "network.errors_in" => self.network.as_ref().map(|n| n.errors_in as f64),
            "network.errors_out" => self.network.as_ref().map(|n| n.errors_out as f64),
            _ => {
                if let Some(sensor) = path.strip_prefix("temperatures.") {
                    self.thermal
                        .as_ref()
                        .and_then(|t| t.temperatures.get(sensor).copied())
                } else if let Some(fan) = path.strip_prefix("fans.") {
                    self.thermal
                        .as_ref()
                        .and_then(|t| t.fans.get(fan).map(|rpm| f64::from(*rpm)))
                } else if let Some(subsystem) = path.strip_prefix("power.") {
                    self.thermal
                        .as_ref()
                        .and_then(|t| t.power_watts.get(subsystem).copied())
                } else {
                    None
                }
            }
        }
    }

    /// Flatten every numeric metric into a name -> value map for the text
    /// exposition surface. Absent field groups contribute no entries.
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        out.insert("timestamp".to_string(), self.unix_timestamp());
        for path in STATIC_METRIC_PATHS {
            if let Some(value) = self.metric(path) {
                out.insert((*path).to_string(), value);
            }
        }
        if let Some(cpu) = &self.cpu {
            for (i, usage) in cpu.per_core.iter().enumerate() {
                out.insert(format!("per_cpu.{i}"), *usage);
            }
        }
        if let Some(thermal) = &self.thermal {
            for (name, celsius) in &thermal.temperatures {
                out.insert(format!("temperatures.{name}"), *celsius);
            }
            for (name, rpm) in &thermal.fans {
                out.insert(format!("fans.{name}"), f64::from(*rpm));
            }
            for (name, watts) in &thermal.power_watts {
                out.insert(format!("power.{name}"), *watts);
            }
        }
        out
    }

    /// JSON value for the export surface.
    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Fixed metric paths resolvable by [`MetricsSnapshot::metric`].
pub const STATIC_METRIC_PATHS: &[&str] = &[
    "cpu_percent",
    "cpu_count",
    "memory_percent",
    "memory_total_bytes",
    "memory_used_bytes",
    "memory_available_bytes",
    "swap_percent",
    "swap_total_bytes",
    "swap_used_bytes",
    "disk_percent",
    "disk_total_bytes",
    "disk_used_bytes",
    "disk_available_bytes",
    "disk_read_bytes",
    "disk_write_bytes",
    "battery_percent",
    "battery_health_percent",
    "uptime_sec",
    "load_1",
    "load_5",
    "load_15",
    "process_count",
    "thermal_pressure",
    "network.bytes_sent",
    "network.bytes_recv",
    "network.packets_sent",
    "network.packets_recv",
    "network.errors_in",
    "network.errors_out",
];

/// Whether an alert rule's metric path can ever resolve against a snapshot.
///
/// Dynamic sensor keys (`temperatures.*`, `fans.*`, `power.*`) are accepted by
/// prefix since the key set depends on the host hardware.
pub fn is_known_metric(path: &str) -> bool {
    STATIC_METRIC_PATHS.contains(&path)
        || path
            .strip_prefix("temperatures.")
            .is_some_and(|rest| !rest.is_empty())
        || path.strip_prefix("fans.").is_some_and(|rest| !rest.is_empty())
        || path.strip_prefix("power.").is_some_and(|rest| !rest.is_empty())
}
