use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CPU utilization for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSample {
    /// Aggregate usage across all cores (0-100).
    pub percent: f64,
    /// Number of logical cores.
    pub count: usize,
    /// Per-core usage (0-100), indexed by logical core.
    pub per_core: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapSample {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub percent: f64,
}

/// Usage of a single filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsageSample {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub percent: f64,
}

/// One mounted volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMount {
    pub mount_point: String,
    pub device: String,
    pub fs_type: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub percent: f64,
}

/// Cumulative disk I/O counters across all disks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskIoSample {
    pub read_bytes: u64,
    pub written_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySample {
    /// Charge level (0-100).
    pub percent: f64,
    /// True when connected to external power.
    pub plugged: bool,
    /// Charging / discharging / full, as reported by the power source.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_empty_sec: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_full_sec: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<u32>,
    /// Current full-charge capacity relative to design capacity (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
}

/// Load average over 1, 5 and 15 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Static host information, collected once per tick but effectively constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub arch: String,
    pub cpu_model: String,
    pub physical_cores: usize,
    pub logical_cores: usize,
    pub total_memory_bytes: u64,
}

/// One row of the top-N process table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub memory_percent: f64,
    pub status: String,
    pub start_time_sec: u64,
}

/// System-wide network counters plus optional per-interface breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<InterfaceSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSample {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub mac_address: String,
}

/// Thermal pressure level reported by the OS scheduler (Apple Silicon).
///
/// Ordered from least to most severe so it can be compared against a
/// numeric alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThermalPressure {
    Nominal,
    Moderate,
    Serious,
    Heavy,
    Critical,
}

impl ThermalPressure {
    /// Numeric severity, 0 (Nominal) through 4 (Critical).
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn is_critical(self) -> bool {
        self >= ThermalPressure::Heavy
    }
}

impl fmt::Display for ThermalPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThermalPressure::Nominal => "Nominal",
            ThermalPressure::Moderate => "Moderate",
            ThermalPressure::Serious => "Serious",
            ThermalPressure::Heavy => "Heavy",
            ThermalPressure::Critical => "Critical",
        };
        f.write_str(name)
    }
}

impl FromStr for ThermalPressure {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nominal" => Ok(ThermalPressure::Nominal),
            "moderate" => Ok(ThermalPressure::Moderate),
            "serious" => Ok(ThermalPressure::Serious),
            "heavy" => Ok(ThermalPressure::Heavy),
            "critical" => Ok(ThermalPressure::Critical),
            _ => Err(()),
        }
    }
}

/// Thermal and power telemetry from the privileged sampler, with the
/// sensor-tool fallback contributing temperature/fan keys it is missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermalSample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<ThermalPressure>,
    /// Sensor name -> degrees Celsius.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub temperatures: BTreeMap<String, f64>,
    /// Fan name -> RPM.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fans: BTreeMap<String, u32>,
    /// Subsystem name -> Watts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub power_watts: BTreeMap<String, f64>,
}

impl ThermalSample {
    /// True when at least one field carries a reading.
    pub fn has_data(&self) -> bool {
        self.pressure.is_some()
            || !self.temperatures.is_empty()
            || !self.fans.is_empty()
            || !self.power_watts.is_empty()
    }
}
