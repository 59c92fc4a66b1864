//! Pluggable telemetry collectors.
//!
//! Every source of telemetry implements [`Collector`]: the primary-system
//! sampler, the privileged `powermetrics` sampler, the sensor-tool fallback,
//! the network counters and the process table. A collector that fails only
//! withholds its own fields for that tick; it can never abort the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::snapshot::types::{
    BatterySample, CpuSample, DiskIoSample, DiskMount, DiskUsageSample, LoadAverage,
    MemorySample, NetworkSample, ProcessSample, SwapSample, SystemInfo, ThermalSample,
};

pub mod network;
pub mod powermetrics;
pub mod process;
pub mod registry;
pub mod sensors;
pub mod system;

pub use network::NetworkCollector;
pub use powermetrics::PowermetricsCollector;
pub use process::ProcessCollector;
pub use registry::CollectorRegistry;
pub use sensors::SensorToolsCollector;
pub use system::SystemCollector;

/// Registry names of the built-in collectors. The merger uses these to look
/// up each field group's owning collector.
pub const SYSTEM: &str = "system";
pub const POWERMETRICS: &str = "powermetrics";
pub const SENSORS: &str = "sensors";
pub const NETWORK: &str = "network";
pub const PROCESS: &str = "process";

/// The fields a single collector can contribute to a snapshot.
///
/// Everything is optional: each collector fills in only the groups it owns,
/// and a group stays `None` when the host simply has no such reading (no
/// battery, no fans). Absence is meaningful and never defaulted to zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleData {
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

/// Envelope returned by every collector invocation.
///
/// Created fresh per invocation and immutable afterwards; a failing
/// collector's previous data is never carried forward. The `error` string is
/// retained so the presentation layer can surface it as a diagnostic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectorResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data: SampleData,
}

impl CollectorResult {
    pub fn ok(data: SampleData) -> Self {
        Self {
            success: true,
            error: None,
            data,
        }
    }

    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: SampleData::default(),
        }
    }
}

/// A unit that gathers one category of telemetry.
///
/// `collect` may fail with any [`Error`](crate::Error); `collect_safe` is the
/// boundary the registry calls, converting every failure into a failed
/// [`CollectorResult`] so that no error escapes a collector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Collector: Send + Sync {
    /// Registry name, also used by the merger for field ownership.
    fn name(&self) -> &'static str;

    async fn collect(&self) -> crate::error::Result<SampleData>;

    async fn collect_safe(&self) -> CollectorResult {
        match self.collect().await {
            Ok(data) => CollectorResult::ok(data),
            Err(err) => {
                tracing::debug!(collector = self.name(), error = %err, "collector failed");
                CollectorResult::failed(err.to_string())
            }
        }
    }
}
