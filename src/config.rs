//! Validated runtime configuration.
//!
//! The crate performs no file or environment parsing: an external loader
//! deserializes whatever source it likes into [`MonitorConfig`] and calls
//! [`validate`](MonitorConfig::validate) before handing it to
//! [`Monitor`](crate::monitor::Monitor). Validation failures are fatal and
//! surface at startup, never mid-run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alert::AlertRule;
use crate::error::{Error, Result};
use crate::snapshot::{is_known_metric, SensorPrecedence};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between poll ticks.
    pub poll_interval_sec: f64,
    /// Snapshots retained by the history buffer.
    pub history_capacity: usize,
    /// Seconds a privileged-sampler result stays fresh.
    pub sampler_cache_ttl_sec: f64,
    /// Bound on one `powermetrics` run.
    pub sampler_timeout_sec: f64,
    /// Bound on one sensor-tool run.
    pub sensor_timeout_sec: f64,
    /// Registry-level bound on any single collector invocation.
    pub collector_timeout_sec: f64,
    /// Rows kept in the process table.
    pub process_top_n: usize,
    /// Mounted volumes reported per tick.
    pub disk_mounts_max: usize,
    /// Include the per-interface network breakdown.
    pub network_per_interface: bool,
    /// Include static host information in each snapshot.
    pub include_system_info: bool,
    /// Winner for temperature/fan keys both thermal sources report.
    pub sensor_precedence: SensorPrecedence,
    pub rules: Vec<AlertRule>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_sec: 3.0,
            history_capacity: 300,
            sampler_cache_ttl_sec: 2.0,
            sampler_timeout_sec: 8.0,
            sensor_timeout_sec: 3.0,
            collector_timeout_sec: 10.0,
            process_top_n: 20,
            disk_mounts_max: 20,
            network_per_interface: true,
            include_system_info: true,
            sensor_precedence: SensorPrecedence::default(),
            rules: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_sec)
    }

    pub fn sampler_cache_ttl(&self) -> Duration {
        Duration::from_secs_f64(self.sampler_cache_ttl_sec)
    }

    pub fn sampler_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.sampler_timeout_sec)
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.sensor_timeout_sec)
    }

    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.collector_timeout_sec)
    }

    /// Reject configurations the pipeline must never run with.
    ///
    /// Rules referencing a metric path no snapshot can resolve are caught
    /// here; the engine does not re-validate per tick.
    pub fn validate(&self) -> Result<()> {
        if !self.poll_interval_sec.is_finite() || self.poll_interval_sec <= 0.0 {
            return Err(Error::configuration(format!(
                "poll_interval_sec must be positive, got {}",
                self.poll_interval_sec
            )));
        }
        for (field, value) in [
            ("sampler_cache_ttl_sec", self.sampler_cache_ttl_sec),
            ("sampler_timeout_sec", self.sampler_timeout_sec),
            ("sensor_timeout_sec", self.sensor_timeout_sec),
            ("collector_timeout_sec", self.collector_timeout_sec),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::configuration(format!(
                    "{field} must be positive, got {value}"
                )));
            }
        }
        if self.history_capacity == 0 {
            return Err(Error::configuration("history_capacity must be at least 1"));
        }
        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if rule.id.is_empty() {
                return Err(Error::configuration("alert rule with empty id"));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(Error::configuration(format!(
                    "duplicate alert rule id: {}",
                    rule.id
                )));
            }
            if !is_known_metric(&rule.metric) {
                return Err(Error::configuration(format!(
                    "rule {} references unknown metric path: {}",
                    rule.id, rule.metric
                )));
            }
            if !rule.threshold.is_finite() {
                return Err(Error::configuration(format!(
                    "rule {} has non-finite threshold",
                    rule.id
                )));
            }
            if !rule.cooldown_sec.is_finite() || rule.cooldown_sec < 0.0 {
                return Err(Error::configuration(format!(
                    "rule {} has invalid cooldown_sec: {}",
                    rule.id, rule.cooldown_sec
                )));
            }
        }
        Ok(())
    }
}
