//! Privileged sampler collector.
//!
//! Runs the `powermetrics` utility once per (cached) invocation and parses
//! its text output. On Apple Silicon the thermal sampler reports the
//! scheduler pressure level and per-subsystem power draw; on Intel the `smc`
//! sampler reports die temperatures and fan speeds. The tool needs root for
//! most samplers, so failure is the common case and is reported as such
//! rather than papered over with empty data.

use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::collector::{Collector, SampleData, POWERMETRICS};
use crate::error::{Error, Result};
use crate::snapshot::types::{ThermalPressure, ThermalSample};

/// Sampler sets tried in order: Apple Silicon first, then Intel SMC.
const SAMPLER_SETS: &[&str] = &[
    "thermal,cpu_power,gpu_power,ane_power",
    "thermal,cpu_power,gpu_power",
    "smc",
];

static PRESSURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:current\s+)?pressure\s+level\s*:\s*(\w+)").unwrap()
});
// "CPU Power: 291 mW" (also matches plain W; the Watts pass below overwrites
// those entries with the unscaled value, mirroring the unit conventions of
// the two output dialects).
static POWER_MILLIWATT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w+)\s+Power\s*:\s*([\d.]+)\s*m?W").unwrap());
static POWER_COMBINED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Combined\s+Power[^\n]*?:\s*([\d.]+)\s*m?W").unwrap());
// "CPU power: 2.34 W"
static POWER_WATT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\w][\w ]*?)\s+power\s*:\s*([\d.]+)\s*W\b").unwrap());
// "CPU die temperature: 54.23 C"
static TEMP_NAMED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\w ]+(?:die|package|thermal)\s*temperature)\s*:\s*([\d.]+)\s*C").unwrap()
});
static TEMP_GENERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:Temperature|temp)[^\n]*?:\s*([\d.]+)\s*C").unwrap());
static FAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Fan\s*(\d*)\s*speed\s*:\s*(\d+)\s*rpm").unwrap());

pub struct PowermetricsCollector {
    timeout: Duration,
}

impl PowermetricsCollector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Try each sampler set until one produces output.
    async fn run(&self) -> Result<String> {
        for &samplers in SAMPLER_SETS {
            let child = Command::new("powermetrics")
                .args(["--samplers", samplers, "-i", "1000", "-n", "1"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn();
            let child = match child {
                Ok(child) => child,
                Err(err) => {
                    tracing::debug!(samplers, error = %err, "powermetrics spawn failed");
                    continue;
                }
            };
            match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
                Ok(Ok(output)) if output.status.success() => {
                    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                    if !stdout.trim().is_empty() {
                        return Ok(stdout);
                    }
                }
                Ok(Ok(output)) => {
                    tracing::debug!(samplers, status = %output.status, "powermetrics exited nonzero");
                }
                Ok(Err(err)) => {
                    tracing::debug!(samplers, error = %err, "powermetrics wait failed");
                }
                Err(_) => {
                    tracing::debug!(samplers, timeout = ?self.timeout, "powermetrics timed out");
                }
            }
        }
        Err(Error::not_available(
            "powermetrics produced no output (needs root?)",
        ))
    }
}

/// Parse `powermetrics` text into a thermal sample. Handles both the Apple
/// Silicon (pressure + power) and Intel SMC (temperature + fan) dialects.
pub(crate) fn parse_output(stdout: &str) -> ThermalSample {
    let mut sample = ThermalSample::default();

    for line in stdout.lines() {
        if sample.pressure.is_none() {
            if let Some(cap) = PRESSURE_RE.captures(line) {
                if let Ok(pressure) = ThermalPressure::from_str(&cap[1]) {
                    sample.pressure = Some(pressure);
                }
            }
        }
        for cap in POWER_MILLIWATT_RE.captures_iter(line) {
            if let Ok(milliwatts) = cap[2].parse::<f64>() {
                sample
                    .power_watts
                    .insert(cap[1].to_string(), milliwatts / 1000.0);
            }
        }
        if let Some(cap) = POWER_COMBINED_RE.captures(line) {
            if let Ok(milliwatts) = cap[1].parse::<f64>() {
                sample
                    .power_watts
                    .insert("Combined".to_string(), milliwatts / 1000.0);
            }
        }
        for cap in POWER_WATT_RE.captures_iter(line) {
            let name = cap[1].trim().replace(' ', "_");
            if name == "Combined" || name == "Total" {
                continue;
            }
            if let Ok(watts) = cap[2].parse::<f64>() {
                sample.power_watts.insert(name, watts);
            }
        }
        if let Some(cap) = TEMP_NAMED_RE.captures(line) {
            if let Ok(celsius) = cap[2].parse::<f64>() {
                sample
                    .temperatures
                    .insert(cap[1].trim().replace(' ', "_"), celsius);
            }
        } else if let Some(cap) = TEMP_GENERIC_RE.captures(line) {
            if let Ok(celsius) = cap[1].parse::<f64>() {
                let key = format!("temp_{}", sample.temperatures.len());
                sample.temperatures.insert(key, celsius);
            }
        }
        for cap in FAN_RE.captures_iter(line) {
            let label = if cap[1].is_empty() { "0" } else { &cap[1] };
            if let Ok(rpm) = cap[2].parse::<u32>() {
                sample.fans.insert(format!("fan_{label}"), rpm);
            }
        }
    }
    sample
}

#[async_trait]
impl Collector for PowermetricsCollector {
    fn name(&self) -> &'static str {
        POWERMETRICS
    }

    async fn collect(&self) -> Result<SampleData> {
        let stdout = self.run().await?;
        let sample = parse_output(&stdout);
        if !sample.has_data() {
            return Err(Error::parse("no thermal fields in powermetrics output"));
        }
        Ok(SampleData {
            thermal: Some(sample),
            ..Default::default()
        })
    }
}
