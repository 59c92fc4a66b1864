//! Sensor-tool fallback collector.
//!
//! When the privileged sampler cannot run, optional third-party CLIs can
//! still report temperatures and fan speeds: `istats` (Ruby gem) and
//! `osx-cpu-temp` (Homebrew, mostly Intel). Tools are auto-detected on PATH;
//! whichever responds first wins.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::collector::{Collector, SampleData, SENSORS};
use crate::error::{Error, Result};
use crate::snapshot::types::ThermalSample;

static CPU_TEMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:CPU\s+)?temp(?:erature)?\s*[:\s]\s*([\d.]+)\s*[°º]?\s*C").unwrap()
});
static FAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Fan\s*(\d*)\s*(?::|speed\s*[:\s])\s*([\d.]+)\s*rpm").unwrap()
});
static SENSOR_TEMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(GPU|Battery|Ambient|Enclosure|PCH|SSD)\s*_?(?:temp(?:erature)?)?\s*[:\s]\s*([\d.]+)\s*[°º]?\s*C",
    )
    .unwrap()
});
static BARE_TEMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d.]+)\s*[°º]?\s*C").unwrap());
static BARE_RPM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*rpm").unwrap());

pub struct SensorToolsCollector {
    timeout: Duration,
}

impl SensorToolsCollector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run_tool(&self, program: &str, args: &[&str]) -> Option<String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .ok()?;
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                // istats writes some sensors to stderr.
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                Some(text)
            }
            Ok(Ok(_)) | Ok(Err(_)) => None,
            Err(_) => {
                tracing::debug!(program, timeout = ?self.timeout, "sensor tool timed out");
                None
            }
        }
    }

    async fn collect_istats(&self) -> (BTreeMap<String, f64>, BTreeMap<String, u32>) {
        for args in [&["extra"][..], &[][..]] {
            if let Some(text) = self.run_tool("istats", args).await {
                let (temps, fans) = parse_istats(&text);
                if !temps.is_empty() || !fans.is_empty() {
                    return (temps, fans);
                }
            }
        }
        (BTreeMap::new(), BTreeMap::new())
    }

    async fn collect_osx_cpu_temp(&self) -> (BTreeMap<String, f64>, BTreeMap<String, u32>) {
        let mut temps = BTreeMap::new();
        let mut fans = BTreeMap::new();
        if let Some(text) = self.run_tool("osx-cpu-temp", &[]).await {
            if let Some(celsius) = parse_bare_temperature(&text) {
                temps.insert("CPU".to_string(), celsius);
            }
        }
        if let Some(text) = self.run_tool("osx-cpu-temp", &["-f"]).await {
            if let Some(rpm) = parse_bare_rpm(&text) {
                fans.insert("fan_0".to_string(), rpm);
            }
        }
        (temps, fans)
    }
}

/// Temperatures and fans from `istats` output (stdout + stderr combined).
pub(crate) fn parse_istats(text: &str) -> (BTreeMap<String, f64>, BTreeMap<String, u32>) {
    let mut temps = BTreeMap::new();
    let mut fans = BTreeMap::new();

    // First generic temperature line is taken as the CPU reading.
    if let Some(cap) = CPU_TEMP_RE.captures(text) {
        if let Ok(celsius) = cap[1].parse::<f64>() {
            temps.insert("CPU".to_string(), celsius);
        }
    }
    for cap in FAN_RE.captures_iter(text) {
        let label = if cap[1].is_empty() { "0" } else { &cap[1] };
        if let Ok(rpm) = cap[2].parse::<f64>() {
            fans.insert(format!("fan_{label}"), rpm as u32);
        }
    }
    for cap in SENSOR_TEMP_RE.captures_iter(text) {
        if let Ok(celsius) = cap[2].parse::<f64>() {
            temps.insert(cap[1].to_string(), celsius);
        }
    }
    (temps, fans)
}

pub(crate) fn parse_bare_temperature(text: &str) -> Option<f64> {
    BARE_TEMP_RE
        .captures(text)
        .and_then(|cap| cap[1].parse().ok())
}

pub(crate) fn parse_bare_rpm(text: &str) -> Option<u32> {
    BARE_RPM_RE
        .captures(text)
        .and_then(|cap| cap[1].parse().ok())
}

#[async_trait]
impl Collector for SensorToolsCollector {
    fn name(&self) -> &'static str {
        SENSORS
    }

    async fn collect(&self) -> Result<SampleData> {
        let has_istats = which::which("istats").is_ok();
        let has_osx_cpu_temp = which::which("osx-cpu-temp").is_ok();
        if !has_istats && !has_osx_cpu_temp {
            return Err(Error::not_available(
                "no sensor tool found (istats, osx-cpu-temp)",
            ));
        }

        let mut sample = ThermalSample::default();
        if has_istats {
            let (temps, fans) = self.collect_istats().await;
            sample.temperatures.extend(temps);
            sample.fans.extend(fans);
        }
        if sample.temperatures.is_empty() && sample.fans.is_empty() && has_osx_cpu_temp {
            let (temps, fans) = self.collect_osx_cpu_temp().await;
            sample.temperatures.extend(temps);
            sample.fans.extend(fans);
        }
        if !sample.has_data() {
            return Err(Error::parse("sensor tools produced no readings"));
        }
        Ok(SampleData {
            thermal: Some(sample),
            ..Default::default()
        })
    }
}
