//! Darwin Monitor - continuous macOS host telemetry with threshold alerting
//!
//! This crate samples host telemetry (CPU, memory, disk, network, thermal,
//! power, battery) from heterogeneous, partially-unreliable sources and
//! folds it into a consistent, time-ordered view suitable for display,
//! export and alerting.
//!
//! # Pipeline
//!
//! - **Collectors** gather one telemetry category each: the primary system
//!   sampler (`sysinfo` + `battery`), the privileged `powermetrics` sampler,
//!   the sensor-tool fallback (`istats` / `osx-cpu-temp`), network counters
//!   and the process table. A failing collector only withholds its own
//!   fields for that tick.
//! - **SamplerCache** memoizes the expensive privileged sampler with a short
//!   TTL so a fast dashboard refresh does not fork `powermetrics` every
//!   second.
//! - **merge** folds one tick's results into an immutable
//!   [`MetricsSnapshot`](snapshot::MetricsSnapshot) in which absent fields
//!   mean "unavailable", never zero.
//! - **HistoryBuffer** keeps the last N snapshots in insertion order.
//! - **AlertEngine** evaluates threshold rules with per-rule cooldown and
//!   emits [`AlertEvent`](alert::AlertEvent)s.
//! - **Monitor** drives the loop: one snapshot per tick, stop-clean
//!   shutdown.
//!
//! # Example
//!
//! ```rust,no_run
//! use darwin_monitor::{Monitor, MonitorConfig};
//! use darwin_monitor::alert::{AlertRule, AlertSeverity, Operator};
//!
//! #[tokio::main]
//! async fn main() -> darwin_monitor::Result<()> {
//!     let config = MonitorConfig {
//!         rules: vec![AlertRule {
//!             id: "cpu-high".into(),
//!             name: "CPU above 90%".into(),
//!             metric: "cpu_percent".into(),
//!             operator: Operator::Gt,
//!             threshold: 90.0,
//!             severity: AlertSeverity::Critical,
//!             enabled: true,
//!             cooldown_sec: 60.0,
//!         }],
//!         ..Default::default()
//!     };
//!     let monitor = Monitor::new(&config)?;
//!     let (snapshot, events) = monitor.tick().await;
//!     if let Some(percent) = snapshot.metric("cpu_percent") {
//!         println!("CPU: {percent:.1}%");
//!     }
//!     for event in events {
//!         eprintln!("[{}] {}", event.severity, event.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Collector failures never abort a tick: the registry converts them into
//! failed results and the snapshot simply omits the affected fields, keeping
//! the error string for diagnostics. Only configuration problems are fatal,
//! and those surface from [`MonitorConfig::validate`](config::MonitorConfig::validate)
//! before the loop starts.

pub mod alert;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod monitor;
pub mod persistence;
pub mod snapshot;

pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use monitor::Monitor;

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::alert::{AlertEngine, AlertEvent, AlertRule, AlertSeverity, Operator};
    pub use crate::cache::SamplerCache;
    pub use crate::collector::{Collector, CollectorRegistry, CollectorResult, SampleData};
    pub use crate::config::MonitorConfig;
    pub use crate::error::{Error, Result};
    pub use crate::history::HistoryBuffer;
    pub use crate::monitor::Monitor;
    pub use crate::persistence::HistoryLog;
    pub use crate::snapshot::{merge, MetricsSnapshot, SensorPrecedence};
}
