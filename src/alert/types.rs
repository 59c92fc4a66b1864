use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Info => f.write_str("info"),
            AlertSeverity::Warning => f.write_str("warning"),
            AlertSeverity::Critical => f.write_str("critical"),
        }
    }
}

/// Threshold comparison, a closed set rather than an operator string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl Operator {
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Ge => value >= threshold,
            Operator::Lt => value < threshold,
            Operator::Le => value <= threshold,
            Operator::Eq => value == threshold,
            Operator::Ne => value != threshold,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        };
        f.write_str(symbol)
    }
}

/// A user-defined threshold rule, immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    /// Dotted metric path resolved via
    /// [`MetricsSnapshot::metric`](crate::snapshot::MetricsSnapshot::metric).
    pub metric: String,
    pub operator: Operator,
    pub threshold: f64,
    #[serde(default = "default_severity")]
    pub severity: AlertSeverity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Minimum seconds between consecutive firings of this rule.
    #[serde(default = "default_cooldown_sec")]
    pub cooldown_sec: f64,
}

fn default_severity() -> AlertSeverity {
    AlertSeverity::Warning
}

fn default_enabled() -> bool {
    true
}

fn default_cooldown_sec() -> f64 {
    60.0
}

impl AlertRule {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_sec.max(0.0))
    }
}

/// A single fired alert, append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule_id: String,
    pub rule_name: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_comparisons() {
        assert!(Operator::Gt.compare(91.0, 90.0));
        assert!(!Operator::Gt.compare(90.0, 90.0));
        assert!(Operator::Ge.compare(90.0, 90.0));
        assert!(Operator::Lt.compare(5.0, 10.0));
        assert!(Operator::Le.compare(10.0, 10.0));
        assert!(Operator::Eq.compare(3.0, 3.0));
        assert!(Operator::Ne.compare(3.0, 4.0));
    }

    #[test]
    fn operator_serde_symbols() {
        assert_eq!(serde_json::to_string(&Operator::Ge).unwrap(), "\">=\"");
        let op: Operator = serde_json::from_str("\"!=\"").unwrap();
        assert_eq!(op, Operator::Ne);
        assert!(serde_json::from_str::<Operator>("\"=>\"").is_err());
    }

    #[test]
    fn rule_defaults_from_json() {
        let rule: AlertRule = serde_json::from_str(
            r#"{"id":"cpu-high","name":"CPU high","metric":"cpu_percent","operator":">","threshold":90.0}"#,
        )
        .unwrap();
        assert_eq!(rule.severity, AlertSeverity::Warning);
        assert!(rule.enabled);
        assert_eq!(rule.cooldown(), Duration::from_secs(60));
    }
}
