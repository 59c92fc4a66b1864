//! Threshold alerting with per-rule cooldown.
//!
//! The engine evaluates its rules, in configured order, against each
//! snapshot. A rule whose metric path is absent from the snapshot is skipped
//! outright: it neither fires nor touches its cooldown. Rules are validated
//! at load time ([`crate::config::MonitorConfig::validate`]); the engine
//! assumes they are well-formed.

use std::collections::{HashMap, VecDeque};

use crate::snapshot::MetricsSnapshot;

pub mod types;

pub use types::{AlertEvent, AlertRule, AlertSeverity, Operator};

const DEFAULT_MAX_EVENTS: usize = 500;

/// Evaluates alert rules and records fired events.
///
/// `last_fired` is the only mutable state and is updated exclusively by
/// [`evaluate`](AlertEngine::evaluate), and only when a rule actually fires.
#[derive(Debug)]
pub struct AlertEngine {
    rules: Vec<AlertRule>,
    last_fired: HashMap<String, std::time::SystemTime>,
    events: VecDeque<AlertEvent>,
    max_events: usize,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEngine {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            last_fired: HashMap::new(),
            events: VecDeque::new(),
            max_events: DEFAULT_MAX_EVENTS,
        }
    }

    pub fn with_rules(rules: Vec<AlertRule>) -> Self {
        let mut engine = Self::new();
        for rule in rules {
            engine.add_rule(rule);
        }
        engine
    }

    /// Add a rule; duplicate ids are ignored.
    pub fn add_rule(&mut self, rule: AlertRule) {
        if !self.rules.iter().any(|r| r.id == rule.id) {
            self.rules.push(rule);
        }
    }

    /// Remove a rule by id. Returns whether anything was removed.
    pub fn remove_rule(&mut self, rule_id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != rule_id);
        self.rules.len() < before
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Evaluate all enabled rules against a snapshot.
    ///
    /// Cooldown arithmetic uses the snapshot's own timestamp, so evaluation
    /// is a deterministic function of its input. Returns the events fired
    /// this round; the same events are appended to the bounded internal log.
    pub fn evaluate(&mut self, snapshot: &MetricsSnapshot) -> Vec<AlertEvent> {
        let now = snapshot.timestamp;
        let mut fired = Vec::new();
        for rule in &self.rules {
            if !rule.enabled {
                continue;
            }
            // Absent path: skipped, no cooldown started or extended.
            let Some(value) = snapshot.metric(&rule.metric) else {
                continue;
            };
            if !rule.operator.compare(value, rule.threshold) {
                continue;
            }
            if let Some(last) = self.last_fired.get(&rule.id) {
                let cooling = match now.duration_since(*last) {
                    Ok(elapsed) => elapsed < rule.cooldown(),
                    // Timestamp went backwards relative to the last firing;
                    // treat the rule as still cooling down.
                    Err(_) => true,
                };
                if cooling {
                    continue;
                }
            }
            self.last_fired.insert(rule.id.clone(), now);
            let event = AlertEvent {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                metric: rule.metric.clone(),
                value,
                threshold: rule.threshold,
                severity: rule.severity,
                message: format!(
                    "{}={} (threshold {} {})",
                    rule.metric, value, rule.operator, rule.threshold
                ),
                timestamp: now,
            };
            tracing::warn!(
                rule = %rule.id,
                metric = %rule.metric,
                value,
                threshold = rule.threshold,
                severity = %rule.severity,
                "alert fired"
            );
            self.events.push_back(event.clone());
            while self.events.len() > self.max_events {
                self.events.pop_front();
            }
            fired.push(event);
        }
        fired
    }

    /// The most recent events, newest first.
    pub fn events(&self, limit: usize) -> Vec<AlertEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    /// Drop recorded events and cooldown state.
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.last_fired.clear();
    }
}
