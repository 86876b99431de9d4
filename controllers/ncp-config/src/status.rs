//! Degraded-condition bookkeeping per concern.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Which input a condition is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusLevel {
    OperatorConfig,
    ClusterConfig,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLevel::OperatorConfig => f.write_str("OperatorConfig"),
            StatusLevel::ClusterConfig => f.write_str("ClusterConfig"),
        }
    }
}

/// Records degraded / not-degraded state for each concern.
pub trait StatusReporter: Send + Sync {
    fn set_degraded(&self, level: StatusLevel, reason: &str, message: &str);
    fn set_not_degraded(&self, level: StatusLevel);
}

/// State of one concern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCondition {
    /// Whether the concern is degraded
    pub degraded: bool,
    /// Machine-readable cause, empty when healthy
    pub reason: String,
    /// Human-readable detail
    pub message: String,
    /// When `degraded` or `reason` last changed
    pub last_transition: DateTime<Utc>,
}

/// In-memory status reporter. Transition times only move when the degraded
/// flag or the reason changes.
#[derive(Debug, Default)]
pub struct StatusManager {
    conditions: Mutex<BTreeMap<StatusLevel, StatusCondition>>,
}

impl StatusManager {
    /// Manager with no recorded conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded condition for `level`.
    #[cfg(test)]
    pub fn condition(&self, level: StatusLevel) -> Option<StatusCondition> {
        self.conditions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&level)
            .cloned()
    }

    fn set(&self, level: StatusLevel, degraded: bool, reason: &str, message: &str) {
        let mut conditions = self.conditions.lock().unwrap_or_else(PoisonError::into_inner);
        let transitioned = conditions
            .get(&level)
            .is_none_or(|c| c.degraded != degraded || c.reason != reason);
        let last_transition = match conditions.get(&level) {
            Some(existing) if !transitioned => existing.last_transition,
            _ => Utc::now(),
        };

        if transitioned {
            if degraded {
                warn!(level = %level, reason = %reason, "Degraded: {}", message);
            } else {
                info!(level = %level, "No longer degraded");
            }
        }

        conditions.insert(
            level,
            StatusCondition {
                degraded,
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition,
            },
        );
    }
}

impl StatusReporter for StatusManager {
    fn set_degraded(&self, level: StatusLevel, reason: &str, message: &str) {
        self.set(level, true, reason, message);
    }

    fn set_not_degraded(&self, level: StatusLevel) {
        self.set(level, false, "", "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_then_cleared() {
        let status = StatusManager::new();
        assert!(status.condition(StatusLevel::OperatorConfig).is_none());

        status.set_degraded(StatusLevel::OperatorConfig, "NoOperatorConfig", "missing");
        let condition = status.condition(StatusLevel::OperatorConfig).unwrap();
        assert!(condition.degraded);
        assert_eq!(condition.reason, "NoOperatorConfig");
        assert!(status.condition(StatusLevel::ClusterConfig).is_none());

        status.set_not_degraded(StatusLevel::OperatorConfig);
        assert!(!status.condition(StatusLevel::OperatorConfig).unwrap().degraded);
    }

    #[test]
    fn test_same_reason_keeps_transition_time() {
        let status = StatusManager::new();
        status.set_degraded(StatusLevel::ClusterConfig, "NoClusterConfig", "first");
        let first = status.condition(StatusLevel::ClusterConfig).unwrap();

        status.set_degraded(StatusLevel::ClusterConfig, "NoClusterConfig", "second");
        let second = status.condition(StatusLevel::ClusterConfig).unwrap();
        assert_eq!(first.last_transition, second.last_transition);
        assert_eq!(second.message, "second");
    }
}
