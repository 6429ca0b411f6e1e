use thiserror::Error;

use crate::client::InstanceStatus;

/// A batch request that was rejected before any scheduling started.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("totalOrchestrations must not be negative (got {0})")]
    NegativeTotal(i64),

    #[error("intervalSeconds must be a finite, non-negative number (got {0})")]
    InvalidInterval(f64),

    #[error("totalOrchestrations must be at most {max} (got {requested})")]
    TooManyInstances { requested: usize, max: usize },
}

/// Conditions that end a batch run early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    #[error("orchestration {instance_id} reported unexpected status {status}")]
    UnexpectedStatus {
        instance_id: String,
        status: InstanceStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("unsupported store url {0}; expected sqlite::memory: or postgres://")]
    UnsupportedStore(String),
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
