//! Controller-specific error types.
//!
//! `ControllerError` covers startup and the watch layer. `ReconcileError`
//! is the outcome taxonomy of one reconciliation cycle; its variants decide
//! whether the watch layer requeues.

use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur while starting or running the controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Probe server I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the generator, defaulter and renderer.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Configuration or spec contents are unusable
    #[error("{0}")]
    Invalid(String),

    /// A required input is absent
    #[error("missing {0}")]
    Missing(String),

    /// Manifest could not be built
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a failed reconciliation cycle.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Operator ConfigMap or Network object is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading an input failed for a reason other than absence
    #[error("read failed: {0}")]
    ReadFailure(String),

    /// Defaulting or validation rejected the configuration
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// Baseline reconstruction from deployed fragments failed
    #[error("baseline reconstruction failed: {0}")]
    BaselineFailure(String),

    /// Manifest rendering failed
    #[error("render failed: {0}")]
    RenderFailure(String),

    /// Owner reference or apply failed
    #[error("apply failed: {0}")]
    ApplyFailure(String),

    /// Pod eviction failed for at least one workload
    #[error("disruption failed: {0}")]
    DisruptionFailure(String),

    /// Network status write failed
    #[error("status update failed: {0}")]
    StatusUpdateFailure(String),
}

impl ReconcileError {
    /// Whether the cycle should be retried.
    pub fn requeue(&self) -> bool {
        !matches!(
            self,
            ReconcileError::NotFound(_) | ReconcileError::ValidationFailure(_)
        )
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::NotFound(_) => "not_found",
            ReconcileError::ReadFailure(_) => "read_failure",
            ReconcileError::ValidationFailure(_) => "validation_failure",
            ReconcileError::BaselineFailure(_) => "baseline_failure",
            ReconcileError::RenderFailure(_) => "render_failure",
            ReconcileError::ApplyFailure(_) => "apply_failure",
            ReconcileError::DisruptionFailure(_) => "disruption_failure",
            ReconcileError::StatusUpdateFailure(_) => "status_update_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_decision() {
        assert!(!ReconcileError::NotFound("cm".into()).requeue());
        assert!(!ReconcileError::ValidationFailure("bad".into()).requeue());
        assert!(ReconcileError::ReadFailure("io".into()).requeue());
        assert!(ReconcileError::BaselineFailure("gen".into()).requeue());
        assert!(ReconcileError::RenderFailure("img".into()).requeue());
        assert!(ReconcileError::ApplyFailure("apply".into()).requeue());
        assert!(ReconcileError::DisruptionFailure("evict".into()).requeue());
        assert!(ReconcileError::StatusUpdateFailure("status".into()).requeue());
    }
}
