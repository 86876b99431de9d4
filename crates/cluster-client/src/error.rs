//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when talking to the cluster
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// API server rejected the request
    #[error("Kubernetes API error: {0}")]
    Api(String),

    /// Transport or client-side error from kube
    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object is missing fields required to address it
    #[error("Invalid object: {0}")]
    InvalidObject(String),
}

impl ClusterError {
    /// Whether the error means the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }

    /// Maps a kube error, turning 404 responses into [`ClusterError::NotFound`].
    pub(crate) fn from_kube(err: kube::Error, what: impl Into<String>) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => ClusterError::NotFound(what.into()),
            kube::Error::Api(ae) => {
                ClusterError::Api(format!("{} ({}): {}", what.into(), ae.code, ae.message))
            }
            other => ClusterError::Kube(other),
        }
    }
}
