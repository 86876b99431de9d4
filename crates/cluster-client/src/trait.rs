//! ClusterClient trait for mocking
//!
//! This trait abstracts cluster access so the reconciliation engine can be
//! unit tested without an API server. The concrete `KubeClusterClient`
//! implements it, and tests use `MockClusterClient`.

use crate::error::ClusterError;
use crds::{Network, NetworkStatus};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{DeleteParams, DynamicObject};

/// Trait for cluster state operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    // Reads
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClusterError>;
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError>;
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError>;
    /// Network objects are cluster-scoped.
    async fn get_network(&self, name: &str) -> Result<Network, ClusterError>;

    // Writes
    /// Creates or updates `object` (server-side apply). The object must carry
    /// `apiVersion`, `kind` and `metadata.name`.
    async fn apply_object(&self, object: &DynamicObject) -> Result<(), ClusterError>;
    /// Deletes every pod in `namespace` matching `label_selector`.
    async fn delete_pods(&self, namespace: &str, label_selector: &str, params: &DeleteParams) -> Result<(), ClusterError>;
    /// Replaces the status of the named Network object.
    async fn patch_network_status(&self, name: &str, status: &NetworkStatus) -> Result<(), ClusterError>;
}
