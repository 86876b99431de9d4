//! Mock ClusterClient for unit testing
//!
//! Keeps objects in memory, records every write, and can be told to fail
//! specific operations. Applied Deployments, ConfigMaps and Secrets become
//! readable afterwards, so a sequence of reconciliation cycles behaves like it
//! would against a real API server.

use crate::client::network_status_patch;
use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crds::{Network, NetworkStatus};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{DeleteParams, DynamicObject};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// Any read of the named object
    Get,
    /// Applying the named object
    Apply,
    /// Deleting pods matching the label selector
    DeletePods,
    /// Patching the named Network's status
    PatchStatus,
}

/// A recorded pod deletion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodDeletion {
    /// Namespace the pods were deleted from
    pub namespace: String,
    /// Selector passed to the delete
    pub label_selector: String,
    /// `Debug` form of the requested policy
    pub propagation_policy: Option<String>,
    /// Requested grace period
    pub grace_period_seconds: Option<u32>,
}

#[derive(Default)]
struct MockState {
    config_maps: HashMap<(String, String), ConfigMap>,
    secrets: HashMap<(String, String), Secret>,
    deployments: HashMap<(String, String), Deployment>,
    networks: HashMap<String, Network>,
    applied: Vec<DynamicObject>,
    pod_deletions: Vec<PodDeletion>,
    status_patches: Vec<(String, NetworkStatus)>,
    failures: HashSet<(MockOperation, String)>,
}

/// Mock ClusterClient for testing
#[derive(Clone, Default)]
pub struct MockClusterClient {
    state: Arc<Mutex<MockState>>,
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

/// JSON merge patch (RFC 7396): objects merge recursively, `null` removes a
/// member, anything else replaces the target.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target) = target {
        for (field, value) in patch {
            if value.is_null() {
                target.remove(field);
            } else {
                merge_patch(target.entry(field.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

impl MockClusterClient {
    /// Create an empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, op: MockOperation, name: &str) -> Result<(), ClusterError> {
        if self.state().failures.contains(&(op, name.to_string())) {
            return Err(ClusterError::Api(format!("injected {:?} failure for {}", op, name)));
        }
        Ok(())
    }

    /// Add a ConfigMap to the mock store (for test setup)
    pub fn add_config_map(&self, config_map: ConfigMap) {
        let ns = config_map.metadata.namespace.clone().unwrap_or_default();
        let name = config_map.metadata.name.clone().unwrap_or_default();
        self.state().config_maps.insert(key(&ns, &name), config_map);
    }

    /// Remove a ConfigMap from the mock store
    pub fn remove_config_map(&self, namespace: &str, name: &str) {
        self.state().config_maps.remove(&key(namespace, name));
    }

    /// Add a Secret to the mock store (for test setup)
    pub fn add_secret(&self, secret: Secret) {
        let ns = secret.metadata.namespace.clone().unwrap_or_default();
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.state().secrets.insert(key(&ns, &name), secret);
    }

    /// Add a Deployment to the mock store (for test setup)
    pub fn add_deployment(&self, deployment: Deployment) {
        let ns = deployment.metadata.namespace.clone().unwrap_or_default();
        let name = deployment.metadata.name.clone().unwrap_or_default();
        self.state().deployments.insert(key(&ns, &name), deployment);
    }

    /// Add a Network to the mock store (for test setup)
    pub fn add_network(&self, network: Network) {
        let name = network.metadata.name.clone().unwrap_or_default();
        self.state().networks.insert(name, network);
    }

    /// Make `op` on `name` fail until [`Self::succeed`] is called
    pub fn fail(&self, op: MockOperation, name: &str) {
        self.state().failures.insert((op, name.to_string()));
    }

    /// Stop failing `op` on `name`
    pub fn succeed(&self, op: MockOperation, name: &str) {
        self.state().failures.remove(&(op, name.to_string()));
    }

    /// Every object applied so far, in order
    pub fn applied(&self) -> Vec<DynamicObject> {
        self.state().applied.clone()
    }

    /// Names of applied objects, in order
    pub fn applied_names(&self) -> Vec<String> {
        self.state()
            .applied
            .iter()
            .filter_map(|o| o.metadata.name.clone())
            .collect()
    }

    /// Every pod deletion so far, in order
    pub fn pod_deletions(&self) -> Vec<PodDeletion> {
        self.state().pod_deletions.clone()
    }

    /// Every Network status patch so far, in order
    pub fn status_patches(&self) -> Vec<(String, NetworkStatus)> {
        self.state().status_patches.clone()
    }

    /// Forget recorded writes, keeping stored objects
    pub fn clear_recorded(&self) {
        let mut state = self.state();
        state.applied.clear();
        state.pod_deletions.clear();
        state.status_patches.clear();
    }

    /// Store applied objects of known kinds so later reads observe them.
    fn store_applied(state: &mut MockState, object: &DynamicObject) -> Result<(), ClusterError> {
        let kind = object.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default();
        let ns = object.metadata.namespace.clone().unwrap_or_default();
        let name = object.metadata.name.clone().unwrap_or_default();
        match kind {
            "Deployment" => {
                let deployment: Deployment = serde_json::from_value(serde_json::to_value(object)?)?;
                state.deployments.insert(key(&ns, &name), deployment);
            }
            "ConfigMap" => {
                let config_map: ConfigMap = serde_json::from_value(serde_json::to_value(object)?)?;
                state.config_maps.insert(key(&ns, &name), config_map);
            }
            "Secret" => {
                let secret: Secret = serde_json::from_value(serde_json::to_value(object)?)?;
                state.secrets.insert(key(&ns, &name), secret);
            }
            _ => {}
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClusterError> {
        self.check(MockOperation::Get, name)?;
        self.state()
            .config_maps
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("ConfigMap {}/{}", namespace, name)))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError> {
        self.check(MockOperation::Get, name)?;
        self.state()
            .secrets
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Secret {}/{}", namespace, name)))
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        self.check(MockOperation::Get, name)?;
        self.state()
            .deployments
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Deployment {}/{}", namespace, name)))
    }

    async fn get_network(&self, name: &str) -> Result<Network, ClusterError> {
        self.check(MockOperation::Get, name)?;
        self.state()
            .networks
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Network {}", name)))
    }

    async fn apply_object(&self, object: &DynamicObject) -> Result<(), ClusterError> {
        let name = object
            .metadata
            .name
            .clone()
            .ok_or_else(|| ClusterError::InvalidObject("object is missing metadata.name".to_string()))?;
        self.check(MockOperation::Apply, &name)?;
        let mut state = self.state();
        Self::store_applied(&mut state, object)?;
        state.applied.push(object.clone());
        Ok(())
    }

    async fn delete_pods(&self, namespace: &str, label_selector: &str, params: &DeleteParams) -> Result<(), ClusterError> {
        self.check(MockOperation::DeletePods, label_selector)?;
        let propagation_policy = params
            .propagation_policy
            .as_ref()
            .map(|p| format!("{:?}", p));
        self.state().pod_deletions.push(PodDeletion {
            namespace: namespace.to_string(),
            label_selector: label_selector.to_string(),
            propagation_policy,
            grace_period_seconds: params.grace_period_seconds,
        });
        Ok(())
    }

    async fn patch_network_status(&self, name: &str, status: &NetworkStatus) -> Result<(), ClusterError> {
        self.check(MockOperation::PatchStatus, name)?;
        let patch = network_status_patch(status)?;
        let mut state = self.state();
        let network = state
            .networks
            .get_mut(name)
            .ok_or_else(|| ClusterError::NotFound(format!("Network {}", name)))?;
        let mut merged = serde_json::to_value(&*network)?;
        merge_patch(&mut merged, &patch);
        *network = serde_json::from_value(merged)?;
        state.status_patches.push((name.to_string(), status.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{ClusterNetworkEntry, NetworkSpec};
    use kube::api::PropagationPolicy;

    #[tokio::test]
    async fn test_applied_deployment_becomes_readable() {
        let client = MockClusterClient::new();
        let object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "nsx-ncp", "namespace": "nsx-system"},
            "spec": {
                "selector": {"matchLabels": {"component": "nsx-ncp"}},
                "template": {"spec": {"containers": [{"name": "nsx-ncp", "image": "ncp:1"}]}}
            }
        }))
        .unwrap();

        client.apply_object(&object).await.unwrap();

        let deployment = client.get_deployment("nsx-system", "nsx-ncp").await.unwrap();
        let image = deployment.spec.unwrap().template.spec.unwrap().containers[0].image.clone();
        assert_eq!(image.as_deref(), Some("ncp:1"));
        assert_eq!(client.applied_names(), vec!["nsx-ncp".to_string()]);
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let client = MockClusterClient::new();
        client.fail(MockOperation::DeletePods, "component=nsx-node-agent");

        let params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Foreground),
            grace_period_seconds: Some(0),
            ..DeleteParams::default()
        };
        let result = client.delete_pods("nsx-system", "component=nsx-node-agent", &params).await;
        assert!(matches!(result, Err(ClusterError::Api(_))));
        assert!(client.pod_deletions().is_empty());

        client.succeed(MockOperation::DeletePods, "component=nsx-node-agent");
        client.delete_pods("nsx-system", "component=nsx-node-agent", &params).await.unwrap();
        let deletions = client.pod_deletions();
        assert_eq!(deletions.len(), 1);
        assert_eq!(deletions[0].grace_period_seconds, Some(0));
        assert_eq!(deletions[0].propagation_policy.as_deref(), Some("Foreground"));
    }

    #[tokio::test]
    async fn test_status_patch_clears_emptied_fields() {
        let client = MockClusterClient::new();
        client.add_network(Network::new("cluster", NetworkSpec::default()));
        let entry = ClusterNetworkEntry {
            cidr: "10.4.0.0/16".to_string(),
            host_prefix: None,
        };

        client
            .patch_network_status(
                "cluster",
                &NetworkStatus {
                    cluster_network: vec![entry.clone()],
                    service_network: vec!["172.30.0.0/16".to_string()],
                    network_type: "ncp".to_string(),
                },
            )
            .await
            .unwrap();
        let emptied = NetworkStatus {
            cluster_network: vec![entry],
            service_network: vec![],
            network_type: "ncp".to_string(),
        };
        client.patch_network_status("cluster", &emptied).await.unwrap();

        let network = client.get_network("cluster").await.unwrap();
        assert_eq!(network.status, Some(emptied));
        assert_eq!(client.status_patches().len(), 2);
    }

    #[test]
    fn test_merge_patch_semantics() {
        let mut target = serde_json::json!({"a": {"b": 1, "c": [1, 2]}, "d": "keep"});
        merge_patch(&mut target, &serde_json::json!({"a": {"b": null, "c": []}}));
        assert_eq!(target, serde_json::json!({"a": {"c": []}, "d": "keep"}));
    }

    #[tokio::test]
    async fn test_missing_objects_are_not_found() {
        let client = MockClusterClient::new();
        assert!(client.get_network("cluster").await.unwrap_err().is_not_found());
        assert!(client.get_secret("nsx-system", "lb-secret").await.unwrap_err().is_not_found());
    }
}
