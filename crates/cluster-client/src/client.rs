//! Kubernetes-backed cluster client
//!
//! Implements [`ClusterClientTrait`] on top of `kube::Client`. Writes use
//! server-side apply so re-applying an unchanged object is a no-op on the
//! API server.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crds::{Network, NetworkStatus};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret};
use kube::api::{Api, DeleteParams, DynamicObject, GroupVersionKind, ListParams, Patch, PatchParams};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::debug;

/// Merge patch body writing `status` to a Network's status subresource.
pub(crate) fn network_status_patch(status: &NetworkStatus) -> Result<serde_json::Value, ClusterError> {
    Ok(serde_json::json!({ "status": serde_json::to_value(status)? }))
}

/// Cluster client backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    field_manager: String,
}

impl KubeClusterClient {
    /// Create a new cluster client
    ///
    /// # Arguments
    /// * `client` - Kubernetes client
    /// * `field_manager` - Field manager name recorded for server-side apply
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    /// Resolve the dynamic API for an object from its `apiVersion`/`kind`.
    fn dynamic_api(&self, object: &DynamicObject) -> Result<(Api<DynamicObject>, String), ClusterError> {
        let types = object.types.as_ref().ok_or_else(|| {
            ClusterError::InvalidObject("object is missing apiVersion/kind".to_string())
        })?;
        let name = object.metadata.name.clone().ok_or_else(|| {
            ClusterError::InvalidObject(format!("{} is missing metadata.name", types.kind))
        })?;

        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", types.api_version.as_str()),
        };
        let gvk = GroupVersionKind::gvk(group, version, &types.kind);
        let resource = ApiResource::from_gvk(&gvk);

        let api = match object.metadata.namespace.as_deref() {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        };
        Ok((api, name))
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClusterError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("ConfigMap {}/{}", namespace, name)))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("Secret {}/{}", namespace, name)))
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("Deployment {}/{}", namespace, name)))
    }

    async fn get_network(&self, name: &str) -> Result<Network, ClusterError> {
        let api: Api<Network> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("Network {}", name)))
    }

    async fn apply_object(&self, object: &DynamicObject) -> Result<(), ClusterError> {
        let (api, name) = self.dynamic_api(object)?;
        let params = PatchParams::apply(&self.field_manager).force();
        api.patch(&name, &params, &Patch::Apply(object))
            .await
            .map_err(|e| ClusterError::from_kube(e, name.clone()))?;
        debug!(name = %name, "Applied object");
        Ok(())
    }

    async fn delete_pods(&self, namespace: &str, label_selector: &str, params: &DeleteParams) -> Result<(), ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list_params = ListParams::default().labels(label_selector);
        api.delete_collection(params, &list_params)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("pods {}/{}", namespace, label_selector)))?;
        Ok(())
    }

    async fn patch_network_status(&self, name: &str, status: &NetworkStatus) -> Result<(), ClusterError> {
        let api: Api<Network> = Api::all(self.client.clone());
        let patch = network_status_patch(status)?;
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("Network {} status", name)))?;
        Ok(())
    }
}
