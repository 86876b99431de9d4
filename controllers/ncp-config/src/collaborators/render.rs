//! Renders the managed object set.
//!
//! Manifests are built as JSON and converted to `DynamicObject`s so the
//! applier can server-side apply every kind through one code path.

use super::ManifestRenderer;
use crate::error::CollaboratorError;
use crate::names::{
    COMPONENT_LABEL, LB_SECRET, NCP_BOOTSTRAP_DAEMONSET, NCP_CONFIG_MAP, NODE_AGENT_CONFIG_MAP, NSX_NAMESPACE,
};
use crate::operator_config::{keys, Component, ConfigView, OperatorConfig};
use kube::api::DynamicObject;
use serde_json::{json, Value};

const CONFIG_VOLUME: &str = "config-volume";
const CONFIG_MOUNT_PATH: &str = "/etc/nsx-ujo/config";
const SERVICE_ACCOUNT: &str = "nsx-ncp-svc-account";

/// Renders a fixed layout: one NCP replica plus node-level daemonsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRenderer;

fn labels(name: &str) -> Value {
    json!({ COMPONENT_LABEL: name })
}

/// Certificate material goes to the secret, never into ConfigMaps.
fn without_certs(mut view: ConfigView) -> ConfigView {
    view.remove(keys::LB_DEFAULT_CERT);
    view.remove(keys::LB_PRIV_KEY);
    view
}

fn config_map(name: &str, data: &ConfigView) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": NSX_NAMESPACE },
        "data": data,
    })
}

fn pod_template(name: &str, image: &str, config_map: &str, host_network: bool) -> Value {
    json!({
        "metadata": { "labels": labels(name) },
        "spec": {
            "serviceAccountName": SERVICE_ACCOUNT,
            "hostNetwork": host_network,
            "containers": [{
                "name": name,
                "image": image,
                "volumeMounts": [{
                    "name": CONFIG_VOLUME,
                    "mountPath": CONFIG_MOUNT_PATH,
                    "readOnly": true,
                }],
            }],
            "volumes": [{
                "name": CONFIG_VOLUME,
                "configMap": { "name": config_map },
            }],
        },
    })
}

fn daemon_set(name: &str, image: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "DaemonSet",
        "metadata": { "name": name, "namespace": NSX_NAMESPACE, "labels": labels(name) },
        "spec": {
            "selector": { "matchLabels": labels(name) },
            "template": pod_template(name, image, NODE_AGENT_CONFIG_MAP, true),
        },
    })
}

impl ManifestRenderer for DefaultRenderer {
    fn render(&self, config: &OperatorConfig, image: Option<&str>) -> Result<Vec<DynamicObject>, CollaboratorError> {
        let image = image
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| CollaboratorError::Missing("NCP image".to_string()))?;
        let ncp = Component::Ncp.workload_name();
        let agent = Component::NodeAgent.workload_name();

        let mut manifests = vec![
            json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": NSX_NAMESPACE },
            }),
            config_map(NCP_CONFIG_MAP, &without_certs(config.view(Component::Ncp))),
            config_map(NODE_AGENT_CONFIG_MAP, &without_certs(config.view(Component::NodeAgent))),
        ];

        if let (Some(cert), Some(key)) = (config.get(keys::LB_DEFAULT_CERT), config.get(keys::LB_PRIV_KEY)) {
            manifests.push(json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "type": "kubernetes.io/tls",
                "metadata": { "name": LB_SECRET, "namespace": NSX_NAMESPACE },
                "stringData": { "tls.crt": cert, "tls.key": key },
            }));
        }

        manifests.push(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": ncp, "namespace": NSX_NAMESPACE, "labels": labels(ncp) },
            "spec": {
                "replicas": 1,
                "selector": { "matchLabels": labels(ncp) },
                "template": pod_template(ncp, image, NCP_CONFIG_MAP, true),
            },
        }));
        manifests.push(daemon_set(NCP_BOOTSTRAP_DAEMONSET, image));
        manifests.push(daemon_set(agent, image));

        manifests
            .into_iter()
            .map(|manifest| serde_json::from_value(manifest).map_err(CollaboratorError::from))
            .collect()
    }
}
