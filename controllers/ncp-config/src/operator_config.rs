//! Operator configuration model.
//!
//! The operator ConfigMap carries flattened `section.option` keys. The
//! section decides which managed workload consumes a key, and a workload's
//! *view* is the subset of keys it consumes. Views are ordered maps, so two
//! views compare equal regardless of the order keys were written in.

use crate::names::{COMPONENT_LABEL, NCP_DEPLOYMENT, NODE_AGENT_DAEMONSET};
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;
use std::fmt;

/// Well-known configuration keys
pub mod keys {
    /// NSX manager endpoints
    pub const NSX_API_MANAGERS: &str = "nsx_v3.nsx_api_managers";
    /// Comma-separated pod CIDRs
    pub const CONTAINER_IP_BLOCKS: &str = "nsx_v3.container_ip_blocks";
    /// PEM certificate stored in `lb-secret`
    pub const LB_DEFAULT_CERT: &str = "nsx_v3.lb_default_cert";
    /// PEM key stored in `lb-secret`
    pub const LB_PRIV_KEY: &str = "nsx_v3.lb_priv_key";
    /// Service CIDR
    pub const SERVICE_CLUSTER_IP_RANGE: &str = "k8s.service_cluster_ip_range";
    /// Container orchestrator adaptor
    pub const COE_ADAPTOR: &str = "coe.adaptor";
    /// Cluster name known to NSX
    pub const COE_CLUSTER: &str = "coe.cluster";
    /// OVS integration bridge on each node
    pub const OVS_BRIDGE: &str = "nsx_node_agent.ovs_bridge";
}

const DEFAULT_SECTION: &str = "DEFAULT";
const NODE_AGENT_SECTIONS: &[&str] = &["nsx_node_agent", "nsx_kube_proxy"];
const SHARED_SECTIONS: &[&str] = &[DEFAULT_SECTION, "coe", "k8s"];

/// A workload whose pods are restarted on configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// NCP deployment (data-plane controller)
    Ncp,
    /// nsx-node-agent daemonset
    NodeAgent,
}

impl Component {
    /// Every managed workload, in eviction order
    pub const ALL: [Component; 2] = [Component::Ncp, Component::NodeAgent];

    /// Name of the owning workload; also the value of its `component` label.
    pub fn workload_name(self) -> &'static str {
        match self {
            Component::Ncp => NCP_DEPLOYMENT,
            Component::NodeAgent => NODE_AGENT_DAEMONSET,
        }
    }

    /// Kubernetes kind of the workload object
    pub fn workload_kind(self) -> &'static str {
        match self {
            Component::Ncp => "Deployment",
            Component::NodeAgent => "DaemonSet",
        }
    }

    /// Selector matching the workload's pods
    pub fn label_selector(self) -> String {
        format!("{}={}", COMPONENT_LABEL, self.workload_name())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.workload_name())
    }
}

/// Which workloads consume a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    Ncp,
    NodeAgent,
    Shared,
}

impl KeyScope {
    /// Classify a key by its section. Keys without a section belong to `DEFAULT`.
    pub fn of(key: &str) -> Self {
        let section = key.split_once('.').map_or(DEFAULT_SECTION, |(section, _)| section);
        if NODE_AGENT_SECTIONS.contains(&section) {
            KeyScope::NodeAgent
        } else if SHARED_SECTIONS.contains(&section) {
            KeyScope::Shared
        } else {
            KeyScope::Ncp
        }
    }

    /// Whether keys in this scope belong to `component`'s view.
    pub fn includes(self, component: Component) -> bool {
        match self {
            KeyScope::Shared => true,
            KeyScope::Ncp => component == Component::Ncp,
            KeyScope::NodeAgent => component == Component::NodeAgent,
        }
    }
}

/// Keys consumed by one workload
pub type ConfigView = BTreeMap<String, String>;

/// Operator configuration key/value data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorConfig {
    data: BTreeMap<String, String>,
}

impl OperatorConfig {
    /// Wrap raw key/value data.
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }

    /// Configuration carried by a ConfigMap's `data`.
    pub fn from_config_map(config_map: &ConfigMap) -> Self {
        Self::new(config_map.data.clone().unwrap_or_default())
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Whether `key` is present with a non-blank value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    /// Set `key`, replacing any existing value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// Set `key` unless it already has a non-blank value. Returns whether it was set.
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.is_set(key) {
            return false;
        }
        self.data.insert(key.to_string(), value.into());
        true
    }

    /// Keys consumed by `component`.
    pub fn view(&self, component: Component) -> ConfigView {
        self.data
            .iter()
            .filter(|(key, _)| KeyScope::of(key).includes(component))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OperatorConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_scope_by_section() {
        assert_eq!(KeyScope::of("nsx_node_agent.ovs_bridge"), KeyScope::NodeAgent);
        assert_eq!(KeyScope::of("nsx_kube_proxy.config_handler"), KeyScope::NodeAgent);
        assert_eq!(KeyScope::of("coe.cluster"), KeyScope::Shared);
        assert_eq!(KeyScope::of("k8s.apiserver_host_ip"), KeyScope::Shared);
        assert_eq!(KeyScope::of("log_level"), KeyScope::Shared);
        assert_eq!(KeyScope::of("nsx_v3.nsx_api_managers"), KeyScope::Ncp);
        assert_eq!(KeyScope::of("ha.master_timeout"), KeyScope::Ncp);
    }

    #[test]
    fn test_views_split_by_component() {
        let config: OperatorConfig = [
            ("nsx_v3.nsx_api_managers", "10.0.0.1"),
            ("nsx_node_agent.ovs_bridge", "br-int"),
            ("coe.cluster", "ocp"),
        ]
        .into_iter()
        .collect();

        let ncp = config.view(Component::Ncp);
        assert!(ncp.contains_key("nsx_v3.nsx_api_managers"));
        assert!(ncp.contains_key("coe.cluster"));
        assert!(!ncp.contains_key("nsx_node_agent.ovs_bridge"));

        let agent = config.view(Component::NodeAgent);
        assert!(agent.contains_key("nsx_node_agent.ovs_bridge"));
        assert!(agent.contains_key("coe.cluster"));
        assert!(!agent.contains_key("nsx_v3.nsx_api_managers"));
    }

    #[test]
    fn test_set_default_keeps_existing_values() {
        let mut config: OperatorConfig = [("coe.adaptor", "kubernetes"), ("coe.cluster", " ")]
            .into_iter()
            .collect();

        assert!(!config.set_default("coe.adaptor", "openshift4"));
        assert!(config.set_default("coe.cluster", "cluster"));
        assert_eq!(config.get("coe.adaptor"), Some("kubernetes"));
        assert_eq!(config.get("coe.cluster"), Some("cluster"));
    }

    #[test]
    fn test_component_label_selector() {
        assert_eq!(Component::Ncp.label_selector(), "component=nsx-ncp");
        assert_eq!(Component::NodeAgent.label_selector(), "component=nsx-node-agent");
    }
}
