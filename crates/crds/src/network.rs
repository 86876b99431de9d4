//! Network CRD
//!
//! Cluster-wide network configuration (`config.openshift.io/v1`, `Network`).
//! A single cluster-scoped instance named `cluster` declares the cluster and
//! service networks; the operator owns its status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired cluster network layout
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "Network",
    plural = "networks",
    status = "NetworkStatus",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// IP address pools for pods
    #[serde(default)]
    pub cluster_network: Vec<ClusterNetworkEntry>,

    /// IP address pools for services
    #[serde(default)]
    pub service_network: Vec<String>,

    /// Plugin implementing the cluster network (e.g. "ncp")
    #[serde(default)]
    pub network_type: String,
}

/// A contiguous block of pod addresses.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    /// The complete block of pod IPs
    pub cidr: String,

    /// Prefix size allocated to each node.
    /// Never copied into the status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_prefix: Option<u32>,
}

/// Observed network configuration. Empty fields are serialized so a merge
/// patch clears stale values.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Observed pod networks
    #[serde(default)]
    pub cluster_network: Vec<ClusterNetworkEntry>,

    /// Observed service networks
    #[serde(default)]
    pub service_network: Vec<String>,

    /// Observed network plugin
    #[serde(default)]
    pub network_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: NetworkSpec = serde_json::from_value(serde_json::json!({
            "clusterNetwork": [{"cidr": "10.4.0.0/16", "hostPrefix": 23}],
            "serviceNetwork": ["172.30.0.0/16"],
            "networkType": "ncp"
        }))
        .unwrap();

        assert_eq!(spec.cluster_network[0].cidr, "10.4.0.0/16");
        assert_eq!(spec.cluster_network[0].host_prefix, Some(23));
        assert_eq!(spec.service_network, vec!["172.30.0.0/16".to_string()]);
        assert_eq!(spec.network_type, "ncp");
    }

    #[test]
    fn test_status_keeps_empty_fields_and_omits_host_prefix() {
        let status = NetworkStatus {
            cluster_network: vec![ClusterNetworkEntry {
                cidr: "10.4.0.0/16".to_string(),
                host_prefix: None,
            }],
            service_network: vec![],
            network_type: "ncp".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "clusterNetwork": [{"cidr": "10.4.0.0/16"}],
                "serviceNetwork": [],
                "networkType": "ncp"
            })
        );
    }
}
