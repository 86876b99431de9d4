//! Test utilities for unit testing the reconciler
//!
//! Builders for the watched objects and a reconciler wired to a
//! `MockClusterClient`.

use crate::collaborators::Collaborators;
use crate::names::{NCP_DEPLOYMENT, NETWORK_NAME, NSX_NAMESPACE, OPERATOR_CONFIG_MAP, OPERATOR_NAMESPACE};
use crate::probes::Metrics;
use crate::reconciler::{ImageSource, Reconciler};
use crate::shared_info::SharedInfo;
use crate::status::StatusManager;
use cluster_client::MockClusterClient;
use crds::{ClusterNetworkEntry, Network, NetworkSpec};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::sync::{Arc, Mutex, PoisonError};

pub const TEST_IMAGE: &str = "registry.local/nsx-ncp:1.0";

/// Image source whose value tests can change between cycles
#[derive(Debug, Clone, Default)]
pub struct FixedImageSource {
    image: Arc<Mutex<Option<String>>>,
}

impl FixedImageSource {
    pub fn new(image: Option<&str>) -> Self {
        Self {
            image: Arc::new(Mutex::new(image.map(str::to_string))),
        }
    }

    pub fn set(&self, image: Option<&str>) {
        *self.image.lock().unwrap_or_else(PoisonError::into_inner) = image.map(str::to_string);
    }
}

impl ImageSource for FixedImageSource {
    fn image(&self) -> Option<String> {
        self.image.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Helper to create the operator ConfigMap
pub fn create_operator_config_map(pairs: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(OPERATOR_CONFIG_MAP.to_string()),
            namespace: Some(OPERATOR_NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
        ..Default::default()
    }
}

/// A minimal valid operator configuration
pub fn default_operator_pairs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("nsx_v3.nsx_api_managers", "10.0.0.1"),
        ("nsx_node_agent.ovs_bridge", "br-int"),
        ("coe.cluster", "ocp"),
    ]
}

/// Helper to create the cluster Network with a uid
pub fn create_network() -> Network {
    let mut network = Network::new(
        NETWORK_NAME,
        NetworkSpec {
            cluster_network: vec![ClusterNetworkEntry {
                cidr: "10.4.0.0/16".to_string(),
                host_prefix: Some(23),
            }],
            service_network: vec!["172.30.0.0/16".to_string()],
            network_type: "ncp".to_string(),
        },
    );
    network.metadata.uid = Some("3f1c2a9e-network-uid".to_string());
    network
}

/// Helper to create an NCP Deployment running `image`
pub fn create_ncp_deployment(image: &str) -> Deployment {
    serde_json::from_value(serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": NCP_DEPLOYMENT, "namespace": NSX_NAMESPACE},
        "spec": {
            "selector": {"matchLabels": {"component": NCP_DEPLOYMENT}},
            "template": {"spec": {"containers": [{"name": NCP_DEPLOYMENT, "image": image}]}}
        }
    }))
    .expect("valid deployment")
}

/// A reconciler plus handles to everything it talks to
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub cluster: MockClusterClient,
    pub image: FixedImageSource,
    pub status: Arc<StatusManager>,
    pub shared_info: Arc<SharedInfo>,
    pub metrics: Arc<Metrics>,
}

/// Reconciler with default collaborators over a mock cluster that already
/// holds a valid operator ConfigMap and Network.
pub fn create_test_harness() -> TestHarness {
    let cluster = MockClusterClient::new();
    cluster.add_config_map(create_operator_config_map(&default_operator_pairs()));
    cluster.add_network(create_network());
    create_test_harness_with(cluster, Collaborators::default())
}

pub fn create_test_harness_with(cluster: MockClusterClient, collaborators: Collaborators) -> TestHarness {
    let image = FixedImageSource::new(Some(TEST_IMAGE));
    let status = Arc::new(StatusManager::new());
    let shared_info = Arc::new(SharedInfo::new());
    let metrics = Arc::new(Metrics::new().expect("metrics registry"));
    let reconciler = Reconciler::new(
        Box::new(cluster.clone()),
        collaborators,
        Box::new(image.clone()),
        status.clone(),
        shared_info.clone(),
        metrics.clone(),
    );
    TestHarness {
        reconciler,
        cluster,
        image,
        status,
        shared_info,
        metrics,
    }
}
