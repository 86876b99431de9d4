//! Integration tests for the cluster client
//!
//! These tests require a reachable cluster (current kubeconfig context) with
//! the Network CRD installed. Run with `cargo test -- --ignored`.

use cluster_client::{ClusterClientTrait, KubeClusterClient};
use kube::api::DynamicObject;

async fn client() -> KubeClusterClient {
    let kube_client = kube::Client::try_default()
        .await
        .expect("Failed to create Kubernetes client");
    KubeClusterClient::new(kube_client, "cluster-client-it")
}

#[tokio::test]
#[ignore] // Requires running cluster
async fn test_missing_config_map_is_not_found() {
    let client = client().await;

    let err = client
        .get_config_map("default", "cluster-client-it-does-not-exist")
        .await
        .expect_err("ConfigMap should not exist");
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

#[tokio::test]
#[ignore]
async fn test_apply_config_map_twice() {
    let client = client().await;

    let object: DynamicObject = serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": "cluster-client-it", "namespace": "default"},
        "data": {"coe.adaptor": "openshift4"}
    }))
    .expect("valid object");

    client.apply_object(&object).await.expect("first apply");
    client.apply_object(&object).await.expect("second apply is idempotent");

    let cm = client
        .get_config_map("default", "cluster-client-it")
        .await
        .expect("applied ConfigMap is readable");
    assert_eq!(
        cm.data.unwrap_or_default().get("coe.adaptor").map(String::as_str),
        Some("openshift4")
    );
}

#[tokio::test]
#[ignore]
async fn test_get_cluster_network() {
    let client = client().await;

    let network = client.get_network("cluster").await.expect("Network cluster");
    println!("Network type: {}", network.spec.network_type);
}
