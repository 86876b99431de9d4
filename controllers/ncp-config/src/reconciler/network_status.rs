//! Network status projection and write-back.

use super::Reconciler;
use crate::error::ReconcileError;
use crate::names::NETWORK_NAME;
use crate::status::StatusLevel;
use crds::{ClusterNetworkEntry, Network, NetworkSpec, NetworkStatus};
use tracing::{debug, info};

/// Status derived from spec. Host prefixes are per-node allocation details
/// and never appear in the status.
pub fn project_status(spec: &NetworkSpec) -> NetworkStatus {
    NetworkStatus {
        cluster_network: spec
            .cluster_network
            .iter()
            .map(|entry| ClusterNetworkEntry {
                cidr: entry.cidr.clone(),
                host_prefix: None,
            })
            .collect(),
        service_network: spec.service_network.clone(),
        network_type: spec.network_type.clone(),
    }
}

impl Reconciler {
    pub(crate) async fn update_network_status(&self, network: &Network) -> Result<(), ReconcileError> {
        let status = project_status(&network.spec);
        if let Err(e) = self.cluster.patch_network_status(NETWORK_NAME, &status).await {
            let message = format!("Failed to update network status: {}", e);
            self.status
                .set_degraded(StatusLevel::ClusterConfig, "UpdateNetworkStatusError", &message);
            return Err(ReconcileError::StatusUpdateFailure(message));
        }
        info!(name = NETWORK_NAME, "Updated network status");
        Ok(())
    }

    /// Write the projection only when the observed status drifted from it.
    pub(crate) async fn repair_network_status(&self, network: &Network) -> Result<(), ReconcileError> {
        let expected = project_status(&network.spec);
        if network.status.as_ref() == Some(&expected) {
            debug!(name = NETWORK_NAME, "Network status up to date");
            return Ok(());
        }
        info!(name = NETWORK_NAME, "Network status drifted, repairing");
        self.update_network_status(network).await
    }
}
