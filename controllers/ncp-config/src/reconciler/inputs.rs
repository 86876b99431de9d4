//! Input aggregation: operator config, Network, and deployed fragments.

use super::change::Baseline;
use super::Reconciler;
use crate::collaborators::DeployedFragments;
use crate::error::ReconcileError;
use crate::names::{
    LB_SECRET, NCP_CONFIG_MAP, NETWORK_NAME, NODE_AGENT_CONFIG_MAP, NSX_NAMESPACE, OPERATOR_CONFIG_MAP,
    OPERATOR_NAMESPACE,
};
use crate::operator_config::OperatorConfig;
use crate::status::StatusLevel;
use cluster_client::ClusterError;
use crds::Network;
use tracing::{info, warn};

/// Inputs of one cycle
#[derive(Debug, Clone)]
pub(crate) struct CycleInputs {
    /// Operator configuration as read
    pub config: OperatorConfig,
    /// The cluster Network object
    pub network: Network,
}

/// Treats any failure other than absence as absence, with a warning.
fn tolerate<T>(result: Result<T, ClusterError>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            warn!(object = what, error = %e, "Failed to read deployed fragment, ignoring it");
            None
        }
    }
}

impl Reconciler {
    pub(crate) async fn fetch_inputs(&self) -> Result<CycleInputs, ReconcileError> {
        let config_map = match self.cluster.get_config_map(OPERATOR_NAMESPACE, OPERATOR_CONFIG_MAP).await {
            Ok(cm) => cm,
            Err(e) if e.is_not_found() => {
                info!(namespace = OPERATOR_NAMESPACE, name = OPERATOR_CONFIG_MAP, "Operator ConfigMap not found");
                self.status.set_degraded(
                    StatusLevel::OperatorConfig,
                    "NoOperatorConfig",
                    "Operator ConfigMap is not found",
                );
                return Err(ReconcileError::NotFound(format!(
                    "ConfigMap {}/{}",
                    OPERATOR_NAMESPACE, OPERATOR_CONFIG_MAP
                )));
            }
            Err(e) => {
                let message = format!("Failed to get operator ConfigMap: {}", e);
                self.status
                    .set_degraded(StatusLevel::OperatorConfig, "NoOperatorConfig", &message);
                return Err(ReconcileError::ReadFailure(message));
            }
        };

        let network = match self.cluster.get_network(NETWORK_NAME).await {
            Ok(network) => network,
            Err(e) if e.is_not_found() => {
                info!(name = NETWORK_NAME, "Cluster network CRD not found");
                self.status.set_degraded(
                    StatusLevel::ClusterConfig,
                    "NoClusterConfig",
                    "Cluster network CRD is not found",
                );
                return Err(ReconcileError::NotFound(format!("Network {}", NETWORK_NAME)));
            }
            Err(e) => {
                let message = format!("Failed to get cluster network CRD: {}", e);
                self.status
                    .set_degraded(StatusLevel::ClusterConfig, "NoClusterConfig", &message);
                return Err(ReconcileError::ReadFailure(message));
            }
        };

        Ok(CycleInputs {
            config: OperatorConfig::from_config_map(&config_map),
            network,
        })
    }

    /// Rebuild the baseline from what is deployed. `None` unless both derived
    /// ConfigMaps exist.
    pub(crate) async fn reconstruct_baseline(&self) -> Result<Option<Baseline>, ReconcileError> {
        let ncp_config = tolerate(
            self.cluster.get_config_map(NSX_NAMESPACE, NCP_CONFIG_MAP).await,
            NCP_CONFIG_MAP,
        );
        let node_agent_config = tolerate(
            self.cluster.get_config_map(NSX_NAMESPACE, NODE_AGENT_CONFIG_MAP).await,
            NODE_AGENT_CONFIG_MAP,
        );
        let lb_secret = tolerate(self.cluster.get_secret(NSX_NAMESPACE, LB_SECRET).await, LB_SECRET);

        let (Some(ncp_config), Some(node_agent_config)) = (ncp_config, node_agent_config) else {
            info!("No deployed configuration found, starting without baseline");
            return Ok(None);
        };

        let fragments = DeployedFragments {
            ncp_config,
            node_agent_config,
            lb_secret,
        };
        match self.collaborators.generator.generate(&fragments) {
            Ok(config) => {
                info!("Reconstructed baseline from deployed configuration");
                Ok(Some(Baseline::from_config(&config)))
            }
            Err(e) => {
                let message = format!("Failed to generate operator ConfigMap: {}", e);
                self.status
                    .set_degraded(StatusLevel::OperatorConfig, "InternalError", &message);
                Err(ReconcileError::BaselineFailure(message))
            }
        }
    }
}
