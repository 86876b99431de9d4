//! State shared with other controllers of the operator.
//!
//! Rendered workload manifests and the Network object are published as one
//! snapshot; readers never see a half-updated set. The last-applied operator
//! configuration is published separately once a cycle fully succeeds.

use crate::operator_config::OperatorConfig;
use crds::Network;
use kube::api::DynamicObject;
use std::sync::Arc;
use tokio::sync::watch;

/// What the last cycle rendered and applied
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    /// Rendered `nsx-node-agent` DaemonSet
    pub node_agent_daemon_set: Option<DynamicObject>,
    /// Rendered `nsx-ncp-bootstrap` DaemonSet
    pub bootstrap_daemon_set: Option<DynamicObject>,
    /// Rendered `nsx-ncp` Deployment
    pub ncp_deployment: Option<DynamicObject>,
    /// Network object the manifests were rendered against
    pub network_config: Option<Network>,
    /// Last fully applied operator configuration
    pub operator_config: Option<OperatorConfig>,
    /// Bumped on every publication
    pub generation: u64,
}

/// Read-mostly store backed by a watch channel.
#[derive(Debug)]
pub struct SharedInfo {
    tx: watch::Sender<Arc<SharedSnapshot>>,
}

impl Default for SharedInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedInfo {
    /// Store holding an empty snapshot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(SharedSnapshot::default()));
        Self { tx }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<SharedSnapshot> {
        Arc::clone(&*self.tx.borrow())
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SharedSnapshot>> {
        self.tx.subscribe()
    }

    /// Replace the rendered manifests and network in one update.
    pub fn publish_render(
        &self,
        node_agent_daemon_set: Option<DynamicObject>,
        bootstrap_daemon_set: Option<DynamicObject>,
        ncp_deployment: Option<DynamicObject>,
        network: Network,
    ) {
        self.tx.send_modify(|current| {
            let mut next = SharedSnapshot::clone(current);
            next.node_agent_daemon_set = node_agent_daemon_set;
            next.bootstrap_daemon_set = bootstrap_daemon_set;
            next.ncp_deployment = ncp_deployment;
            next.network_config = Some(network);
            next.generation += 1;
            *current = Arc::new(next);
        });
    }

    /// Record the configuration a cycle fully applied.
    pub fn publish_applied_config(&self, config: OperatorConfig) {
        self.tx.send_modify(|current| {
            let mut next = SharedSnapshot::clone(current);
            next.operator_config = Some(config);
            next.generation += 1;
            *current = Arc::new(next);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_publications() {
        let info = SharedInfo::new();
        let mut rx = info.subscribe();
        assert_eq!(info.snapshot().generation, 0);

        info.publish_render(None, None, None, Network::new("cluster", Default::default()));
        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.network_config.is_some());
        assert!(snapshot.operator_config.is_none());

        info.publish_applied_config([("coe.cluster", "ocp")].into_iter().collect());
        let snapshot = info.snapshot();
        assert_eq!(snapshot.generation, 2);
        assert!(snapshot.network_config.is_some());
        assert_eq!(
            snapshot.operator_config.as_ref().and_then(|c| c.get("coe.cluster")),
            Some("ocp")
        );
    }
}
