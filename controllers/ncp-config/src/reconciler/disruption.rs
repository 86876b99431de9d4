//! Pod eviction for workloads whose configuration changed.

use super::change::{Baseline, ChangeFlags};
use super::Reconciler;
use crate::error::ReconcileError;
use crate::names::NSX_NAMESPACE;
use crate::operator_config::{Component, OperatorConfig};
use crate::status::StatusLevel;
use cluster_client::ClusterError;
use kube::api::{DeleteParams, PropagationPolicy};
use tracing::{error, info};

impl Reconciler {
    /// Delete every pod of `component` so its controller recreates them with
    /// the new spec.
    pub(crate) async fn evict_workload(&self, component: Component) -> Result<(), ClusterError> {
        let params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Foreground),
            grace_period_seconds: Some(0),
            ..DeleteParams::default()
        };
        let result = self
            .cluster
            .delete_pods(NSX_NAMESPACE, &component.label_selector(), &params)
            .await;
        self.metrics.record_eviction(component.workload_name(), result.is_ok());

        match &result {
            Ok(()) => info!(component = %component, "Deleted existing pods"),
            Err(e) => error!(component = %component, error = %e, "Failed to delete existing pods"),
        }
        result
    }

    /// Evict each changed workload independently. Views of workloads that no
    /// longer need eviction advance to `candidate`, so a retry only evicts
    /// what failed.
    pub(crate) async fn disrupt(
        &self,
        changes: ChangeFlags,
        candidate: &OperatorConfig,
        baseline: &mut Baseline,
    ) -> Result<Vec<Component>, ReconcileError> {
        let mut evicted = Vec::new();
        let mut failures = Vec::new();

        for component in Component::ALL {
            if !changes.get(component) {
                baseline.advance(component, candidate);
                continue;
            }
            match self.evict_workload(component).await {
                Ok(()) => {
                    baseline.advance(component, candidate);
                    evicted.push(component);
                }
                Err(e) => {
                    self.status.set_degraded(
                        StatusLevel::OperatorConfig,
                        "DeleteOldPodsError",
                        &format!(
                            "{} {} is not using the latest configuration updates because: {}",
                            component.workload_kind(),
                            component,
                            e
                        ),
                    );
                    failures.push(format!("{}: {}", component, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(evicted)
        } else {
            Err(ReconcileError::DisruptionFailure(failures.join("; ")))
        }
    }
}
