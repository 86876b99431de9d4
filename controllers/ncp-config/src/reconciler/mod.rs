//! Reconciliation engine for the NCP operator configuration.
//!
//! One cycle reads the operator ConfigMap and the cluster Network, fills
//! defaults and validates, compares the result with the last-applied
//! baseline, and when something changed renders and applies the managed
//! objects and restarts only the workloads whose configuration changed.
//!
//! - `inputs`: operator config, Network, and baseline reconstruction
//! - `change`: per-workload change detection
//! - `image`: NCP image drift detection
//! - `apply`: owner references and apply
//! - `disruption`: pod eviction with per-workload baseline advance
//! - `network_status`: Network status projection

mod apply;
mod change;
mod disruption;
mod image;
mod inputs;
mod network_status;


pub use change::{detect_changes, Baseline, ChangeFlags};
pub use image::{EnvImageSource, ImageSource};

use crate::collaborators::Collaborators;
use crate::error::ReconcileError;
use crate::names::{NCP_BOOTSTRAP_DAEMONSET, NETWORK_NAME, OPERATOR_CONFIG_MAP, OPERATOR_NAMESPACE};
use crate::operator_config::Component;
use crate::probes::Metrics;
use crate::shared_info::SharedInfo;
use crate::status::{StatusLevel, StatusReporter};
use cluster_client::ClusterClientTrait;
use crds::Network;
use kube::api::DynamicObject;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Identifies the object whose event triggered a cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    /// Empty for cluster-scoped objects
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ReconcileRequest {
    /// Request for `namespace/name`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Only the operator ConfigMap and the cluster Network drive cycles.
    pub fn is_relevant(&self) -> bool {
        (self.namespace == OPERATOR_NAMESPACE && self.name == OPERATOR_CONFIG_MAP)
            || (self.namespace.is_empty() && self.name == NETWORK_NAME)
    }

    /// `namespace/name`, used as the backoff key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The request was not for a watched object
    Ignored,
    /// Nothing to apply
    UpToDate,
    /// Objects were applied and changed workloads evicted
    Applied {
        changes: ChangeFlags,
        evicted: Vec<Component>,
    },
}

impl ReconcileOutcome {
    /// Metric label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Ignored => "ignored",
            ReconcileOutcome::UpToDate => "up_to_date",
            ReconcileOutcome::Applied { .. } => "applied",
        }
    }
}

/// Reconciles the managed NCP workloads.
pub struct Reconciler {
    pub(crate) cluster: Box<dyn ClusterClientTrait>,
    pub(crate) collaborators: Collaborators,
    pub(crate) image_source: Box<dyn ImageSource>,
    pub(crate) status: Arc<dyn StatusReporter>,
    pub(crate) shared_info: Arc<SharedInfo>,
    pub(crate) metrics: Arc<Metrics>,
    /// Held for the whole cycle, which serializes cycles.
    baseline: Mutex<Option<Baseline>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("collaborators", &self.collaborators)
            .field("shared_info", &self.shared_info)
            .finish_non_exhaustive()
    }
}

fn find_rendered<'a>(objects: &'a [DynamicObject], kind: &str, name: &str) -> Option<&'a DynamicObject> {
    objects.iter().find(|o| {
        o.types.as_ref().is_some_and(|t| t.kind == kind) && o.metadata.name.as_deref() == Some(name)
    })
}

impl Reconciler {
    /// Engine with no baseline; the first cycle reconstructs it.
    pub fn new(
        cluster: Box<dyn ClusterClientTrait>,
        collaborators: Collaborators,
        image_source: Box<dyn ImageSource>,
        status: Arc<dyn StatusReporter>,
        shared_info: Arc<SharedInfo>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            cluster,
            collaborators,
            image_source,
            status,
            shared_info,
            metrics,
            baseline: Mutex::new(None),
        }
    }

    /// Current baseline, if any.
    #[cfg(test)]
    pub async fn baseline(&self) -> Option<Baseline> {
        self.baseline.lock().await.clone()
    }

    /// Run one full cycle for `request`.
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileOutcome, ReconcileError> {
        if !request.is_relevant() {
            debug!(request = %request, "Ignoring unrelated object");
            return Ok(ReconcileOutcome::Ignored);
        }

        info!(request = %request, "Reconciling operator configuration");
        let mut baseline = self.baseline.lock().await;
        let result = self.run_cycle(&mut baseline).await;
        match &result {
            Ok(outcome) => {
                if let ReconcileOutcome::Applied { changes, evicted } = outcome {
                    info!(ncp = changes.ncp, node_agent = changes.agent, evicted = ?evicted, "Applied configuration");
                }
                info!(request = %request, outcome = outcome.label(), "Reconciliation finished");
                self.metrics.record_reconcile(outcome.label());
            }
            Err(e) => {
                error!(request = %request, error = %e, "Reconciliation failed");
                self.metrics.record_reconcile(e.kind());
            }
        }
        result
    }

    async fn run_cycle(&self, baseline: &mut Option<Baseline>) -> Result<ReconcileOutcome, ReconcileError> {
        let inputs = self.fetch_inputs().await?;
        let network = inputs.network;
        let mut config = inputs.config;

        if let Err(e) = self.collaborators.defaulter.fill_defaults(&mut config, &network.spec) {
            let message = format!("Failed to fill default configurations: {}", e);
            self.status
                .set_degraded(StatusLevel::OperatorConfig, "FillDefaultsError", &message);
            return Err(ReconcileError::ValidationFailure(message));
        }
        if let Err(e) = self.collaborators.defaulter.validate(&config, &network.spec) {
            let message = format!("The operator configuration is invalid: {}", e);
            self.status
                .set_degraded(StatusLevel::OperatorConfig, "InvalidOperatorConfig", &message);
            return Err(ReconcileError::ValidationFailure(message));
        }

        if baseline.is_none() {
            *baseline = self.reconstruct_baseline().await?;
        }

        let mut changes = detect_changes(&config, baseline.as_ref());
        if !changes.any() && self.image_changed().await? {
            changes.ncp = true;
        }

        if !changes.any() {
            info!("No new configuration needs to apply");
            self.repair_network_status(&network).await?;
            self.status.set_not_degraded(StatusLevel::ClusterConfig);
            self.status.set_not_degraded(StatusLevel::OperatorConfig);
            return Ok(ReconcileOutcome::UpToDate);
        }
        info!(ncp = changes.ncp, node_agent = changes.agent, "Configuration changed");

        let image = self.image_source.image();
        let objects = match self.collaborators.renderer.render(&config, image.as_deref()) {
            Ok(objects) => objects,
            Err(e) => {
                let message = format!("Failed to render operator configuration: {}", e);
                self.status
                    .set_degraded(StatusLevel::OperatorConfig, "RenderConfigError", &message);
                return Err(ReconcileError::RenderFailure(message));
            }
        };
        self.publish_render(&objects, &network);

        self.apply_objects(&objects, &network).await?;

        let evicted = match baseline.as_mut() {
            Some(previous) => self.disrupt(changes, &config, previous).await?,
            None => Vec::new(),
        };
        *baseline = Some(Baseline::from_config(&config));
        self.shared_info.publish_applied_config(config);

        self.update_network_status(&network).await?;
        self.status.set_not_degraded(StatusLevel::ClusterConfig);
        self.status.set_not_degraded(StatusLevel::OperatorConfig);
        Ok(ReconcileOutcome::Applied { changes, evicted })
    }

    fn publish_render(&self, objects: &[DynamicObject], network: &Network) {
        self.shared_info.publish_render(
            find_rendered(objects, "DaemonSet", Component::NodeAgent.workload_name()).cloned(),
            find_rendered(objects, "DaemonSet", NCP_BOOTSTRAP_DAEMONSET).cloned(),
            find_rendered(objects, "Deployment", Component::Ncp.workload_name()).cloned(),
            network.clone(),
        );
    }
}
