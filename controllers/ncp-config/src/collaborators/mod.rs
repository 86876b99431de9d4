//! Capabilities the reconciliation engine delegates to.
//!
//! The engine only decides what changed and what must be restarted. Turning
//! deployed fragments back into configuration, defaulting and validating it,
//! and rendering manifests are behind these traits so tests can substitute
//! fakes.

mod defaults;
mod generator;
mod render;

pub use defaults::NetworkDefaulter;
pub use generator::FragmentConfigGenerator;
pub use render::DefaultRenderer;

use crate::error::CollaboratorError;
use crate::operator_config::OperatorConfig;
use crds::NetworkSpec;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::DynamicObject;
use std::fmt;

/// Raw configuration fragments currently deployed for the managed workloads
#[derive(Debug, Clone)]
pub struct DeployedFragments {
    /// Deployed `nsx-ncp-config`
    pub ncp_config: ConfigMap,
    /// Deployed `nsx-node-agent-config`
    pub node_agent_config: ConfigMap,
    /// Deployed load-balancer certificate, if any
    pub lb_secret: Option<Secret>,
}

/// Rebuilds operator configuration from what is already deployed.
pub trait ConfigGenerator: Send + Sync {
    fn generate(&self, fragments: &DeployedFragments) -> Result<OperatorConfig, CollaboratorError>;
}

/// Fills unset configuration from the network spec and validates the result.
pub trait ConfigDefaulter: Send + Sync {
    fn fill_defaults(&self, config: &mut OperatorConfig, network: &NetworkSpec) -> Result<(), CollaboratorError>;
    fn validate(&self, config: &OperatorConfig, network: &NetworkSpec) -> Result<(), CollaboratorError>;
}

/// Turns validated configuration into the managed object set, in apply order.
pub trait ManifestRenderer: Send + Sync {
    fn render(&self, config: &OperatorConfig, image: Option<&str>) -> Result<Vec<DynamicObject>, CollaboratorError>;
}

/// The collaborator set used by one reconciler
pub struct Collaborators {
    /// Rebuilds a configuration from deployed fragments
    pub generator: Box<dyn ConfigGenerator>,
    /// Fills defaults and validates
    pub defaulter: Box<dyn ConfigDefaulter>,
    /// Turns a configuration into manifests
    pub renderer: Box<dyn ManifestRenderer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            generator: Box::new(FragmentConfigGenerator),
            defaulter: Box::new(NetworkDefaulter),
            renderer: Box::new(DefaultRenderer),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
