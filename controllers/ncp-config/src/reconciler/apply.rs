//! Applies the rendered object set with ownership on the cluster Network.

use super::Reconciler;
use crate::error::ReconcileError;
use crate::status::StatusLevel;
use crds::Network;
use kube::api::DynamicObject;
use kube::Resource;
use tracing::{error, info};

fn describe(object: &DynamicObject) -> String {
    let kind = object.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("object");
    match (object.metadata.namespace.as_deref(), object.metadata.name.as_deref()) {
        (Some(ns), Some(name)) => format!("{} {}/{}", kind, ns, name),
        (None, Some(name)) => format!("{} {}", kind, name),
        _ => format!("{} <unnamed>", kind),
    }
}

impl Reconciler {
    /// Sets the Network as controller owner of every object and applies them
    /// in order. Stops at the first failure.
    pub(crate) async fn apply_objects(&self, objects: &[DynamicObject], network: &Network) -> Result<(), ReconcileError> {
        let Some(owner) = network.controller_owner_ref(&()) else {
            let message = "could not set owner reference: Network is missing name or uid".to_string();
            self.status
                .set_degraded(StatusLevel::OperatorConfig, "ApplyObjectsError", &format!("Failed to apply objects: {}", message));
            return Err(ReconcileError::ApplyFailure(message));
        };

        for object in objects {
            let mut object = object.clone();
            object.metadata.owner_references = Some(vec![owner.clone()]);

            if let Err(e) = self.cluster.apply_object(&object).await {
                let what = describe(&object);
                error!(object = %what, error = %e, "Could not apply object");
                self.status.set_degraded(
                    StatusLevel::OperatorConfig,
                    "ApplyOperatorConfig",
                    &format!("Failed to apply operator configuration: {}", e),
                );
                return Err(ReconcileError::ApplyFailure(format!("{}: {}", what, e)));
            }
        }
        info!(count = objects.len(), "Applied rendered objects");
        Ok(())
    }
}
