//! NCP image drift detection.

use super::Reconciler;
use crate::error::ReconcileError;
use crate::names::{NCP_DEPLOYMENT, NCP_IMAGE_ENV, NSX_NAMESPACE};
use crate::status::StatusLevel;
use tracing::{debug, info};

/// Where the configured NCP image comes from
pub trait ImageSource: Send + Sync {
    fn image(&self) -> Option<String>;
}

/// Reads the image from the environment on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvImageSource;

impl ImageSource for EnvImageSource {
    fn image(&self) -> Option<String> {
        std::env::var(NCP_IMAGE_ENV).ok().filter(|v| !v.trim().is_empty())
    }
}

impl Reconciler {
    /// Whether the running NCP deployment uses a different image than the
    /// configured one. A missing deployment or one without containers counts
    /// as changed.
    pub(crate) async fn image_changed(&self) -> Result<bool, ReconcileError> {
        let deployment = match self.cluster.get_deployment(NSX_NAMESPACE, NCP_DEPLOYMENT).await {
            Ok(deployment) => deployment,
            Err(e) if e.is_not_found() => {
                info!(deployment = NCP_DEPLOYMENT, "NCP deployment not found, treating image as changed");
                return Ok(true);
            }
            Err(e) => {
                let message = format!("Failed to get deployment {}: {}", NCP_DEPLOYMENT, e);
                self.status
                    .set_degraded(StatusLevel::OperatorConfig, "NcpImageCheckError", &message);
                return Err(ReconcileError::ReadFailure(message));
            }
        };

        let running = deployment
            .spec
            .and_then(|spec| spec.template.spec)
            .and_then(|pod| pod.containers.into_iter().next())
            .map(|container| container.image);
        let Some(running) = running else {
            info!(deployment = NCP_DEPLOYMENT, "NCP deployment has no containers, treating image as changed");
            return Ok(true);
        };

        let configured = self.image_source.image();
        let changed = running != configured;
        if changed {
            info!(
                running = running.as_deref().unwrap_or_default(),
                configured = configured.as_deref().unwrap_or_default(),
                "NCP image changed"
            );
        } else {
            debug!("NCP image unchanged");
        }
        Ok(changed)
    }
}
