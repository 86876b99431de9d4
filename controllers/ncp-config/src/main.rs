//! NCP Operator Config Controller
//!
//! Keeps the NSX container plugin workloads aligned with the operator
//! ConfigMap (`nsx-system-operator/nsx-ncp-operator-config`) and the
//! cluster Network object:
//! - renders and applies the NCP deployment, bootstrap and node-agent daemonsets
//! - restarts only the workloads whose effective configuration changed
//! - mirrors the Network spec into its status

mod backoff;
mod collaborators;
mod config;
mod controller;
mod error;
mod names;
mod operator_config;
mod probes;
mod reconciler;
mod shared_info;
mod status;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::OperatorSettings;
use controller::Controller;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube uses rustls; pick the ring provider before any client is built
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting NCP operator config controller");

    let settings = OperatorSettings::from_env()?;
    info!("Configuration:");
    info!("  NCP image: {}", settings.ncp_image);
    info!("  Probe port: {}", settings.probe_port);
    info!("  Debounce: {}s", settings.debounce.as_secs());
    info!("  Backoff: {}s..{}s", settings.backoff_min_secs, settings.backoff_max_secs);

    let controller = Controller::new(settings).await?;

    let shared_info = controller.shared_info();
    let mut updates = shared_info.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = shared_info.snapshot();
            debug!(
                generation = snapshot.generation,
                ncp_deployment = snapshot.ncp_deployment.is_some(),
                node_agent = snapshot.node_agent_daemon_set.is_some(),
                bootstrap = snapshot.bootstrap_daemon_set.is_some(),
                network = snapshot.network_config.is_some(),
                operator_config = snapshot.operator_config.is_some(),
                "Shared state published"
            );
        }
    });
    controller.run().await?;

    Ok(())
}
