//! Main controller implementation.
//!
//! Builds the reconciler, starts the ConfigMap and Network watchers and the
//! probe server, and runs until one of them exits.

use crate::backoff::BackoffRegistry;
use crate::collaborators::Collaborators;
use crate::config::OperatorSettings;
use crate::error::ControllerError;
use crate::names::{FIELD_MANAGER, OPERATOR_NAMESPACE};
use crate::probes::{run_probe_server, Metrics};
use crate::reconciler::{EnvImageSource, Reconciler};
use crate::shared_info::SharedInfo;
use crate::status::StatusManager;
use crate::watcher::{WatchContext, Watcher};
use cluster_client::KubeClusterClient;
use crds::Network;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for the NCP operator configuration.
#[derive(Debug)]
pub struct Controller {
    config_map_watcher: JoinHandle<Result<(), ControllerError>>,
    network_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<std::io::Result<()>>,
    shared_info: Arc<SharedInfo>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(settings: OperatorSettings) -> Result<Self, ControllerError> {
        info!("Initializing NCP operator config controller");

        let kube_client = Client::try_default().await?;

        let metrics = Arc::new(
            Metrics::new().map_err(|e| ControllerError::InvalidConfig(format!("metrics registry: {}", e)))?,
        );
        let shared_info = Arc::new(SharedInfo::new());
        let reconciler = Reconciler::new(
            Box::new(KubeClusterClient::new(kube_client.clone(), FIELD_MANAGER)),
            Collaborators::default(),
            Box::new(EnvImageSource),
            Arc::new(StatusManager::new()),
            Arc::clone(&shared_info),
            Arc::clone(&metrics),
        );
        let context = Arc::new(WatchContext {
            reconciler: Arc::new(reconciler),
            backoff: BackoffRegistry::new(settings.backoff_min_secs, settings.backoff_max_secs),
        });

        let config_map_api: Api<ConfigMap> = Api::namespaced(kube_client.clone(), OPERATOR_NAMESPACE);
        let network_api: Api<Network> = Api::all(kube_client);
        let watcher = Arc::new(Watcher::new(context, config_map_api, network_api, settings.debounce));

        let config_map_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_operator_config_maps().await })
        };
        let network_watcher = tokio::spawn(async move { watcher.watch_networks().await });
        let probe_server = tokio::spawn(run_probe_server(metrics, settings.probe_port));

        Ok(Self {
            config_map_watcher,
            network_watcher,
            probe_server,
            shared_info,
        })
    }

    /// State published for other controllers of the operator.
    pub fn shared_info(&self) -> Arc<SharedInfo> {
        Arc::clone(&self.shared_info)
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("NCP operator config controller running");

        // Wait for any task to exit (they should run forever)
        tokio::select! {
            result = &mut self.config_map_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("ConfigMap watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("ConfigMap watcher error: {}", e)))?;
            }
            result = &mut self.network_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Network watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Network watcher error: {}", e)))?;
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}
