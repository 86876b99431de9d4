//! Kubernetes resource watchers.
//!
//! The operator ConfigMap and the cluster Network each get a
//! kube_runtime::Controller. Both feed the same reconciler, whose baseline
//! lock serializes their cycles.

use crate::backoff::BackoffRegistry;
use crate::error::{ControllerError, ReconcileError};
use crate::reconciler::{ReconcileRequest, Reconciler};
use crds::Network;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Resource, ResourceExt};
use kube_runtime::{controller::{Action, Config as ControllerConfig}, watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shared by every watcher's reconcile and error-policy callbacks
#[derive(Debug)]
pub struct WatchContext {
    /// Engine shared by both watches
    pub reconciler: Arc<Reconciler>,
    /// Retry delays per object
    pub backoff: BackoffRegistry,
}

fn request_for<K: Resource>(obj: &K) -> ReconcileRequest {
    ReconcileRequest::new(obj.namespace().unwrap_or_default(), obj.name_any())
}

/// Generic watcher helper around kube_runtime::Controller.
///
/// Errors the reconciler marks as not retryable end in `await_change`;
/// the rest requeue through the per-object Fibonacci backoff.
async fn watch_resource<K>(
    api: Api<K>,
    context: Arc<WatchContext>,
    debounce: Duration,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ReconcileError, ctx: Arc<WatchContext>| {
        let request = request_for(obj.as_ref());
        let delay = ctx.backoff.next_delay(&request.key());
        warn!(
            resource = resource_name,
            request = %request,
            error = %error,
            "Reconciliation will be retried in {}s",
            delay.as_secs()
        );
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<WatchContext>| async move {
        let request = request_for(obj.as_ref());
        debug!(resource = resource_name, request = %request, "Reconciling");

        match ctx.reconciler.reconcile(&request).await {
            Ok(_) => {
                ctx.backoff.reset(&request.key());
                Ok(Action::await_change())
            }
            Err(e) if !e.requeue() => {
                ctx.backoff.reset(&request.key());
                Ok(Action::await_change())
            }
            Err(e) => Err(e),
        }
    };

    // One cycle at a time per watcher; debounce batches bursts of events.
    let controller_config = ControllerConfig::default()
        .debounce(debounce)
        .concurrency(1);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, context)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, _)) => debug!(resource = resource_name, object = ?obj_ref, "Reconciled"),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    Ok(())
}

/// Watches the operator's inputs.
#[derive(Debug)]
pub struct Watcher {
    context: Arc<WatchContext>,
    config_map_api: Api<ConfigMap>,
    network_api: Api<Network>,
    debounce: Duration,
}

impl Watcher {
    /// Watcher over operator ConfigMaps and Network objects.
    pub fn new(
        context: Arc<WatchContext>,
        config_map_api: Api<ConfigMap>,
        network_api: Api<Network>,
        debounce: Duration,
    ) -> Self {
        Self {
            context,
            config_map_api,
            network_api,
            debounce,
        }
    }

    /// Watches ConfigMaps in the operator namespace.
    pub async fn watch_operator_config_maps(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.config_map_api.clone(),
            Arc::clone(&self.context),
            self.debounce,
            "ConfigMap",
        )
        .await
    }

    /// Watches cluster-scoped Network objects.
    pub async fn watch_networks(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.network_api.clone(),
            Arc::clone(&self.context),
            self.debounce,
            "Network",
        )
        .await
    }
}
