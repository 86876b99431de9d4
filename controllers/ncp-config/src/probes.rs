//! Probe and metrics HTTP server.
//!
//! Provides `/healthz` (liveness), `/readyz` (readiness, after the first
//! completed reconciliation) and `/metrics` (Prometheus text format).

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Reconciliation metrics and readiness flag
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    reconcile_total: IntCounterVec,
    pod_evictions_total: IntCounterVec,
    ready: AtomicBool,
}

impl Metrics {
    /// Register the operator counters in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let reconcile_total = IntCounterVec::new(
            Opts::new("ncp_operator_reconcile_total", "Reconciliation cycles by outcome"),
            &["outcome"],
        )?;
        let pod_evictions_total = IntCounterVec::new(
            Opts::new("ncp_operator_pod_evictions_total", "Workload pod evictions by result"),
            &["component", "result"],
        )?;
        registry.register(Box::new(reconcile_total.clone()))?;
        registry.register(Box::new(pod_evictions_total.clone()))?;

        Ok(Self {
            registry,
            reconcile_total,
            pod_evictions_total,
            ready: AtomicBool::new(false),
        })
    }

    /// Count a finished cycle. Any completed cycle makes the operator ready.
    pub fn record_reconcile(&self, outcome: &str) {
        self.reconcile_total.with_label_values(&[outcome]).inc();
        if !self.ready.swap(true, Ordering::SeqCst) {
            info!("First reconciliation completed, operator ready");
        }
    }

    /// Count one pod eviction attempt for `component`.
    pub fn record_eviction(&self, component: &str, success: bool) {
        let result = if success { "success" } else { "failure" };
        self.pod_evictions_total
            .with_label_values(&[component, result])
            .inc();
    }

    /// Cycles recorded with `outcome`.
    #[cfg(test)]
    pub fn reconcile_count(&self, outcome: &str) -> u64 {
        self.reconcile_total.with_label_values(&[outcome]).get()
    }

    /// Evictions recorded for `component`.
    #[cfg(test)]
    pub fn eviction_count(&self, component: &str, success: bool) -> u64 {
        let result = if success { "success" } else { "failure" };
        self.pod_evictions_total
            .with_label_values(&[component, result])
            .get()
    }

    /// Whether a cycle has finished since startup.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

/// Run the probe server until it fails.
pub async fn run_probe_server(metrics: Arc<Metrics>, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = port, "Probe server listening");
    axum::serve(listener, router(metrics)).await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(metrics): State<Arc<Metrics>>) -> StatusCode {
    if metrics.is_ready() {
        StatusCode::OK
    } else {
        debug!("Readiness probe: NOT READY (no completed reconciliation)");
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_after_first_cycle() {
        let metrics = Arc::new(Metrics::new().unwrap());
        assert_eq!(readyz(State(Arc::clone(&metrics))).await, StatusCode::SERVICE_UNAVAILABLE);

        metrics.record_reconcile("up_to_date");
        assert_eq!(readyz(State(Arc::clone(&metrics))).await, StatusCode::OK);
        assert_eq!(healthz().await, StatusCode::OK);
    }

    #[test]
    fn test_metrics_encoding() {
        let metrics = Metrics::new().unwrap();
        metrics.record_reconcile("applied");
        metrics.record_eviction("nsx-ncp", true);

        let body = metrics.encode().unwrap();
        assert!(body.contains("ncp_operator_reconcile_total{outcome=\"applied\"} 1"));
        assert!(body.contains("ncp_operator_pod_evictions_total{component=\"nsx-ncp\",result=\"success\"} 1"));
        assert_eq!(metrics.eviction_count("nsx-ncp", true), 1);
        assert_eq!(metrics.eviction_count("nsx-node-agent", true), 0);
    }
}
