//! Shared application state for the loadpulse server.
//!
//! One metric registry is created per state and injected into the worker,
//! so both routers and every concurrent run observe the same instruments.

use std::sync::Arc;

use crate::config::LoadpulseConfig;
use crate::obs::{ProcessCollector, WorkloadMetrics};
use crate::workload::{Orchestrator, Worker};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    orchestrator: Orchestrator,
}

struct AppStateInner {
    metrics: Arc<WorkloadMetrics>,
    process: ProcessCollector,
}

impl AppState {
    /// Build application state from an already validated config.
    pub fn new(cfg: &LoadpulseConfig) -> Self {
        let metrics = Arc::new(WorkloadMetrics::new());
        let worker = Worker::new(Arc::clone(&metrics), cfg.workload.worker_settings());
        let orchestrator = Orchestrator::new(worker, cfg.orchestrator.fan_out);

        if cfg.orchestrator.fan_out {
            tracing::info!("orchestrator fan-out enabled: up to one worker loop per requested worker");
        }

        Self {
            inner: Arc::new(AppStateInner {
                metrics,
                process: ProcessCollector::new(),
            }),
            orchestrator,
        }
    }

    pub fn metrics(&self) -> &WorkloadMetrics {
        &self.inner.metrics
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Default process metrics, read at call time.
    pub fn metrics_extra(&self) -> Vec<(&'static str, &'static str, f64)> {
        self.inner.process.collect()
    }
}
