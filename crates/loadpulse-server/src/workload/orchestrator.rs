//! Benchmark orchestrator: turns a validated trigger into worker loop runs.
//!
//! By default exactly one loop runs with `floor(ops / workers)` operations;
//! the `workers` value only shapes that division. Setting `fan_out` runs
//! up to `workers` loops concurrently instead, never more loops than ops.

use std::time::Instant;

use futures_util::future::join_all;

use loadpulse_core::WorkloadRequest;

use crate::workload::worker::{Worker, WorkerReport};

#[derive(Clone)]
pub struct Orchestrator {
    worker: Worker,
    fan_out: bool,
}

impl Orchestrator {
    pub fn new(worker: Worker, fan_out: bool) -> Self {
        Self { worker, fan_out }
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// `(loops, ops per loop)` for a request.
    ///
    /// Fan-out is capped at `ops` loops so a huge `workers` value cannot
    /// schedule loops that would run zero operations.
    pub fn plan(&self, req: &WorkloadRequest) -> (u64, u64) {
        if self.fan_out {
            let loops = req.workers.min(req.ops).max(1);
            (loops, req.ops / loops)
        } else {
            (1, req.ops_per_worker())
        }
    }

    /// Run the benchmark and return once every loop has finished.
    pub async fn run(&self, req: &WorkloadRequest) -> Vec<WorkerReport> {
        let (loops, per_loop) = self.plan(req);
        let started = Instant::now();

        let reports = if loops > 1 {
            let runs = (0..loops).map(|_| self.worker.run(req.mode, per_loop, req.ratio));
            join_all(runs).await
        } else {
            vec![self.worker.run(req.mode, per_loop, req.ratio).await]
        };

        let executed: u64 = reports.iter().map(|r| r.ops).sum();
        tracing::info!(
            mode = %req.mode,
            workers = req.workers,
            requested_ops = req.ops,
            executed_ops = executed,
            loops = reports.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "benchmark completed"
        );
        reports
    }
}
