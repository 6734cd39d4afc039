//! Worker loop: run N sequential operations of one mode and record each one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use loadpulse_core::WorkloadMode;

use crate::obs::alloc::heap_used_kb;
use crate::obs::WorkloadMetrics;
use crate::workload::tasks::TaskProfile;

/// Default number of iterations between cooperative yields.
pub const DEFAULT_YIELD_EVERY: u64 = 1000;

/// Primitive chosen for a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Cpu,
    Io,
}

/// Dispatch rule: `cpu` and `io` are fixed, `mixed` runs CPU when a uniform
/// draw in `[0, 1)` is below `ratio`.
pub fn pick_task<R: Rng + ?Sized>(mode: WorkloadMode, ratio: f64, rng: &mut R) -> TaskKind {
    match mode {
        WorkloadMode::Cpu => TaskKind::Cpu,
        WorkloadMode::Io => TaskKind::Io,
        WorkloadMode::Mixed => {
            if rng.random::<f64>() < ratio {
                TaskKind::Cpu
            } else {
                TaskKind::Io
            }
        }
    }
}

/// Yield on iterations where `i % every == 1` (every iteration when `every == 1`).
fn is_yield_point(i: u64, every: u64) -> bool {
    i % every == 1 % every
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub profile: TaskProfile,
    pub yield_every: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            profile: TaskProfile::default(),
            yield_every: DEFAULT_YIELD_EVERY,
        }
    }
}

/// Summary of one completed loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerReport {
    pub ops: u64,
    pub cpu_ops: u64,
    pub io_ops: u64,
    pub elapsed: Duration,
}

/// Keeps the in-flight gauge honest even if the run future is dropped.
struct InFlight<'a> {
    metrics: &'a WorkloadMetrics,
    label: &'static str,
}

impl<'a> InFlight<'a> {
    fn enter(metrics: &'a WorkloadMetrics, label: &'static str) -> Self {
        metrics.runs_in_flight.inc(&[("type", label)]);
        Self { metrics, label }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.metrics.runs_in_flight.dec(&[("type", self.label)]);
    }
}

/// Executes worker loops against a shared metric registry.
#[derive(Clone)]
pub struct Worker {
    metrics: Arc<WorkloadMetrics>,
    settings: Arc<WorkerSettings>,
}

impl Worker {
    pub fn new(metrics: Arc<WorkloadMetrics>, settings: WorkerSettings) -> Self {
        Self {
            metrics,
            settings: Arc::new(settings),
        }
    }

    pub fn metrics(&self) -> &Arc<WorkloadMetrics> {
        &self.metrics
    }

    /// Run `ops` operations sequentially.
    ///
    /// Every iteration is counted and its latency observed under `{mode}_node`
    /// as soon as it finishes, so an interrupted run leaves its partial counts
    /// behind. One heap sample is recorded after the loop.
    ///
    /// The yield is a scheduling hint only: a CPU primitive still holds the
    /// thread until its spin ends.
    pub async fn run(&self, mode: WorkloadMode, ops: u64, ratio: f64) -> WorkerReport {
        let label = mode.label();
        let profile = &self.settings.profile;
        let _in_flight = InFlight::enter(&self.metrics, label);

        let mut report = WorkerReport { ops, ..Default::default() };
        let run_start = Instant::now();

        for i in 0..ops {
            let t0 = Instant::now();

            let kind = pick_task(mode, ratio, &mut rand::rng());
            match kind {
                TaskKind::Cpu => {
                    profile.run_cpu();
                    report.cpu_ops += 1;
                }
                TaskKind::Io => {
                    profile.run_io().await;
                    report.io_ops += 1;
                }
            }

            self.metrics.record_op(label, t0.elapsed().as_secs_f64());

            if is_yield_point(i, self.settings.yield_every) {
                tokio::task::yield_now().await;
            }
        }

        self.metrics.record_heap(label, heap_used_kb());
        report.elapsed = run_start.elapsed();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::workload::tasks::CpuTaskKind;

    fn worker() -> Worker {
        Worker::new(Arc::new(WorkloadMetrics::new()), WorkerSettings::default())
    }

    fn fixed_worker() -> Worker {
        let settings = WorkerSettings {
            profile: TaskProfile {
                cpu_task: CpuTaskKind::Fixed,
                fixed_iterations: 1_000,
                ..TaskProfile::default()
            },
            ..WorkerSettings::default()
        };
        Worker::new(Arc::new(WorkloadMetrics::new()), settings)
    }

    #[test]
    fn yield_points_match_modulo_rule() {
        let hits: Vec<u64> = (0..3000).filter(|i| is_yield_point(*i, 1000)).collect();
        assert_eq!(hits, vec![1, 1001, 2001]);
        assert!((0..10).all(|i| is_yield_point(i, 1)));
    }

    #[test]
    fn mixed_ratio_converges() {
        let mut rng = StdRng::seed_from_u64(7);
        for ratio in [0.0, 0.2, 0.5, 0.9, 1.0] {
            let n = 20_000;
            let cpu = (0..n)
                .filter(|_| pick_task(WorkloadMode::Mixed, ratio, &mut rng) == TaskKind::Cpu)
                .count();
            let frac = cpu as f64 / n as f64;
            assert!((frac - ratio).abs() < 0.05, "ratio={ratio} frac={frac}");
        }
    }

    #[test]
    fn fixed_modes_ignore_ratio() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_task(WorkloadMode::Cpu, 0.0, &mut rng), TaskKind::Cpu);
        assert_eq!(pick_task(WorkloadMode::Io, 1.0, &mut rng), TaskKind::Io);
    }

    #[tokio::test]
    async fn cpu_run_records_every_op() {
        let w = worker();
        let report = w.run(WorkloadMode::Cpu, 40, 0.5).await;
        assert_eq!(report.cpu_ops, 40);

        let l = [("type", "cpu_node")];
        assert_eq!(w.metrics().ops.get(&l), 40);
        let lat = w.metrics().latency.snapshot(&l).unwrap();
        assert_eq!(lat.count, 40);
        // every op spun at least 2.5ms
        assert_eq!(lat.buckets[0], 0);
        assert!(lat.sum >= 40.0 * 0.0025);
        assert_eq!(w.metrics().heap.snapshot(&l).unwrap().count, 1);
        assert_eq!(w.metrics().runs_in_flight.get(&l), 0);
    }

    #[tokio::test]
    async fn io_run_waits_each_op() {
        let w = worker();
        let report = w.run(WorkloadMode::Io, 20, 0.5).await;
        assert_eq!(report.io_ops, 20);
        assert!(report.elapsed >= Duration::from_millis(50));

        let lat = w.metrics().latency.snapshot(&[("type", "io_node")]).unwrap();
        assert_eq!(lat.count, 20);
        assert_eq!(lat.buckets[0], 0);
        assert!(w.metrics().latency.snapshot(&[("type", "cpu_node")]).is_none());
    }

    #[tokio::test]
    async fn mixed_extremes_pick_one_primitive() {
        let w = worker();
        let all_io = w.run(WorkloadMode::Mixed, 10, 0.0).await;
        assert_eq!((all_io.cpu_ops, all_io.io_ops), (0, 10));
        let all_cpu = w.run(WorkloadMode::Mixed, 10, 1.0).await;
        assert_eq!((all_cpu.cpu_ops, all_cpu.io_ops), (10, 0));

        let l = [("type", "mixed_node")];
        assert_eq!(w.metrics().ops.get(&l), 20);
        assert_eq!(w.metrics().heap.snapshot(&l).unwrap().count, 2);
    }

    #[tokio::test]
    async fn zero_ops_still_samples_heap() {
        let w = worker();
        let report = w.run(WorkloadMode::Io, 0, 0.5).await;
        assert_eq!(report.ops, 0);
        let l = [("type", "io_node")];
        assert_eq!(w.metrics().ops.get(&l), 0);
        assert_eq!(w.metrics().heap.snapshot(&l).unwrap().count, 1);
    }

    #[tokio::test]
    async fn concurrent_runs_share_the_registry() {
        let w = worker();
        let (a, b) = tokio::join!(
            w.run(WorkloadMode::Io, 15, 0.5),
            w.run(WorkloadMode::Io, 25, 0.5)
        );
        assert_eq!(a.ops + b.ops, 40);
        let l = [("type", "io_node")];
        assert_eq!(w.metrics().ops.get(&l), 40);
        assert_eq!(w.metrics().latency.snapshot(&l).unwrap().count, 40);
        assert_eq!(w.metrics().heap.snapshot(&l).unwrap().count, 2);
    }

    #[tokio::test]
    async fn fixed_profile_backs_cpu_dispatch() {
        let w = fixed_worker();
        let report = w.run(WorkloadMode::Cpu, 30, 0.5).await;
        assert_eq!((report.cpu_ops, report.io_ops), (30, 0));

        let l = [("type", "cpu_node")];
        assert_eq!(w.metrics().ops.get(&l), 30);
        assert_eq!(w.metrics().latency.snapshot(&l).unwrap().count, 30);
        assert_eq!(w.metrics().heap.snapshot(&l).unwrap().count, 1);
    }

    #[tokio::test]
    async fn fixed_profile_backs_mixed_cpu_branch() {
        let w = fixed_worker();
        let report = w.run(WorkloadMode::Mixed, 30, 1.0).await;
        assert_eq!((report.cpu_ops, report.io_ops), (30, 0));

        let l = [("type", "mixed_node")];
        assert_eq!(w.metrics().ops.get(&l), 30);
        assert_eq!(w.metrics().latency.snapshot(&l).unwrap().count, 30);
        assert_eq!(w.metrics().ops.get(&[("type", "cpu_node")]), 0);
    }
}
