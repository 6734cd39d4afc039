//! Synthetic task primitives.
//!
//! None of these do real work. The CPU tasks burn a core, the IO task parks
//! the calling task on the timer. Callers only observe elapsed wall time.

use std::hint::black_box;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Deserialize;

/// Values the fixed CPU task draws from.
pub const FIXED_VALUES: [f64; 10] = [
    100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0, 900.0, 1000.0,
];

/// Which CPU primitive backs the `cpu` dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuTaskKind {
    /// Busy-spin for a random target duration.
    #[default]
    Variable,
    /// Constant iteration count, duration depends on host speed.
    Fixed,
}

/// Timing parameters for the task primitives.
#[derive(Debug, Clone)]
pub struct TaskProfile {
    pub cpu_task: CpuTaskKind,
    pub cpu_min: Duration,
    pub cpu_max: Duration,
    pub io_delay: Duration,
    pub fixed_iterations: u64,
}

impl Default for TaskProfile {
    fn default() -> Self {
        Self {
            cpu_task: CpuTaskKind::Variable,
            cpu_min: Duration::from_micros(2_500),
            cpu_max: Duration::from_micros(5_000),
            io_delay: Duration::from_micros(2_500),
            fixed_iterations: 1_000_000,
        }
    }
}

impl TaskProfile {
    /// Run whichever CPU primitive this profile selects.
    pub fn run_cpu(&self) {
        match self.cpu_task {
            CpuTaskKind::Variable => {
                variable_cpu_task(self.cpu_min, self.cpu_max);
            }
            CpuTaskKind::Fixed => {
                fixed_cpu_task(self.fixed_iterations);
            }
        }
    }

    pub async fn run_io(&self) {
        io_task(self.io_delay).await;
    }
}

/// Busy-spin on floating point work until a target drawn uniformly from
/// `[min, max]` has elapsed. Returns the target.
///
/// Never returns early. There is no upper bound: a preempted thread overshoots.
pub fn variable_cpu_task(min: Duration, max: Duration) -> Duration {
    let mut rng = rand::rng();
    let target = if max > min {
        Duration::from_nanos(rng.random_range(min.as_nanos() as u64..=max.as_nanos() as u64))
    } else {
        min
    };

    let start = Instant::now();
    let mut x = 0.0f64;
    while start.elapsed() < target {
        x += (rng.random::<f64>() * 1000.0).sqrt();
    }
    black_box(x);
    target
}

/// `iterations` square roots over values picked (with replacement) from
/// [`FIXED_VALUES`]. Returns the accumulated sum.
pub fn fixed_cpu_task(iterations: u64) -> f64 {
    let mut rng = rand::rng();
    let mut x = 0.0f64;
    for _ in 0..iterations {
        let r = FIXED_VALUES[rng.random_range(0..FIXED_VALUES.len())];
        x += r.sqrt();
    }
    black_box(x)
}

/// Suspend the calling task without holding the thread.
pub async fn io_task(delay: Duration) {
    tokio::time::sleep(delay).await;
}
