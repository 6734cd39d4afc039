//! In-process observability.
//!
//! Workload metrics are stored as atomics and rendered by the `/metrics`
//! handler together with a handful of default process metrics.

pub mod alloc;
pub mod metrics;
pub mod process;

pub use metrics::WorkloadMetrics;
pub use process::ProcessCollector;
