//! Workload execution engine: task primitives, worker loop, orchestrator.

pub mod orchestrator;
pub mod tasks;
pub mod worker;

pub use orchestrator::Orchestrator;
pub use tasks::{CpuTaskKind, TaskProfile};
pub use worker::{Worker, WorkerReport, WorkerSettings};
