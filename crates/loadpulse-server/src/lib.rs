//! loadpulse server library entry.
//!
//! This crate wires the workload engine (task primitives, worker loop,
//! orchestrator), the metric registry, and the two HTTP surfaces into one
//! server. It is consumed by the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod workload;
