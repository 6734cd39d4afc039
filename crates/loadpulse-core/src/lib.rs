//! loadpulse core: transport-agnostic workload request types and errors.
//!
//! This crate defines the request model and error surface shared by the
//! server and any tooling that drives it. It intentionally carries no
//! transport or runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed trigger bodies surface as `LoadpulseError::BadRequest` instead of
//! taking the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod workload;

/// Shared result type.
pub use error::{Result, LoadpulseError};
pub use workload::{WorkloadMode, WorkloadRequest};
