//! Workload trigger endpoints.
//!
//! - `POST /cpu`  : CPU mode
//! - `POST /io`   : IO mode
//! - `POST /cpui` : mixed mode (`ratio` share of CPU tasks)
//!
//! Each handler blocks until the whole run completes.

pub mod error;
pub mod trigger;

pub use error::ApiError;
