//! Top-level facade crate for loadpulse.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use loadpulse_core::*;
}

pub mod server {
    pub use loadpulse_server::*;
}
