//! Axum router wiring.
//!
//! The trigger API and the metrics exposition listen on separate ports, so
//! they are built as two routers over the same state.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{api::trigger, app_state::AppState, ops};

pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/cpu", post(trigger::cpu))
        .route("/io", post(trigger::io))
        .route("/cpui", post(trigger::cpui))
        .route("/healthz", get(ops::healthz))
        .with_state(state)
}

pub fn build_metrics_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .with_state(state)
}
