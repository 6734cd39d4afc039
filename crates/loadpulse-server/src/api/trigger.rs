use axum::{body::Bytes, extract::State};

use loadpulse_core::{WorkloadMode, WorkloadRequest};

use crate::api::ApiError;
use crate::app_state::AppState;

pub async fn cpu(State(app): State<AppState>, body: Bytes) -> Result<String, ApiError> {
    trigger(&app, WorkloadMode::Cpu, &body).await
}

pub async fn io(State(app): State<AppState>, body: Bytes) -> Result<String, ApiError> {
    trigger(&app, WorkloadMode::Io, &body).await
}

pub async fn cpui(State(app): State<AppState>, body: Bytes) -> Result<String, ApiError> {
    trigger(&app, WorkloadMode::Mixed, &body).await
}

/// Parse, run to completion, then confirm. Nothing is recorded for a bad body.
async fn trigger(app: &AppState, mode: WorkloadMode, body: &[u8]) -> Result<String, ApiError> {
    let req = match WorkloadRequest::from_json(mode, body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(%mode, error = %e, "rejected workload trigger");
            app.metrics().rejected_requests.inc(&[("type", mode.label())]);
            return Err(e.into());
        }
    };

    app.orchestrator().run(&req).await;
    Ok(req.confirmation())
}
