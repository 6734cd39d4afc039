use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use loadpulse_core::error::{ClientCode, LoadpulseError};

/// HTTP wrapper for [`LoadpulseError`].
#[derive(Debug)]
pub struct ApiError(pub LoadpulseError);

impl From<LoadpulseError> for ApiError {
    fn from(e: LoadpulseError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest | ClientCode::UnsupportedVersion => StatusCode::BAD_REQUEST,
            ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "code": self.0.client_code().as_str(),
            "msg": self.0.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
