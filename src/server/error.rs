use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::types::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Malformed increment: {0}")]
    MalformedPayload(#[from] JsonRejection),
    #[error("seconds must be at most {max}, got {got}")]
    ImplausibleSeconds { got: u64, max: u64 },
    #[error("Unknown user {0:?}")]
    UnknownUser(String),
    #[error("Failed to persist aggregates: {0:#}")]
    Persistence(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedPayload(rejection) => rejection.status(),
            ApiError::ImplausibleSeconds { .. } => StatusCode::BAD_REQUEST,
            ApiError::UnknownUser(_) => StatusCode::NOT_FOUND,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, "Rejecting request: {self}");
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
