//! API error type: every failure leaving a handler is a JSON `{error, message}`
//! body with a mapped HTTP status.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::openai::GenerateError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or malformed X-User-Id header")]
    Unauthenticated,

    #[error("invalid request body: {0}")]
    BadRequest(#[from] JsonRejection),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(rejection) => rejection.status(),
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(
                StoreError::UnknownId { .. } | StoreError::DuplicateId { .. } | StoreError::DuplicateLanguage { .. },
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Generate(GenerateError::Disabled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Generate(GenerateError::UnknownLanguages(_)) => StatusCode::BAD_REQUEST,
            ApiError::Generate(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::BadRequest(_) => "invalid_body",
            ApiError::Store(StoreError::NotFound(_)) => "not_found",
            ApiError::Store(StoreError::UnknownId { .. }) => "unknown_id",
            ApiError::Store(StoreError::DuplicateId { .. }) => "duplicate_id",
            ApiError::Store(StoreError::DuplicateLanguage { .. }) => "duplicate_language",
            ApiError::Generate(GenerateError::Disabled) => "generation_disabled",
            ApiError::Generate(GenerateError::UnknownLanguages(_)) => "unknown_language",
            ApiError::Generate(_) => "generation_failed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(target: "quizsmith_backend", %status, error = %self, "Request failed");
        } else {
            warn!(target: "quizsmith_backend", %status, error = %self, "Request rejected");
        }
        let body = ErrorOut { error: self.code(), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
