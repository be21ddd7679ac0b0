use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::forecast::ForecastError;

/// Errors returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { kind: &'static str, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest { kind, .. } => *kind,
            ApiError::NotFound(_) => "not_found",
            ApiError::Upstream(_) => "upstream_read",
            ApiError::Internal(_) => "internal",
        }
    }

    fn bad_request(kind: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            kind,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error = match &self {
            ApiError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "An internal error occurred".to_string()
            }
            ApiError::Upstream(_) => {
                tracing::error!(error = %self, "upstream read failed");
                self.to_string()
            }
            _ => {
                tracing::debug!(error = %self, "client error");
                self.to_string()
            }
        };

        (
            status,
            Json(ErrorResponse {
                error,
                kind: self.kind(),
            }),
        )
            .into_response()
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::InsufficientData { .. } => ApiError::bad_request("insufficient_data", err.to_string()),
            ForecastError::InvalidInput(_) => ApiError::bad_request("invalid_input", err.to_string()),
            ForecastError::SiteNotFound(_) => ApiError::NotFound(err.to_string()),
            ForecastError::UpstreamRead { .. } => ApiError::Upstream(err.to_string()),
            ForecastError::PersistenceWrite { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("invalid_input", rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::bad_request("validation", errors.to_string())
    }
}
