//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dv_adapters::ServiceError;
use serde::Serialize;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found
    NotFound { resource: String, id: String },
    /// Bad request (validation or conversion error)
    BadRequest { message: String },
    /// Internal server error
    Internal { message: String },
}

impl ApiError {
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                format!("{} not found: {}", resource, id),
            ),
            ApiError::BadRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Internal { message } => {
                tracing::error!(error = %message, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error,
            code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Convert { id, source } => ApiError::BadRequest {
                message: format!("deck {id} cannot be converted: {source}"),
            },
            ServiceError::CorruptData { id, message } => ApiError::Internal {
                message: format!("corrupt data for deck {id}: {message}"),
            },
            ServiceError::Storage { message } => ApiError::Internal { message },
            ServiceError::Search(err) => ApiError::Internal {
                message: err.to_string(),
            },
        }
    }
}
