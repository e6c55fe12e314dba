//! Error types for Gearloan server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 5,
    StockUnavailable = 7,
    BadValue = 18,
    MalformedPayload = 30,
    MissingFields = 31,
    RuleViolation = 32,
    ScanStoreFailure = 33,
}

impl ErrorCode {
    pub fn from_u32(code: u32) -> Self {
        match code {
            0 => ErrorCode::Success,
            2 => ErrorCode::NotAuthorized,
            3 => ErrorCode::DbFailure,
            5 => ErrorCode::NotFound,
            7 => ErrorCode::StockUnavailable,
            18 => ErrorCode::BadValue,
            30 => ErrorCode::MalformedPayload,
            31 => ErrorCode::MissingFields,
            32 => ErrorCode::RuleViolation,
            33 => ErrorCode::ScanStoreFailure,
            _ => ErrorCode::Failure,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing fields: {0}")]
    MissingFields(String),

    #[error("Stock unavailable: {0}")]
    StockUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Scan status store error: {0}")]
    ScanStore(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code and wire error code for this error
    fn classify(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, ErrorCode::MalformedPayload),
            AppError::MissingFields(_) => (StatusCode::BAD_REQUEST, ErrorCode::MissingFields),
            AppError::StockUnavailable(_) => (StatusCode::CONFLICT, ErrorCode::StockUnavailable),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::ScanStore(_) => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ScanStoreFailure),
            AppError::BusinessRule(_) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::RuleViolation),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }

    /// Rebuild an error from a response body received over HTTP
    pub fn from_response(status: u16, body: ErrorResponse) -> Self {
        let message = body.message;
        match ErrorCode::from_u32(body.code) {
            ErrorCode::NotAuthorized if status == 403 => AppError::Authorization(message),
            ErrorCode::NotAuthorized => AppError::Authentication(message),
            ErrorCode::NotFound => AppError::NotFound(message),
            ErrorCode::BadValue => AppError::Validation(message),
            ErrorCode::MalformedPayload => AppError::MalformedPayload(message),
            ErrorCode::MissingFields => AppError::MissingFields(message),
            ErrorCode::StockUnavailable => AppError::StockUnavailable(message),
            ErrorCode::RuleViolation => AppError::BusinessRule(message),
            ErrorCode::ScanStoreFailure => AppError::ScanStore(message),
            ErrorCode::Success | ErrorCode::Failure | ErrorCode::DbFailure => {
                AppError::Internal(format!("HTTP {}: {}", status, message))
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        let message = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::ScanStore(msg) => {
                tracing::error!("Scan status store error: {}", msg);
                "Scan status store unavailable".to_string()
            }
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::MalformedPayload(msg)
            | AppError::MissingFields(msg)
            | AppError::StockUnavailable(msg)
            | AppError::BusinessRule(msg) => msg,
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
