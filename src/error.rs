//! Error types for the Hardware Lab server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes returned in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    Duplicate = 5,
    BadValue = 6,
    AlreadyPickedUp = 7,
    Expired = 8,
    NoItemsAvailable = 9,
    NotPickedUp = 10,
    AlreadyReturned = 11,
    RequestsClosed = 12,
}

/// Rejected request lifecycle transitions.
///
/// The display strings are the messages shown to hackers and organizers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingError {
    #[error("Request has been picked up already!")]
    AlreadyPickedUp,

    #[error("Request has expired!")]
    Expired,

    #[error("No items available")]
    NoItemsAvailable,

    #[error("Request has not been picked up yet")]
    NotPickedUp,

    #[error("Request has been returned already!")]
    AlreadyReturned,

    #[error("Hardware lab is not available at the moment!")]
    RequestsClosed,
}

impl LendingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LendingError::AlreadyPickedUp => ErrorCode::AlreadyPickedUp,
            LendingError::Expired => ErrorCode::Expired,
            LendingError::NoItemsAvailable => ErrorCode::NoItemsAvailable,
            LendingError::NotPickedUp => ErrorCode::NotPickedUp,
            LendingError::AlreadyReturned => ErrorCode::AlreadyReturned,
            LendingError::RequestsClosed => ErrorCode::RequestsClosed,
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

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Lending(#[from] LendingError),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Lending(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.code(), e.to_string()),
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
