//! Centralized error handling module
//!
//! Provides unified error types and HTTP response mapping for the entire application.
//! Only I/O-adjacent collaborators raise errors; the cadence, classification,
//! aggregation and ranking functions are total.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Application-wide error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Aircraft registry or check log could not be read or written
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Ambient temperature fetch failed
    #[error("Weather fetch error: {0}")]
    WeatherFetch(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Standardized error response format
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Unique correlation ID for tracing
    pub correlation_id: String,
    /// Error type classification
    pub error_type: String,
    /// Human-readable error message (safe for clients)
    pub message: String,
    /// HTTP status code
    pub status_code: u16,
    /// Timestamp of the error
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str, status_code: StatusCode) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            error_type: error_type.to_string(),
            message: message.to_string(),
            status_code: status_code.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error_type, message) = match self {
            AppError::DataSource(msg) => ("DATA_SOURCE_ERROR", msg.as_str()),
            AppError::WeatherFetch(msg) => ("WEATHER_FETCH_ERROR", msg.as_str()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.as_str()),
            AppError::Internal(msg) => {
                // Log internal errors but return safe message to client
                error!(error = %msg, "Internal server error occurred");
                ("INTERNAL_ERROR", "An internal error occurred")
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg.as_str()),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg.as_str()),
        };

        let error_response = ErrorResponse::new(error_type, message, status);

        error!(
            correlation_id = %error_response.correlation_id,
            error_type = %error_type,
            status_code = %status.as_u16(),
            "Error response generated"
        );

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DataSource(_) => StatusCode::BAD_GATEWAY,
            AppError::WeatherFetch(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::WeatherFetch(err.to_string())
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
