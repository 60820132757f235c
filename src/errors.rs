use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Expected {expected} document bucket(s), got {got}")]
    InvalidBucketCount { expected: usize, got: usize },

    #[error("Unsupported file type: {0}")]
    UnsupportedMime(String),

    #[error("Size of attachements should be <= {limit_mb} MB")]
    FileTooLarge { file_name: String, limit_mb: u64 },

    #[error("Size of attachements should be <= {limit_mb} MB")]
    TotalSizeExceeded { total: u64, limit_mb: u64 },

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown provider reference: {0}")]
    UnknownReference(String),

    #[error("No user owns KYC record {0}")]
    UnknownUser(i64),

    #[error("KYC state changed concurrently: {0}")]
    StaleState(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Malformed provider response: {0}")]
    ProviderMalformedResponse(String),

    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AppError {
    /// HTTP status the edge answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidBucketCount { .. }
            | AppError::UnsupportedMime(_)
            | AppError::FileTooLarge { .. }
            | AppError::TotalSizeExceeded { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthenticationError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::UnknownReference(_) | AppError::UnknownUser(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::StaleState(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::ProviderUnavailable(_)
            | AppError::ProviderMalformedResponse(_)
            | AppError::ProviderRejected(_)
            | AppError::EmailError(_)
            | AppError::InternalError(_)
            | AppError::ConfigError(_)
            | AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Server-side failures stay generic.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(section = "http", action = "request_failed", status = status.as_u16(), error = %self);
        } else {
            tracing::warn!(section = "http", action = "request_rejected", status = status.as_u16(), error = %self);
        }
        (status, Json(serde_json::json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::JwtError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ProviderUnavailable(err.to_string())
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        AppError::EmailError(err.to_string())
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        AppError::EmailError(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AppError::EmailError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_family_maps_to_bad_request() {
        let err = AppError::FileTooLarge { file_name: "a.pdf".into(), limit_mb: 20 };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Size of attachements should be <= 20 MB");
        assert_eq!(
            AppError::InvalidBucketCount { expected: 2, got: 1 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::DatabaseError("disk I/O error at /var/lib".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(AppError::StaleState("x".into()).status_code(), StatusCode::CONFLICT);
    }
}
