// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrets_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

use crate::auth::VerifierError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown identifier, wrong secret and unreadable material all map here
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing or expired session")]
    Unauthenticated,

    #[error("Authentication rate limit exceeded")]
    AuthRateLimited,

    #[error("Identifier already registered: {0}")]
    DuplicateIdentifier(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Verifier(#[from] VerifierError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::DuplicateIdentifier(_) => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Unauthenticated => "AUTH_002",
            AppError::AuthRateLimited => "AUTH_003",
            AppError::DuplicateIdentifier(_) => "USER_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Config(_) => "CFG_001",
            AppError::Verifier(_) => "CRED_001",
            AppError::Internal(_) => "INT_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Authentication failed".to_string(),
            AppError::Unauthenticated => "Authentication required".to_string(),
            AppError::AuthRateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AppError::DuplicateIdentifier(_) => "Account already exists".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::Config(_)
            | AppError::Verifier(_)
            | AppError::Internal(_)
            | AppError::Io(_)
            | AppError::Json(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Authentication failures never carry detail, whatever the build
        let message = match &self {
            AppError::InvalidCredentials | AppError::Unauthenticated | AppError::AuthRateLimited => {
                self.sanitized_message()
            },
            _ if cfg!(debug_assertions) => self.to_string(),
            _ => self.sanitized_message(),
        };

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
