// ================
// crates/common/src/lib.rs
// ================
//! Common types and structures
//! exchanged between the Secrets server and its clients.
//! Requests arrive as HTML form posts; responses are JSON.

use serde::{Deserialize, Serialize};

/// Header carrying the session token on authenticated requests
pub const SESSION_HEADER: &str = "x-session-token";

/// Registration and login form body
/// # Fields
/// * `username` - Account identifier, kept exactly as submitted
/// * `password` - Raw secret
#[derive(Serialize, Deserialize, Clone)]
pub struct CredentialForm {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response to a successful registration
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterResponse {
    /// The registered identifier
    pub identifier: String,
    /// Session opened for the new account
    pub session_token: String,
    /// RFC 3339 expiry of the session
    pub expires_at: String,
}

/// Response to a successful login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub session_token: String,
    pub expires_at: String,
}

/// Content of the protected page
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SecretsResponse {
    /// Identifier the session belongs to
    pub identifier: String,
}

/// Liveness probe body
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    /// Active secret storage mode
    pub mode: String,
}

/// Error envelope returned for every failed request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
