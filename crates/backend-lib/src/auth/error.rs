// ============================
// crates/backend-lib/src/auth/error.rs
// ============================
//! Errors raised by the credential verifier.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifierError {
    /// Key material or cost parameters are unusable. Only raised while
    /// building the verifier at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Stored secret material could not be decoded or authenticated.
    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Verifier task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for VerifierError {
    fn from(err: tokio::task::JoinError) -> Self {
        VerifierError::Task(err.to_string())
    }
}
