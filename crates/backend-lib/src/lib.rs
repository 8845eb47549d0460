// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the Secrets credential server.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthRateLimiter, CredentialVerifier, SessionManager};
use crate::config::Settings;
use crate::error::AppError;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Encoder/verifier for the configured storage mode
    pub verifier: CredentialVerifier,
    /// Session manager
    pub sessions: Arc<SessionManager>,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
    /// Credential storage backend
    pub storage: S,
    /// Login rate limiter
    pub auth_rate_limiter: Arc<AuthRateLimiter>,
}

impl<S> AppState<S> {
    /// Create a new application state.
    ///
    /// Fails with `AppError::Verifier` when the configured key material is
    /// missing or malformed; callers should treat that as fatal.
    pub fn new(storage: S, settings: Settings) -> Result<Self, AppError> {
        let verifier = CredentialVerifier::from_settings(&settings.auth)?;
        let sessions = Arc::new(SessionManager::new(settings.session_ttl_secs));
        let auth_rate_limiter = Arc::new(AuthRateLimiter::from_settings(&settings.rate_limit));

        Ok(Self {
            verifier,
            sessions,
            settings: Arc::new(settings),
            storage,
            auth_rate_limiter,
        })
    }
}
