// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::storage::CredentialStore;
use crate::AppState;

/// Create the application router
pub fn create_router<S: CredentialStore + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::<S>))
        .route("/register", post(handlers::register::<S>))
        .route("/login", post(handlers::login::<S>))
        .route("/secrets", get(handlers::secrets::<S>))
        .route("/logout", post(handlers::logout::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
