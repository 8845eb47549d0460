// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Registration, login and session handlers.
use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, State},
    http::{Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use metrics::counter;
use secrets_common::{
    CredentialForm, HealthResponse, LoginResponse, RegisterResponse, SecretsResponse,
    SESSION_HEADER,
};
use tracing::{debug, error, info, instrument};

use crate::error::AppError;
use crate::metrics::{
    LOGIN_FAILURE, LOGIN_LOCKED, LOGIN_SUCCESS, REGISTER_FAILURE, REGISTER_SUCCESS,
};
use crate::storage::{CredentialRecord, CredentialStore};
use crate::validation::validate_form;
use crate::AppState;

/// Header set by a fronting proxy with the original client address
const CLIENT_IP_HEADER: &str = "x-real-ip";

/// Rate limiter key for the client behind this request.
///
/// The proxy header is only honoured when configured; otherwise the peer
/// address recorded by the listener is used.
fn client_address(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_proxy_header: bool,
) -> String {
    let forwarded = trust_proxy_header
        .then(|| headers.get(CLIENT_IP_HEADER))
        .flatten()
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|token| !token.is_empty())
}

/// Liveness probe reporting the active storage mode
pub async fn health<S: CredentialStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        mode: state.verifier.mode().to_string(),
    })
}

/// Encode the submitted secret and persist a new credential record.
///
/// A persistence failure sends the client back to the registration form.
#[instrument(skip_all, fields(identifier = %form.username))]
pub async fn register<S: CredentialStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<CredentialForm>,
) -> Result<Response, AppError> {
    validate_form(&form)?;

    let secret_material = state.verifier.encode(&form.password).await?;
    let record = CredentialRecord::new(form.username.as_str(), secret_material);

    if let Err(err) = state.storage.insert(record).await {
        counter!(REGISTER_FAILURE).increment(1);
        error!(error = %err, "failed to persist credential record");
        return Ok(Redirect::to("/register").into_response());
    }

    let (session_token, session) = state.sessions.create_session(&form.username).await;
    counter!(REGISTER_SUCCESS).increment(1);
    info!("account registered");

    let body = RegisterResponse {
        identifier: form.username,
        session_token,
        expires_at: session.expires_at.to_rfc3339(),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Check submitted credentials and open a session.
///
/// Unknown identifier, wrong secret and unreadable stored material all end
/// in the same `InvalidCredentials` response.
#[instrument(skip_all, fields(identifier = %form.username))]
pub async fn login<S: CredentialStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    extensions: Extensions,
    Form(form): Form<CredentialForm>,
) -> Result<Json<LoginResponse>, AppError> {
    let client = client_address(
        &headers,
        &extensions,
        state.settings.rate_limit.trust_proxy_header,
    );
    if !state.auth_rate_limiter.try_begin_attempt(&client) {
        counter!(LOGIN_LOCKED).increment(1);
        return Err(AppError::AuthRateLimited);
    }

    let authenticated = match state.storage.find_by_identifier(&form.username).await? {
        Some(record) => {
            state
                .verifier
                .verify(&form.password, &record.secret_material)
                .await
        },
        None => {
            debug!("no credential record for identifier");
            state.verifier.verify_decoy(&form.password).await;
            false
        },
    };

    if !authenticated {
        counter!(LOGIN_FAILURE).increment(1);
        return Err(AppError::InvalidCredentials);
    }

    state.auth_rate_limiter.record_success(&client);
    let (session_token, session) = state.sessions.create_session(&form.username).await;
    counter!(LOGIN_SUCCESS).increment(1);
    info!("login succeeded");

    Ok(Json(LoginResponse {
        session_token,
        expires_at: session.expires_at.to_rfc3339(),
    }))
}

/// Protected page, available to any live session
pub async fn secrets<S: CredentialStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<SecretsResponse>, AppError> {
    let token = session_token(&headers).ok_or(AppError::Unauthenticated)?;
    let session = state
        .sessions
        .get_session(token)
        .await
        .ok_or(AppError::Unauthenticated)?;

    Ok(Json(SecretsResponse {
        identifier: session.identifier,
    }))
}

/// End the caller's session, if any, and return to the home page
pub async fn logout<S: CredentialStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Redirect {
    if let Some(token) = session_token(&headers) {
        if state.sessions.revoke_session(token).await {
            debug!("session revoked");
        }
    }
    Redirect::to("/")
}
