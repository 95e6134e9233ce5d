//! HTTP router for smartsafe-gate
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Signup, login and logout
//! - The caller's account and password rotation
//! - Health checks

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::middleware::{
    admission_middleware, extract_basic_credentials, logging_middleware, tracing_middleware,
    AuthResponse, AuthenticatedIdentity,
};
use crate::account::UserService;
use crate::admission::RequestAdmission;
use crate::config::ChannelConfig;
use crate::directory::UserDirectory;
use crate::error::{AccountError, AuthError, RetryableError};
use crate::models::{AccountView, RotateSecretRequest, SignupRequest};
use crate::otel::Metrics;

/// Shared application state
pub struct AppState<D: UserDirectory> {
    /// Per-request admission pipeline
    pub admission: Arc<RequestAdmission<D>>,

    /// Account service
    pub accounts: Arc<UserService<D>>,

    /// Secure channel detection settings
    pub channel: Arc<ChannelConfig>,

    /// Realm advertised in Basic challenges
    pub realm: Arc<str>,

    /// Admission metrics
    pub metrics: Option<Arc<Metrics>>,
}

impl<D: UserDirectory> AppState<D> {
    pub fn new(
        admission: Arc<RequestAdmission<D>>,
        accounts: Arc<UserService<D>>,
        channel: ChannelConfig,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            admission,
            accounts,
            channel: Arc::new(channel),
            realm: Arc::from(realm.into()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<D: UserDirectory> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            admission: Arc::clone(&self.admission),
            accounts: Arc::clone(&self.accounts),
            channel: Arc::clone(&self.channel),
            realm: Arc::clone(&self.realm),
            metrics: self.metrics.clone(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the main application router
///
/// Every route, including the fallback, runs behind the admission middleware.
pub fn build_router<D: UserDirectory + 'static>(state: AppState<D>) -> Router {
    Router::new()
        .route("/signup", post(signup_handler::<D>))
        .route("/login", post(login_handler::<D>))
        .route("/logout", post(logout_handler))
        .route("/account", get(account_handler))
        .route("/account/password", put(rotate_password_handler::<D>))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware::<D>,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(tracing_middleware))
        .with_state(state)
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn account_error_response(error: AccountError, realm: &str) -> Response {
    match error {
        AccountError::InvalidIdentifier(reason) => {
            error_body(StatusCode::BAD_REQUEST, &format!("Invalid address: {}", reason))
        }
        AccountError::EmptySecret => error_body(StatusCode::BAD_REQUEST, "Password must not be empty"),
        AccountError::InvalidSecret(reason) => {
            error_body(StatusCode::BAD_REQUEST, &format!("Invalid password: {}", reason))
        }
        AccountError::AlreadyExists(_) => error_body(StatusCode::CONFLICT, "Address already registered"),
        AccountError::NotFound(_) => error_body(StatusCode::NOT_FOUND, "Account not found"),
        AccountError::Auth(AuthError::DirectoryUnavailable) => {
            AuthResponse::unavailable().into_response()
        }
        AccountError::Auth(_) => AuthResponse::authentication_failed(realm).into_response(),
        e if e.is_retryable() => {
            tracing::error!(error = %e, "Account operation failed");
            AuthResponse::unavailable().into_response()
        }
        e => {
            tracing::error!(error = %e, "Account operation failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Signup handler
async fn signup_handler<D: UserDirectory + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<SignupRequest>,
) -> Response {
    match state
        .accounts
        .create_user(&request.address, &request.password, &request.key)
        .await
    {
        Ok(identity) => (StatusCode::CREATED, Json(AccountView::from(&identity))).into_response(),
        Err(e) => account_error_response(e, &state.realm),
    }
}

/// Login handler
///
/// `/login` is public, so the credentials are checked here rather than by
/// the admission middleware.
async fn login_handler<D: UserDirectory + 'static>(
    State(state): State<AppState<D>>,
    headers: axum::http::HeaderMap,
) -> Response {
    let Some(credential) = extract_basic_credentials(&headers) else {
        return AuthResponse::missing_auth(&state.realm).into_response();
    };

    match state
        .admission
        .gate()
        .authenticate(&credential.identifier, &credential.secret)
        .await
    {
        Ok(identity) => {
            tracing::info!(address = %identity.identifier, "Login succeeded");
            (StatusCode::OK, Json(AccountView::from(&identity))).into_response()
        }
        Err(e) => {
            if let Some(metrics) = &state.metrics {
                metrics.record_auth_failure(&e);
            }
            AuthResponse::from_error(e, &state.realm).into_response()
        }
    }
}

/// Logout handler
///
/// `/logout` is always permitted and no session state exists, so logout
/// only acknowledges the caller.
async fn logout_handler() -> StatusCode {
    tracing::debug!("Logout acknowledged");
    StatusCode::NO_CONTENT
}

/// Current account handler
async fn account_handler(identity: Option<Extension<AuthenticatedIdentity>>) -> Response {
    match identity {
        Some(Extension(AuthenticatedIdentity(identity))) => {
            Json(AccountView::from(&identity)).into_response()
        }
        None => error_body(StatusCode::UNAUTHORIZED, "Full authentication is required"),
    }
}

/// Password rotation handler
async fn rotate_password_handler<D: UserDirectory + 'static>(
    State(state): State<AppState<D>>,
    identity: Option<Extension<AuthenticatedIdentity>>,
    Json(request): Json<RotateSecretRequest>,
) -> Response {
    let Some(Extension(AuthenticatedIdentity(identity))) = identity else {
        return AuthResponse::missing_auth(&state.realm).into_response();
    };

    match state
        .accounts
        .rotate_secret(
            &identity.identifier,
            &request.current_password,
            &request.new_password,
        )
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => account_error_response(e, &state.realm),
    }
}

/// Health check endpoint handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn not_found_handler() -> Response {
    error_body(StatusCode::NOT_FOUND, "Not found")
}
