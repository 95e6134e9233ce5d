//! HTTP middleware for smartsafe-gate
//!
//! This module provides middleware layers for:
//! - Request admission (secure channel, Basic credentials, access policy)
//! - Request/response logging
//! - OpenTelemetry tracing

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

use super::router::AppState;
use crate::admission::AdmissionRequest;
use crate::auth::{basic_challenge, parse_basic_authorization};
use crate::config::ChannelConfig;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::models::{Credential, StoredIdentity};
use crate::policy::AccessDecision;

/// Seconds a client should wait before retrying after a directory outage
pub const RETRY_AFTER_SECS: u64 = 5;

/// Authenticated identity extension for requests
#[derive(Clone, Debug)]
pub struct AuthenticatedIdentity(pub StoredIdentity);

/// Admission middleware function
///
/// This middleware:
/// 1. Determines whether the request arrived over a secure channel
/// 2. Extracts Basic credentials from the Authorization header, if present
/// 3. Runs request admission and maps the decision to a response
/// 4. Adds the authenticated identity to the request extensions
pub async fn admission_middleware<D: UserDirectory + 'static>(
    State(state): State<AppState<D>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthResponse> {
    let path = request.uri().path().to_string();
    let secure_channel = is_secure_channel(request.headers(), &state.channel);
    let credentials = extract_basic_credentials(request.headers());

    let admission_request = AdmissionRequest {
        path: path.clone(),
        secure_channel,
        credentials,
    };

    let start = Instant::now();
    let admission = state.admission.admit(admission_request).await;

    if let Some(metrics) = &state.metrics {
        metrics.record_admission(admission.decision);
        if admission.identity.is_some() {
            metrics.record_auth_duration("success", start.elapsed().as_secs_f64());
        }
        if let Some(failure) = &admission.failure {
            metrics.record_auth_failure(failure);
            metrics.record_auth_duration("failure", start.elapsed().as_secs_f64());
        }
    }

    match admission.decision {
        AccessDecision::Allowed => {
            if let Some(identity) = admission.identity {
                request
                    .extensions_mut()
                    .insert(AuthenticatedIdentity(identity));
            }
            Ok(next.run(request).await)
        }
        AccessDecision::RedirectToSecureChannel => {
            let host = request_host(&request).ok_or_else(AuthResponse::missing_host)?;
            let path_and_query = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            let location = secure_location(&host, state.channel.https_port, path_and_query);

            tracing::debug!(path = %path, location = %location, "Redirecting to secure channel");
            Err(AuthResponse::redirect(location))
        }
        AccessDecision::Denied => {
            let response = match admission.failure {
                None => AuthResponse::missing_auth(&state.realm),
                Some(failure) => AuthResponse::from_error(failure, &state.realm),
            };
            tracing::debug!(path = %path, status = %response.status.as_u16(), "Request denied");
            Err(response)
        }
    }
}

/// Whether the request arrived over a secure channel
///
/// Proxies append to the forwarded header, so only the last value (set by
/// the nearest proxy) is trusted. Earlier values may come from the client.
pub fn is_secure_channel(headers: &HeaderMap, channel: &ChannelConfig) -> bool {
    if channel.assume_secure {
        return true;
    }

    headers
        .get_all(channel.forwarded_proto_header.as_str())
        .iter()
        .last()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

/// Basic credentials from the Authorization header
///
/// Other schemes and malformed payloads yield `None`.
pub fn extract_basic_credentials(headers: &HeaderMap) -> Option<Credential> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_authorization)
}

fn request_host(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string))
        .filter(|h| !h.is_empty())
}

/// Build the `https` redirect target for a request
///
/// Any port on the incoming host is replaced by `https_port`. Port 443 is
/// left implicit.
pub fn secure_location(host: &str, https_port: Option<u16>, path_and_query: &str) -> String {
    let hostname = strip_port(host);
    match https_port {
        Some(port) if port != 443 => format!("https://{}:{}{}", hostname, port, path_and_query),
        _ => format!("https://{}{}", hostname, path_and_query),
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Authentication error response
pub struct AuthResponse {
    status: StatusCode,
    message: String,
    headers: Vec<(HeaderName, String)>,
}

impl AuthResponse {
    pub(crate) fn from_error(error: AuthError, realm: &str) -> Self {
        match error {
            AuthError::DirectoryUnavailable => Self::unavailable(),
            AuthError::UnknownIdentity
            | AuthError::InvalidCredential
            | AuthError::MalformedStoredHash => Self::authentication_failed(realm),
        }
    }

    pub(crate) fn missing_auth(realm: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Full authentication is required".to_string(),
            headers: vec![(header::WWW_AUTHENTICATE, basic_challenge(realm))],
        }
    }

    pub(crate) fn authentication_failed(realm: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Authentication failed".to_string(),
            headers: vec![(header::WWW_AUTHENTICATE, basic_challenge(realm))],
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "Authentication service unavailable".to_string(),
            headers: vec![(header::RETRY_AFTER, RETRY_AFTER_SECS.to_string())],
        }
    }

    fn redirect(location: String) -> Self {
        Self {
            status: StatusCode::FOUND,
            message: "Secure channel required".to_string(),
            headers: vec![(header::LOCATION, location)],
        }
    }

    fn missing_host() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Missing Host header".to_string(),
            headers: vec![],
        }
    }

    /// Response status
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AuthResponse {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response();

        for (name, value) in self.headers {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    response.headers_mut().insert(name, value);
                }
                Err(e) => {
                    tracing::warn!(header = %name, error = %e, "Dropping invalid response header");
                }
            }
        }

        response
    }
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}

/// Tracing middleware function
///
/// Creates a span covering the entire request lifecycle, including the
/// admission decision.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    use tracing::Instrument;

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // The query string is left out of the span; it may carry secrets
    let span = tracing::info_span!(
        "http_request",
        http.method = %method,
        http.path = %path,
        http.status_code = tracing::field::Empty,
    );

    async move {
        let response = next.run(request).await;
        tracing::Span::current().record("http.status_code", response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}
