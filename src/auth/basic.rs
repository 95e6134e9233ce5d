//! HTTP Basic credential parsing

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::models::Credential;

/// Authentication scheme processed by the gate
pub const BASIC_SCHEME: &str = "Basic";

/// Parse an `Authorization` header value carrying Basic credentials
///
/// Returns `None` for other schemes and for malformed payloads.
pub fn parse_basic_authorization(header: &str) -> Option<Credential> {
    let (scheme, payload) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return None;
    }

    let decoded = STANDARD.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (identifier, secret) = decoded.split_once(':')?;
    if identifier.is_empty() {
        return None;
    }

    Some(Credential::new(identifier, secret))
}

/// Build a `WWW-Authenticate` challenge for the given realm
pub fn basic_challenge(realm: &str) -> String {
    format!("{} realm=\"{}\", charset=\"UTF-8\"", BASIC_SCHEME, realm)
}
