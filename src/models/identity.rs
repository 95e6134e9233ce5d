//! Identity-related domain models
//!
//! This module defines credentials presented by callers and identities
//! persisted by the user directory.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Maximum identifier length in bytes
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Credentials presented with a request
///
/// The secret is wiped from memory when the credential is dropped.
#[derive(Clone)]
pub struct Credential {
    /// External-facing identifier (blockchain address)
    pub identifier: String,

    /// Plaintext secret
    pub secret: Zeroizing<String>,
}

impl Credential {
    /// Create a new credential
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Identity stored in the user directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    /// Unique identifier, immutable once created
    pub identifier: String,

    /// Encoded password hash (bcrypt or argon2id)
    pub hashed_secret: String,

    /// Key material associated with the account
    pub auth_key: String,

    /// When the identity was created
    pub created_at: DateTime<Utc>,
}

impl StoredIdentity {
    /// Create a new stored identity
    pub fn new(
        identifier: impl Into<String>,
        hashed_secret: impl Into<String>,
        auth_key: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            hashed_secret: hashed_secret.into(),
            auth_key: auth_key.into(),
            created_at: Utc::now(),
        }
    }
}

/// Public view of an account, safe to return over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    /// Account address
    pub address: String,

    /// Key material associated with the account
    pub auth_key: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl From<&StoredIdentity> for AccountView {
    fn from(identity: &StoredIdentity) -> Self {
        Self {
            address: identity.identifier.clone(),
            auth_key: identity.auth_key.clone(),
            created_at: identity.created_at,
        }
    }
}

/// Request to create a new account
#[derive(Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    /// Account address
    pub address: String,

    /// Plaintext password
    pub password: String,

    /// Key material associated with the account
    pub key: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .field("key", &self.key)
            .finish()
    }
}

/// Request to rotate the caller's password
#[derive(Clone, Serialize, Deserialize)]
pub struct RotateSecretRequest {
    /// Current password
    pub current_password: String,

    /// Replacement password
    pub new_password: String,
}

impl fmt::Debug for RotateSecretRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotateSecretRequest")
            .field("current_password", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}

/// Validate an identifier against the identifier rules
///
/// Identifiers must be non-empty, at most [`MAX_IDENTIFIER_LEN`] bytes,
/// free of surrounding whitespace and free of `:` (the Basic credential
/// separator).
pub fn validate_identifier(identifier: &str) -> Result<(), String> {
    if identifier.is_empty() {
        return Err("identifier must not be empty".to_string());
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "identifier exceeds {} bytes",
            MAX_IDENTIFIER_LEN
        ));
    }
    if identifier.trim() != identifier {
        return Err("identifier must not have surrounding whitespace".to_string());
    }
    if identifier.contains(':') {
        return Err("identifier must not contain ':'".to_string());
    }
    if identifier.chars().any(char::is_control) {
        return Err("identifier must not contain control characters".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_secret() {
        let credential = Credential::new("0xabc", "hunter2");
        let debug = format!("{:?}", credential);

        assert!(debug.contains("0xabc"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_signup_request_debug_redacts_password() {
        let request = SignupRequest {
            address: "testAddress".to_string(),
            password: "testPassword".to_string(),
            key: "testKey".to_string(),
        };
        let debug = format!("{:?}", request);

        assert!(!debug.contains("testPassword"));
    }

    #[test]
    fn test_account_view_from_identity() {
        let identity = StoredIdentity::new("testAddress", "$2b$04$hash", "testKey");
        let view = AccountView::from(&identity);

        assert_eq!(view.address, "testAddress");
        assert_eq!(view.auth_key, "testKey");
        assert_eq!(view.created_at, identity.created_at);
    }

    #[test]
    fn test_account_view_never_serializes_hash() {
        let identity = StoredIdentity::new("testAddress", "$2b$04$secret_hash", "testKey");
        let json = serde_json::to_string(&AccountView::from(&identity)).unwrap();

        assert!(!json.contains("secret_hash"));
        assert!(json.contains("\"address\":\"testAddress\""));
    }

    #[test]
    fn test_validate_identifier_accepts_addresses() {
        assert!(validate_identifier("testAddress").is_ok());
        assert!(validate_identifier("0x52908400098527886E0F7030069857D2E4169EE7").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_invalid() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(" padded").is_err());
        assert!(validate_identifier("user:name").is_err());
        assert!(validate_identifier("line\nbreak").is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_identifier_max_length() {
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }
}
