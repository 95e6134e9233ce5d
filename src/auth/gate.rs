//! Authentication gate
//!
//! Validates presented credentials against the user directory. A lookup
//! for an unknown identifier still performs one full hash verification
//! against a dummy hash, so unknown identities and wrong secrets fail with
//! comparable latency.

use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use super::hasher::PasswordHasher;
use crate::directory::UserDirectory;
use crate::error::{AuthError, HashError};
use crate::models::StoredIdentity;

/// Default bound on a single directory lookup
pub const DEFAULT_DIRECTORY_TIMEOUT: Duration = Duration::from_secs(5);

const DUMMY_SECRET: &str = "smartsafe-dummy-secret-for-timing-equalization";

/// Configuration for the authentication gate
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Hasher used for verification and for the dummy hash
    pub hasher: PasswordHasher,

    /// Upper bound on a directory lookup
    pub directory_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            hasher: PasswordHasher::default(),
            directory_timeout: DEFAULT_DIRECTORY_TIMEOUT,
        }
    }
}

/// Authentication decision point
pub struct AuthenticationGate<D: UserDirectory> {
    directory: Arc<D>,
    hasher: PasswordHasher,
    directory_timeout: Duration,
    dummy_hash: String,
}

impl<D: UserDirectory> AuthenticationGate<D> {
    /// Create a new gate
    ///
    /// Computes the dummy hash up front with the configured algorithm and cost.
    pub fn new(directory: Arc<D>, config: GateConfig) -> Result<Self, HashError> {
        let dummy_hash = config.hasher.hash(DUMMY_SECRET)?;
        Ok(Self {
            directory,
            hasher: config.hasher,
            directory_timeout: config.directory_timeout,
            dummy_hash,
        })
    }

    /// Hasher used by this gate
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Directory consulted by this gate
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Authenticate an identifier/secret pair
    ///
    /// Never mutates state. Failures are returned as values.
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<StoredIdentity, AuthError> {
        let lookup = tokio::time::timeout(
            self.directory_timeout,
            self.directory.find_by_identifier(identifier),
        )
        .await;

        let stored = match lookup {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "User directory lookup failed");
                return Err(AuthError::DirectoryUnavailable);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = %self.directory_timeout.as_millis(),
                    "User directory lookup timed out"
                );
                return Err(AuthError::DirectoryUnavailable);
            }
        };

        let identity = match stored {
            Some(identity) => identity,
            None => {
                let _ = self.check_blocking(secret, &self.dummy_hash).await;
                tracing::debug!(
                    identifier = %identifier,
                    "Authentication failed: unknown identity"
                );
                return Err(AuthError::UnknownIdentity);
            }
        };

        match self.check_blocking(secret, &identity.hashed_secret).await {
            Ok(true) => {
                tracing::debug!(identifier = %identifier, "Authentication successful");
                Ok(identity)
            }
            Ok(false) => {
                tracing::debug!(
                    identifier = %identifier,
                    "Authentication failed: invalid credential"
                );
                Err(AuthError::InvalidCredential)
            }
            Err(HashError::Malformed(reason)) => {
                // Spend the same hashing work as a well-formed mismatch
                let _ = self.check_blocking(secret, &self.dummy_hash).await;
                tracing::warn!(
                    identifier = %identifier,
                    reason = %reason,
                    "Stored password hash is malformed"
                );
                Err(AuthError::MalformedStoredHash)
            }
            Err(e) => {
                tracing::error!(
                    identifier = %identifier,
                    error = %e,
                    "Password verification failed"
                );
                Err(AuthError::InvalidCredential)
            }
        }
    }

    /// Run hash verification on the blocking pool
    async fn check_blocking(&self, secret: &str, encoded: &str) -> Result<bool, HashError> {
        let hasher = self.hasher;
        let secret = Zeroizing::new(secret.to_string());
        let encoded = encoded.to_string();

        tokio::task::spawn_blocking(move || hasher.check(&secret, &encoded))
            .await
            .unwrap_or_else(|e| Err(HashError::HashFailed(e.to_string())))
    }
}
