//! Account management for smartsafe-gate
//!
//! This module provides:
//! - Signup: validating an address, hashing its password and storing the identity
//! - Credential rotation for an authenticated account

use std::sync::Arc;

use crate::auth::AuthenticationGate;
use crate::directory::UserDirectory;
use crate::error::{AccountError, DbError, HashError};
use crate::models::{validate_identifier, StoredIdentity};

/// Account service backed by a user directory
pub struct UserService<D: UserDirectory> {
    gate: Arc<AuthenticationGate<D>>,
    directory: Arc<D>,
}

impl<D: UserDirectory> UserService<D> {
    /// Create a new service
    ///
    /// New secrets are hashed with the gate's hasher so stored hashes and
    /// the dummy hash share one algorithm and cost.
    pub fn new(gate: Arc<AuthenticationGate<D>>) -> Self {
        let directory = Arc::clone(gate.directory());
        Self { gate, directory }
    }

    /// Create a new account
    ///
    /// Issues exactly one `save` against the directory. A duplicate address
    /// fails with [`AccountError::AlreadyExists`].
    pub async fn create_user(
        &self,
        address: &str,
        password: &str,
        key: &str,
    ) -> Result<StoredIdentity, AccountError> {
        validate_identifier(address).map_err(AccountError::InvalidIdentifier)?;
        self.validate_secret(password)?;

        let hashed_secret = self.hash_blocking(password).await?;
        let identity = StoredIdentity::new(address, hashed_secret, key);

        match self.directory.save(&identity).await {
            Ok(()) => {
                tracing::info!(address = %address, "Account created");
                Ok(identity)
            }
            Err(DbError::ConstraintViolation(_)) => {
                tracing::debug!(address = %address, "Signup rejected: address already registered");
                Err(AccountError::AlreadyExists(address.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the secret of an account
    ///
    /// The current secret must authenticate through the gate first.
    pub async fn rotate_secret(
        &self,
        address: &str,
        current: &str,
        new: &str,
    ) -> Result<(), AccountError> {
        self.validate_secret(new)?;

        self.gate.authenticate(address, current).await?;

        let hashed_secret = self.hash_blocking(new).await?;
        match self
            .directory
            .update_hashed_secret(address, &hashed_secret)
            .await
        {
            Ok(()) => {
                tracing::info!(address = %address, "Account secret rotated");
                Ok(())
            }
            Err(DbError::NotFound) => Err(AccountError::NotFound(address.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn validate_secret(&self, secret: &str) -> Result<(), AccountError> {
        if secret.is_empty() {
            return Err(AccountError::EmptySecret);
        }
        self.gate
            .hasher()
            .validate_secret(secret)
            .map_err(|e| match e {
                HashError::UnsupportedSecret(reason) => AccountError::InvalidSecret(reason),
                other => AccountError::Hash(other),
            })
    }

    async fn hash_blocking(&self, secret: &str) -> Result<String, AccountError> {
        let hasher = *self.gate.hasher();
        let secret = zeroize::Zeroizing::new(secret.to_string());

        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| HashError::HashFailed(e.to_string()))??;
        Ok(hashed)
    }
}
