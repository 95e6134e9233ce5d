//! Password hashing and verification
//!
//! New hashes are produced with bcrypt at a configurable work factor
//! (default 11) or with Argon2id. Verification dispatches on the encoded
//! prefix, so a directory can hold hashes of both kinds.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::HashError;

/// Default bcrypt work factor
pub const DEFAULT_HASH_COST: u32 = 11;

/// Smallest bcrypt work factor accepted
pub const MIN_HASH_COST: u32 = 4;

/// Largest bcrypt work factor accepted
pub const MAX_HASH_COST: u32 = 31;

/// Longest secret bcrypt consumes in full; later bytes are ignored by the cipher
pub const MAX_BCRYPT_SECRET_BYTES: usize = 72;

/// Algorithm used for newly produced hashes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// bcrypt (`$2b$`)
    #[default]
    Bcrypt,

    /// Argon2id with library defaults (`$argon2id$`)
    Argon2id,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Bcrypt => write!(f, "bcrypt"),
            HashAlgorithm::Argon2id => write!(f, "argon2id"),
        }
    }
}

/// Adaptive one-way password hasher
///
/// Holds only immutable parameters and is safe to share across tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    algorithm: HashAlgorithm,
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given algorithm and bcrypt cost
    pub fn new(algorithm: HashAlgorithm, cost: u32) -> Result<Self, HashError> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
            return Err(HashError::InvalidCost(cost));
        }
        Ok(Self { algorithm, cost })
    }

    /// Create a bcrypt hasher with the given cost
    pub fn bcrypt(cost: u32) -> Result<Self, HashError> {
        Self::new(HashAlgorithm::Bcrypt, cost)
    }

    /// Algorithm used by [`hash`](Self::hash)
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// bcrypt work factor
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Check that a secret can be hashed without losing information
    ///
    /// bcrypt appends a NUL terminator and then reads at most
    /// [`MAX_BCRYPT_SECRET_BYTES`] bytes, so longer secrets or secrets
    /// containing NUL can collide with other secrets. Argon2id accepts any
    /// input.
    pub fn validate_secret(&self, secret: &str) -> Result<(), HashError> {
        match self.algorithm {
            HashAlgorithm::Bcrypt => validate_bcrypt_secret(secret),
            HashAlgorithm::Argon2id => Ok(()),
        }
    }

    /// Hash a secret with a fresh random salt
    ///
    /// The result is self-describing: algorithm tag, parameters, salt and digest.
    /// Secrets rejected by [`validate_secret`](Self::validate_secret) fail with
    /// [`HashError::UnsupportedSecret`].
    pub fn hash(&self, secret: &str) -> Result<String, HashError> {
        self.validate_secret(secret)?;
        match self.algorithm {
            HashAlgorithm::Bcrypt => bcrypt::hash(secret, self.cost)
                .map_err(|e| HashError::HashFailed(e.to_string())),
            HashAlgorithm::Argon2id => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(secret.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| HashError::HashFailed(e.to_string()))
            }
        }
    }

    /// Verify a secret against an encoded hash
    ///
    /// Returns `false` on mismatch and on malformed input.
    pub fn verify(&self, secret: &str, encoded: &str) -> bool {
        self.check(secret, encoded).unwrap_or(false)
    }

    /// Verify a secret, reporting malformed input as an error
    ///
    /// Digest comparison is constant time in both backends. A secret that
    /// bcrypt cannot consume in full never matches a bcrypt hash.
    pub fn check(&self, secret: &str, encoded: &str) -> Result<bool, HashError> {
        if encoded.starts_with("$argon2") {
            let parsed =
                PasswordHash::new(encoded).map_err(|e| HashError::Malformed(e.to_string()))?;
            match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(HashError::Malformed(e.to_string())),
            }
        } else if encoded.starts_with("$2") {
            if validate_bcrypt_secret(secret).is_err() {
                return Ok(false);
            }
            bcrypt::verify(secret, encoded).map_err(|e| HashError::Malformed(e.to_string()))
        } else {
            Err(HashError::Malformed("unrecognized hash prefix".to_string()))
        }
    }
}

fn validate_bcrypt_secret(secret: &str) -> Result<(), HashError> {
    if secret.len() > MAX_BCRYPT_SECRET_BYTES {
        return Err(HashError::UnsupportedSecret(format!(
            "secret exceeds {} bytes",
            MAX_BCRYPT_SECRET_BYTES
        )));
    }
    if secret.contains('\0') {
        return Err(HashError::UnsupportedSecret(
            "secret contains a NUL byte".to_string(),
        ));
    }
    Ok(())
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Bcrypt,
            cost: DEFAULT_HASH_COST,
        }
    }
}
