//! Application error types for smartsafe-gate
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Authentication-related errors
///
/// Credential failures (`UnknownIdentity`, `InvalidCredential`,
/// `MalformedStoredHash`) are reported to HTTP clients with one generic
/// message so callers cannot tell which of them occurred.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// No identity is stored under the presented identifier
    #[error("Unknown identity")]
    UnknownIdentity,

    /// The presented secret does not match the stored hash
    #[error("Invalid credential")]
    InvalidCredential,

    /// The stored hash could not be parsed
    #[error("Malformed stored hash")]
    MalformedStoredHash,

    /// The user directory failed or timed out
    #[error("User directory unavailable")]
    DirectoryUnavailable,
}

impl AuthError {
    /// Returns true for failures caused by the presented credentials
    pub fn is_credential_failure(&self) -> bool {
        !matches!(self, AuthError::DirectoryUnavailable)
    }

    /// Short label used for metrics and log fields
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::UnknownIdentity => "unknown_identity",
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::MalformedStoredHash => "malformed_stored_hash",
            AuthError::DirectoryUnavailable => "directory_unavailable",
        }
    }
}

/// Password hashing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HashError {
    /// Work factor outside the supported range
    #[error("Invalid hash cost: {0}")]
    InvalidCost(u32),

    /// Encoded hash could not be parsed
    #[error("Malformed hash: {0}")]
    Malformed(String),

    /// Secret cannot be hashed without losing information
    #[error("Unsupported secret: {0}")]
    UnsupportedSecret(String),

    /// Hashing failed
    #[error("Hash failed: {0}")]
    HashFailed(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection thread error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Account management errors
#[derive(Debug, Error)]
pub enum AccountError {
    /// Identifier violates the identifier rules
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Secret was empty
    #[error("Secret must not be empty")]
    EmptySecret,

    /// Secret is not accepted by the configured hasher
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    /// An identity with this identifier already exists
    #[error("Identity already exists: {0}")]
    AlreadyExists(String),

    /// No identity with this identifier exists
    #[error("Identity not found: {0}")]
    NotFound(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Hashing failed
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// OpenTelemetry-related errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OtelError {
    /// Failed to initialize tracer
    #[error("Failed to initialize tracer: {0}")]
    TracerInit(String),

    /// Failed to initialize meter
    #[error("Failed to initialize meter: {0}")]
    MeterInit(String),

    /// Failed to shutdown
    #[error("Failed to shutdown: {0}")]
    Shutdown(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Application-level error type
///
/// Aggregates the domain errors that can stop startup or the server.
/// `main` converts it to `anyhow::Error` at the binary edge.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Hashing error
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Account error
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Telemetry error
    #[error("Telemetry error: {0}")]
    Otel(#[from] OtelError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(#[from] crate::server::ServerError),
}

/// Trait for determining if an error is retryable
pub trait RetryableError {
    /// Returns true if the error is retryable
    fn is_retryable(&self) -> bool;
}

impl RetryableError for AuthError {
    fn is_retryable(&self) -> bool {
        match self {
            AuthError::DirectoryUnavailable => true,

            AuthError::UnknownIdentity => false,
            AuthError::InvalidCredential => false,
            AuthError::MalformedStoredHash => false,
        }
    }
}

impl RetryableError for AccountError {
    fn is_retryable(&self) -> bool {
        match self {
            AccountError::Auth(e) => e.is_retryable(),
            AccountError::Database(DbError::Connection(_)) => true,
            _ => false,
        }
    }
}
