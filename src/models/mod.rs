//! Domain models for smartsafe-gate
//!
//! This module contains the core domain models used throughout the application.

pub mod identity;

// Re-export commonly used types
pub use identity::{
    validate_identifier, AccountView, Credential, RotateSecretRequest, SignupRequest,
    StoredIdentity, MAX_IDENTIFIER_LEN,
};
