//! Authentication system for smartsafe-gate
//!
//! This module provides:
//! - Password hashing and constant-time verification
//! - HTTP Basic credential parsing
//! - The authentication gate that checks credentials against the directory

pub mod basic;
pub mod gate;
pub mod hasher;

pub use basic::{basic_challenge, parse_basic_authorization, BASIC_SCHEME};
pub use gate::{AuthenticationGate, GateConfig, DEFAULT_DIRECTORY_TIMEOUT};
pub use hasher::{
    HashAlgorithm, PasswordHasher, DEFAULT_HASH_COST, MAX_BCRYPT_SECRET_BYTES, MAX_HASH_COST,
    MIN_HASH_COST,
};
