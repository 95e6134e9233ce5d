//! smartsafe-gate - Authentication and access-control gate for the smartsafe web service
//!
//! This crate decides, for every request, whether presented Basic credentials
//! are valid, whether the channel is secure, and whether the resource is
//! publicly reachable.

pub mod account;
pub mod admission;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod otel;
pub mod policy;
pub mod server;
