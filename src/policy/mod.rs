//! Access policy for smartsafe-gate
//!
//! Decides, per request path, whether the request may proceed. Evaluation
//! order is fixed:
//!
//! 1. An insecure channel is redirected before anything else, public
//!    endpoints included.
//! 2. A path matching a public rule is allowed.
//! 3. An authenticated caller is allowed.
//! 4. Everything else is denied.
//!
//! The logout path is always permitted and is checked before any configured
//! rule. Configured rules are checked in declaration order and the first
//! match wins. A path that matches no rule requires authentication.

pub mod matcher;

pub use matcher::AntMatcher;

use serde::{Deserialize, Serialize};

/// Paths reachable without authentication by default
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &["/login", "/signup"];

/// Logout path; always permitted regardless of configuration
pub const LOGOUT_PATH: &str = "/logout";

/// Outcome of an access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// The request may proceed
    Allowed,

    /// The request is rejected
    Denied,

    /// The request must be retried over a secure channel
    RedirectToSecureChannel,
}

impl AccessDecision {
    /// Label used for metrics and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Allowed => "allowed",
            AccessDecision::Denied => "denied",
            AccessDecision::RedirectToSecureChannel => "redirect_to_secure_channel",
        }
    }
}

impl std::fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path rule as declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRule {
    /// Ant-style path pattern
    pub pattern: String,

    /// Whether matching paths require authentication
    pub requires_auth: bool,
}

impl PathRule {
    /// Rule granting unauthenticated access
    pub fn public(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            requires_auth: false,
        }
    }

    /// Rule requiring authentication
    pub fn authenticated(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            requires_auth: true,
        }
    }
}

/// Policy construction errors
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PolicyError {
    /// A rule pattern could not be compiled
    #[error("Invalid path pattern: {0}")]
    InvalidPattern(String),
}

#[derive(Debug, Clone)]
struct CompiledRule {
    matcher: AntMatcher,
    requires_auth: bool,
}

/// Authorization decision point
///
/// Immutable after construction and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    logout: AntMatcher,
    rules: Vec<CompiledRule>,
}

impl AccessPolicy {
    /// Build a policy from ordered rules
    pub fn new(rules: &[PathRule]) -> Result<Self, PolicyError> {
        let logout = AntMatcher::new(LOGOUT_PATH).map_err(PolicyError::InvalidPattern)?;

        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let matcher = AntMatcher::new(&rule.pattern).map_err(PolicyError::InvalidPattern)?;
            if rule.requires_auth && matcher.matches(LOGOUT_PATH) {
                tracing::warn!(
                    pattern = %rule.pattern,
                    "Authenticated rule matches the logout path; logout stays permitted"
                );
            }
            compiled.push(CompiledRule {
                matcher,
                requires_auth: rule.requires_auth,
            });
        }

        Ok(Self {
            logout,
            rules: compiled,
        })
    }

    /// Build a policy whose only rules are public paths
    pub fn with_public_paths<S: AsRef<str>>(paths: &[S]) -> Result<Self, PolicyError> {
        let rules: Vec<PathRule> = paths
            .iter()
            .map(|p| PathRule::public(p.as_ref()))
            .collect();
        Self::new(&rules)
    }

    /// Whether a path falls outside every public rule
    pub fn requires_authentication(&self, path: &str) -> bool {
        if self.logout.matches(path) {
            return false;
        }

        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path))
            .map(|rule| rule.requires_auth)
            .unwrap_or(true)
    }

    /// Decide whether a request may proceed
    pub fn decide(
        &self,
        path: &str,
        is_authenticated: bool,
        is_secure_channel: bool,
    ) -> AccessDecision {
        if !is_secure_channel {
            return AccessDecision::RedirectToSecureChannel;
        }

        if !self.requires_authentication(path) {
            return AccessDecision::Allowed;
        }

        if is_authenticated {
            AccessDecision::Allowed
        } else {
            AccessDecision::Denied
        }
    }

    /// Patterns of the configured public rules, in evaluation order
    pub fn public_patterns(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| !rule.requires_auth)
            .map(|rule| rule.matcher.pattern())
            .collect()
    }
}
