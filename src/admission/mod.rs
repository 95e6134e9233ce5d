//! Request admission
//!
//! Combines the authentication gate and the access policy into a single
//! per-request decision. Credentials are checked only when the policy says
//! the path needs them, so public endpoints never touch the directory.

use std::sync::Arc;

use crate::auth::AuthenticationGate;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::models::{Credential, StoredIdentity};
use crate::policy::{AccessDecision, AccessPolicy};

/// Inputs to a single admission decision
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    /// Request path
    pub path: String,

    /// Whether the request arrived over a secure channel
    pub secure_channel: bool,

    /// Credentials presented with the request, if any
    pub credentials: Option<Credential>,
}

impl AdmissionRequest {
    pub fn new(path: impl Into<String>, secure_channel: bool) -> Self {
        Self {
            path: path.into(),
            secure_channel,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credential) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Outcome of admission
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Access decision
    pub decision: AccessDecision,

    /// Authenticated identity, when the gate ran and succeeded
    pub identity: Option<StoredIdentity>,

    /// Gate failure that produced a denial, if any
    pub failure: Option<AuthError>,
}

impl Admission {
    fn decided(decision: AccessDecision) -> Self {
        Self {
            decision,
            identity: None,
            failure: None,
        }
    }

    /// Whether the request may proceed
    pub fn is_allowed(&self) -> bool {
        self.decision == AccessDecision::Allowed
    }
}

/// Per-request admission pipeline
pub struct RequestAdmission<D: UserDirectory> {
    gate: Arc<AuthenticationGate<D>>,
    policy: Arc<AccessPolicy>,
}

impl<D: UserDirectory> RequestAdmission<D> {
    pub fn new(gate: Arc<AuthenticationGate<D>>, policy: Arc<AccessPolicy>) -> Self {
        Self { gate, policy }
    }

    pub fn gate(&self) -> &Arc<AuthenticationGate<D>> {
        &self.gate
    }

    pub fn policy(&self) -> &Arc<AccessPolicy> {
        &self.policy
    }

    /// Decide whether a request may proceed
    pub async fn admit(&self, request: AdmissionRequest) -> Admission {
        if !request.secure_channel {
            return Admission::decided(AccessDecision::RedirectToSecureChannel);
        }

        if !self.policy.requires_authentication(&request.path) {
            return Admission::decided(self.policy.decide(&request.path, false, true));
        }

        let Some(credential) = request.credentials else {
            return Admission::decided(self.policy.decide(&request.path, false, true));
        };

        match self
            .gate
            .authenticate(&credential.identifier, &credential.secret)
            .await
        {
            Ok(identity) => Admission {
                decision: self.policy.decide(&request.path, true, true),
                identity: Some(identity),
                failure: None,
            },
            Err(e) => Admission {
                decision: self.policy.decide(&request.path, false, true),
                identity: None,
                failure: Some(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{GateConfig, PasswordHasher, MIN_HASH_COST};
    use crate::directory::MockUserDirectory;
    use crate::error::DbError;
    use crate::policy::DEFAULT_PUBLIC_PATHS;
    use std::time::Duration;

    fn create_admission(mock_dir: MockUserDirectory) -> RequestAdmission<MockUserDirectory> {
        let config = GateConfig {
            hasher: PasswordHasher::bcrypt(MIN_HASH_COST).unwrap(),
            directory_timeout: Duration::from_millis(500),
        };
        let gate = AuthenticationGate::new(Arc::new(mock_dir), config).unwrap();
        let policy = AccessPolicy::with_public_paths(DEFAULT_PUBLIC_PATHS).unwrap();
        RequestAdmission::new(Arc::new(gate), Arc::new(policy))
    }

    fn stored_test_user() -> StoredIdentity {
        let hash = PasswordHasher::bcrypt(MIN_HASH_COST)
            .unwrap()
            .hash("testPassword")
            .unwrap();
        StoredIdentity::new("testAddress", hash, "testKey")
    }

    // Test 1: public path over a secure channel, no credentials
    #[tokio::test]
    async fn test_public_path_allowed_without_credentials() {
        let mut mock_dir = MockUserDirectory::new();
        mock_dir.expect_find_by_identifier().times(0);

        let admission = create_admission(mock_dir);
        let result = admission.admit(AdmissionRequest::new("/signup", true)).await;

        assert_eq!(result.decision, AccessDecision::Allowed);
        assert!(result.identity.is_none());
        assert!(result.failure.is_none());
    }

    // Test 2: public path with credentials never runs the gate
    #[tokio::test]
    async fn test_public_path_skips_gate_even_with_credentials() {
        let mut mock_dir = MockUserDirectory::new();
        mock_dir.expect_find_by_identifier().times(0);

        let admission = create_admission(mock_dir);
        let request = AdmissionRequest::new("/login", true)
            .with_credentials(Credential::new("testAddress", "wrongPassword"));
        let result = admission.admit(request).await;

        assert_eq!(result.decision, AccessDecision::Allowed);
        assert!(result.failure.is_none());
    }

    // Test 3: protected path without credentials
    #[tokio::test]
    async fn test_protected_path_denied_without_credentials() {
        let mut mock_dir = MockUserDirectory::new();
        mock_dir.expect_find_by_identifier().times(0);

        let admission = create_admission(mock_dir);
        let result = admission.admit(AdmissionRequest::new("/account", true)).await;

        assert_eq!(result.decision, AccessDecision::Denied);
        assert!(result.identity.is_none());
        assert!(result.failure.is_none());
    }

    // Test 4: protected path with valid credentials
    #[tokio::test]
    async fn test_protected_path_allowed_with_valid_credentials() {
        let identity = stored_test_user();
        let mut mock_dir = MockUserDirectory::new();
        mock_dir
            .expect_find_by_identifier()
            .withf(|id| id == "testAddress")
            .times(1)
            .returning(move |_| Ok(Some(identity.clone())));

        let admission = create_admission(mock_dir);
        let request = AdmissionRequest::new("/account", true)
            .with_credentials(Credential::new("testAddress", "testPassword"));
        let result = admission.admit(request).await;

        assert!(result.is_allowed());
        assert_eq!(result.identity.unwrap().identifier, "testAddress");
    }

    // Test 5: protected path with a wrong secret
    #[tokio::test]
    async fn test_protected_path_denied_with_wrong_secret() {
        let identity = stored_test_user();
        let mut mock_dir = MockUserDirectory::new();
        mock_dir
            .expect_find_by_identifier()
            .returning(move |_| Ok(Some(identity.clone())));

        let admission = create_admission(mock_dir);
        let request = AdmissionRequest::new("/account", true)
            .with_credentials(Credential::new("testAddress", "wrongPassword"));
        let result = admission.admit(request).await;

        assert_eq!(result.decision, AccessDecision::Denied);
        assert_eq!(result.failure, Some(AuthError::InvalidCredential));
    }

    // Test 6: insecure channel redirects before credentials are examined
    #[tokio::test]
    async fn test_insecure_channel_redirects_without_touching_credentials() {
        let mut mock_dir = MockUserDirectory::new();
        mock_dir.expect_find_by_identifier().times(0);

        let admission = create_admission(mock_dir);

        let public = admission.admit(AdmissionRequest::new("/login", false)).await;
        assert_eq!(public.decision, AccessDecision::RedirectToSecureChannel);

        let protected = AdmissionRequest::new("/account", false)
            .with_credentials(Credential::new("testAddress", "testPassword"));
        let protected = admission.admit(protected).await;
        assert_eq!(protected.decision, AccessDecision::RedirectToSecureChannel);
        assert!(protected.identity.is_none());
    }

    // Test 7: directory failure is kept for the HTTP layer
    #[tokio::test]
    async fn test_directory_failure_is_reported() {
        let mut mock_dir = MockUserDirectory::new();
        mock_dir
            .expect_find_by_identifier()
            .returning(|_| Err(DbError::Connection("closed".to_string())));

        let admission = create_admission(mock_dir);
        let request = AdmissionRequest::new("/account", true)
            .with_credentials(Credential::new("testAddress", "testPassword"));
        let result = admission.admit(request).await;

        assert_eq!(result.decision, AccessDecision::Denied);
        assert_eq!(result.failure, Some(AuthError::DirectoryUnavailable));
    }

    // Test 8: logout is admitted with or without credentials
    #[tokio::test]
    async fn test_logout_admitted_without_gate() {
        let mut mock_dir = MockUserDirectory::new();
        mock_dir.expect_find_by_identifier().times(0);

        let admission = create_admission(mock_dir);

        let anonymous = admission.admit(AdmissionRequest::new("/logout", true)).await;
        assert_eq!(anonymous.decision, AccessDecision::Allowed);
        assert!(anonymous.failure.is_none());

        let with_credentials = AdmissionRequest::new("/logout", true)
            .with_credentials(Credential::new("testAddress", "wrongPassword"));
        let with_credentials = admission.admit(with_credentials).await;
        assert_eq!(with_credentials.decision, AccessDecision::Allowed);
        assert!(with_credentials.identity.is_none());
    }
}
