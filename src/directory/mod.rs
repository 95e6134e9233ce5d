//! User directory for smartsafe-gate
//!
//! This module defines the directory trait consumed by the authentication
//! gate and the account service, plus its SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDirectory;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::StoredIdentity;

/// Storage of identities keyed by their unique identifier
///
/// Implementations may block on external storage; callers must not hold
/// locks across these calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up an identity by identifier
    async fn find_by_identifier(&self, identifier: &str)
        -> Result<Option<StoredIdentity>, DbError>;

    /// Persist a new identity
    ///
    /// Fails with `DbError::ConstraintViolation` if the identifier is taken.
    async fn save(&self, identity: &StoredIdentity) -> Result<(), DbError>;

    /// Replace the hashed secret of an existing identity
    ///
    /// Fails with `DbError::NotFound` if no identity matches.
    async fn update_hashed_secret(&self, identifier: &str, hashed_secret: &str)
        -> Result<(), DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_directory_find() {
        let mut mock = MockUserDirectory::new();

        mock.expect_find_by_identifier()
            .withf(|id| id == "testAddress")
            .returning(|_| Ok(Some(StoredIdentity::new("testAddress", "hash", "testKey"))));

        let result = mock.find_by_identifier("testAddress").await.unwrap();
        assert_eq!(result.unwrap().auth_key, "testKey");
    }

    #[tokio::test]
    async fn test_mock_directory_absent() {
        let mut mock = MockUserDirectory::new();

        mock.expect_find_by_identifier().returning(|_| Ok(None));

        let result = mock.find_by_identifier("nobody").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mock_directory_error_handling() {
        let mut mock = MockUserDirectory::new();

        mock.expect_save()
            .returning(|_| Err(DbError::ConstraintViolation("identifier".to_string())));

        let identity = StoredIdentity::new("testAddress", "hash", "testKey");
        match mock.save(&identity).await {
            Err(DbError::ConstraintViolation(_)) => (),
            _ => panic!("Expected DbError::ConstraintViolation"),
        }
    }
}
