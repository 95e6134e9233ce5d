//! SQLite implementation of the UserDirectory trait
//!
//! This module provides a SQLite-based directory using rusqlite and
//! tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::{migration_version, CREATE_SCHEMA};
use super::UserDirectory;
use crate::error::DbError;
use crate::models::StoredIdentity;

/// SQLite user directory
pub struct SqliteDirectory {
    conn: Connection,
}

impl SqliteDirectory {
    /// Open a SQLite directory and apply the schema
    ///
    /// Use `:memory:` for an in-memory database or a file path for persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            conn.pragma_update(None, "user_version", migration_version())?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Schema version recorded in the database
    pub async fn schema_version(&self) -> Result<i32, DbError> {
        self.conn
            .call(|conn| {
                let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
                Ok(version)
            })
            .await
            .map_err(Into::into)
    }

    /// Create a new in-memory directory (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }

    /// Count stored identities
    pub async fn count(&self) -> Result<u64, DbError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl UserDirectory for SqliteDirectory {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredIdentity>, DbError> {
        let identifier = identifier.to_string();

        self.conn
            .call(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT identifier, hashed_secret, auth_key, created_at
                        FROM users
                        WHERE identifier = ?1
                        "#,
                        [&identifier],
                        |row| {
                            Ok(StoredIdentity {
                                identifier: row.get(0)?,
                                hashed_secret: row.get(1)?,
                                auth_key: row.get(2)?,
                                created_at: parse_datetime(row.get::<_, Option<String>>(3)?)
                                    .unwrap_or_else(Utc::now),
                            })
                        },
                    )
                    .optional()?;

                Ok(result)
            })
            .await
            .map_err(Into::into)
    }

    async fn save(&self, identity: &StoredIdentity) -> Result<(), DbError> {
        let identifier = identity.identifier.clone();
        let hashed_secret = identity.hashed_secret.clone();
        let auth_key = identity.auth_key.clone();
        let created_at = identity.created_at.to_rfc3339();

        let outcome = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    r#"
                    INSERT INTO users (identifier, hashed_secret, auth_key, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    rusqlite::params![identifier, hashed_secret, auth_key, created_at],
                ))
            })
            .await?;

        match outcome {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DbError::ConstraintViolation(
                    msg.unwrap_or_else(|| "users.identifier".to_string()),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_hashed_secret(
        &self,
        identifier: &str,
        hashed_secret: &str,
    ) -> Result<(), DbError> {
        let identifier = identifier.to_string();
        let hashed_secret = hashed_secret.to_string();
        let now = Utc::now().to_rfc3339();

        let updated = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE users SET hashed_secret = ?1, secret_rotated_at = ?2 WHERE identifier = ?3",
                    rusqlite::params![hashed_secret, now, identifier],
                )?;
                Ok(updated)
            })
            .await?;

        if updated == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

/// Parse a datetime string to DateTime<Utc>
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                // SQLite's CURRENT_TIMESTAMP format
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    })
}
