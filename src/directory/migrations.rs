//! Database migrations for smartsafe-gate
//!
//! This module contains SQL migrations for the SQLite directory schema.

/// SQL statement to create the initial database schema
pub const CREATE_SCHEMA: &str = r#"
-- Stored identities
CREATE TABLE IF NOT EXISTS users (
    identifier TEXT PRIMARY KEY NOT NULL CHECK (length(identifier) > 0),
    hashed_secret TEXT NOT NULL,
    auth_key TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    secret_rotated_at DATETIME
);
"#;

/// Get the migration version
pub fn migration_version() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_to_fresh_connection() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();

        // Idempotent
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        assert_eq!(migration_version(), 1);
    }

    #[test]
    fn test_schema_rejects_empty_identifier() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO users (identifier, hashed_secret, auth_key) VALUES ('', 'h', 'k')",
            [],
        );
        assert!(result.is_err());
    }
}
