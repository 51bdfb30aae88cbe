//! Pool management and migrations.

#![allow(clippy::missing_errors_doc)]

use crate::error::StorageError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Ordered schema migrations.
const MIGRATIONS: [(&str, &str); 1] = [(
    "001",
    include_str!("../../migrations/001_reasoning_chains.sql"),
)];

/// `SQLite`-backed chain store.
#[derive(Debug, Clone)]
pub struct SqliteChainStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteChainStore {
    /// Open (or create) the database at `database_path` and migrate it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConnectionFailed`] if the connection fails, or
    /// [`StorageError::MigrationFailed`] if the schema cannot be applied.
    pub async fn new(database_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = database_path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::ConnectionFailed {
                message: format!("Failed to create database directory: {e}"),
            })?;
        }

        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path.display()))
                .map_err(|e| StorageError::ConnectionFailed {
                    message: format!("Invalid database path: {e}"),
                })?
                .journal_mode(SqliteJournalMode::Wal)
                .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed {
                message: format!("Failed to connect to database: {e}"),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!(path = %path.display(), "Chain store opened");

        Ok(store)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConnectionFailed`] if the connection fails.
    pub async fn new_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::ConnectionFailed {
                message: format!("Invalid memory database options: {e}"),
            })?
            .journal_mode(SqliteJournalMode::Wal);

        // one connection so every query sees the same memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed {
                message: format!("Failed to create in-memory database: {e}"),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Apply every migration in order. Each one is idempotent.
    pub(crate) async fn run_migrations(&self) -> Result<(), StorageError> {
        for (version, schema) in MIGRATIONS {
            sqlx::query(schema)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::MigrationFailed {
                    version: version.to_string(),
                    message: format!("Failed to run migration {version}: {e}"),
                })?;
        }
        Ok(())
    }

    /// Build a query error.
    pub(crate) fn query_error(query: &str, message: String) -> StorageError {
        StorageError::QueryFailed {
            query: query.to_string(),
            message,
        }
    }
}
