//! Database Connection Management
//!
//! This module owns the libsql database handle the tree operations run against.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf; parent directories are created
//! - **Caller-owned schema**: Tables are created by the application, not here
//! - **WAL mode**: Write-Ahead Logging for better concurrency (configurable)
//! - **Explicit transactions**: `BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK` issued as
//!   plain statements so every tree mutation holds the write lock from its first read
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** The busy timeout
//! lets a second writer wait for the first one's transaction instead of failing
//! immediately with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use nestedset_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/tree.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::NestedSetConfig;
use crate::db::error::DatabaseError;
use libsql::{Builder, Connection, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing the libsql connection
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    config: NestedSetConfig,
}

impl DatabaseService {
    /// Open (or create) a database with the default configuration
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - WAL mode cannot be enabled
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::with_config(db_path, NestedSetConfig::default()).await
    }

    /// Open (or create) a database with an explicit configuration
    pub async fn with_config(
        db_path: PathBuf,
        config: NestedSetConfig,
    ) -> Result<Self, DatabaseError> {
        config.validate().map_err(DatabaseError::InvalidConfig)?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            config,
        };

        if service.config.enable_wal {
            let conn = service.connect_with_timeout().await?;
            service
                .execute_pragma(&conn, "PRAGMA journal_mode = WAL")
                .await?;
        }

        tracing::debug!(path = %service.db_path.display(), "Opened nested-set database");

        Ok(service)
    }

    pub fn config(&self) -> &NestedSetConfig {
        &self.config
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(&self, conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Get a raw connection
    ///
    /// Prefer [`connect_with_timeout`](Self::connect_with_timeout) in async code.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with the configured busy timeout applied
    pub async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.config.busy_timeout_ms),
        )
        .await?;

        Ok(conn)
    }

    /// Start a transaction in the configured lock mode
    pub async fn begin(&self, conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute(self.config.transaction_mode.begin_statement(), ())
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
            })?;
        Ok(())
    }

    pub async fn commit(&self, conn: &Connection) -> Result<(), DatabaseError> {
        if let Err(e) = conn.execute("COMMIT", ()).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::sql_execution(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    pub async fn rollback(&self, conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute("ROLLBACK", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to roll back transaction: {}", e))
        })?;
        Ok(())
    }
}
