//! SQLite persistence layer for the hayashi ledger-state core.
//!
//! This crate provides durable storage for every record kind the transaction
//! engine manages:
//!
//! - **Protocol entries**: full ledger entries as opaque XDR blobs
//! - **Sponsorships**: sponsored account to sponsoring account mappings
//! - **Sponsorship counters**: per-sponsor reserve counts
//! - **Issued amounts**: per-asset 128-bit issuance counters split into two
//!   signed 64-bit columns
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`pool`]: Connection pool management using r2d2
//! - [`schema`]: Database schema definitions and table layouts
//! - [`migrations`]: Schema versioning and migration system
//! - [`queries`]: Typed query traits for each record kind
//! - [`error`]: Error types for database operations
//!
//! # Usage
//!
//! ```no_run
//! use hayashi_db::Database;
//!
//! // Open a database (creates if it doesn't exist)
//! let db = Database::open("path/to/hayashi.db")?;
//!
//! // Or use an in-memory database for testing
//! let test_db = Database::open_in_memory()?;
//! # Ok::<(), hayashi_db::DbError>(())
//! ```
//!
//! # Query Traits
//!
//! Query functionality is organized into per-kind traits that extend
//! [`rusqlite::Connection`]:
//!
//! ```no_run
//! use hayashi_db::{Database, AmountIssuedQueries};
//! # let asset: stellar_xdr::curr::Asset = unimplemented!();
//!
//! let db = Database::open_in_memory()?;
//! let amount = db.with_connection(|conn| conn.load_amount_issued(&asset))?;
//! # Ok::<(), hayashi_db::DbError>(())
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod schema;

pub use error::DbError;
pub use migrations::{needs_migration, run_migrations, verify_schema, CURRENT_VERSION};
pub use pool::{Database, PooledConnection};
pub use queries::*;

use std::path::Path;
use tracing::info;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// This method will:
    /// 1. Create the parent directory if it doesn't exist
    /// 2. Open or create the SQLite database file
    /// 3. Configure SQLite for performance (WAL mode, cache settings)
    /// 4. Run any pending schema migrations
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory cannot be created
    /// - The database file cannot be opened
    /// - Schema migrations fail
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = r2d2_sqlite::SqliteConnectionManager::file(path);
        let pool = r2d2::Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    /// Opens an in-memory database, primarily for testing.
    ///
    /// The database is initialized with the current schema but data is not
    /// persisted across restarts. The connection pool size is limited to 1
    /// since in-memory databases are connection-specific.
    pub fn open_in_memory() -> Result<Self> {
        let manager = r2d2_sqlite::SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    /// Initializes the database, configuring SQLite and running migrations.
    ///
    /// This is called automatically by [`open`](Database::open) and
    /// [`open_in_memory`](Database::open_in_memory).
    fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;

        // WAL for concurrent reads during writes, NORMAL sync for a balance
        // of safety and speed, 64MB page cache, memory-backed temp storage.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
        "#,
        )?;

        // A fresh database has no storestate table yet.
        let tables_exist: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='storestate'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if tables_exist {
            if migrations::needs_migration(&conn)? {
                info!("Database requires migration");
                migrations::run_migrations(&conn)?;
            }
            migrations::verify_schema(&conn)?;
        } else {
            migrations::initialize_schema(&conn)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_initializes_schema() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            assert!(!migrations::needs_migration(conn)?);
            migrations::verify_schema(conn)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO storestate (statename, state) VALUES ('probe', 'x')",
                [],
            )?;
            Err(DbError::Integrity("forced failure".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM storestate WHERE statename = 'probe'",
                    [],
                    |row| row.get(0),
                )
                .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
