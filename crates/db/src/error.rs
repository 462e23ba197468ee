//! Database error types.

use thiserror::Error;

/// Errors that can occur during database operations.
///
/// This enum consolidates all error types from the persistence layer,
/// providing a unified error type for callers. Most variants wrap underlying
/// errors from SQLite, the connection pool, or serialization.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite database error.
    ///
    /// Wraps errors from rusqlite including query failures, constraint
    /// violations, and database corruption.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    ///
    /// Occurs when a connection cannot be obtained from the pool,
    /// typically due to pool exhaustion or configuration issues.
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File system I/O error.
    ///
    /// Occurs during database file operations such as creating the
    /// database file or its parent directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XDR serialization/deserialization error.
    ///
    /// Occurs when reading or writing XDR-encoded entry payloads. This can
    /// indicate data corruption or a protocol version mismatch.
    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    /// Opaque key encoding error.
    ///
    /// Occurs when a stored primary key cannot be decoded back into its
    /// source value, which indicates backing-store corruption.
    #[error("Opaque encoding error: {0}")]
    Encoding(#[from] hayashi_common::Error),

    /// Data integrity violation.
    ///
    /// Indicates that data in the database is in an unexpected state, such
    /// as missing required fields or inconsistent relationships between
    /// records.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Schema migration error.
    ///
    /// Occurs during database initialization or upgrade when the schema
    /// version is incompatible or a migration fails to apply.
    #[error("Migration error: {0}")]
    Migration(String),
}
