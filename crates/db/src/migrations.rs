//! Database schema migrations.
//!
//! This module provides a migration system for upgrading the database schema
//! between versions. Each migration is a SQL script that transforms the schema
//! from one version to the next.
//!
//! # Migration Strategy
//!
//! Migrations are applied sequentially, one version at a time. Each migration
//! is executed in a transaction to ensure atomicity. If a migration fails,
//! the database is left in its previous state.
//!
//! # Adding New Migrations
//!
//! To add a new migration:
//!
//! 1. Increment [`CURRENT_VERSION`]
//! 2. Add a new `Migration` entry to the `MIGRATIONS` array
//! 3. The `from_version` should be the previous `CURRENT_VERSION`
//! 4. Provide idempotent SQL (use `IF NOT EXISTS`, `IF EXISTS`, etc.)
//!
//! # Version Compatibility
//!
//! The migration system will refuse to open a database with a schema version
//! newer than [`CURRENT_VERSION`], preventing data corruption from version
//! mismatches.

use crate::error::DbError;
use crate::schema::{state_keys, CREATE_SCHEMA};
use crate::Result;
use rusqlite::Connection;
use tracing::info;

/// Current database schema version.
///
/// This should be incremented whenever a new migration is added.
pub const CURRENT_VERSION: i32 = 2;

/// Represents a single database migration.
struct Migration {
    /// The schema version this migration upgrades FROM.
    from_version: i32,
    /// The schema version this migration upgrades TO.
    to_version: i32,
    /// SQL statements to execute for the upgrade.
    upgrade_sql: &'static str,
    /// Human-readable description of what this migration does.
    description: &'static str,
}

/// Registry of all available migrations.
///
/// Migrations are ordered by version and applied sequentially. Each migration
/// must have `from_version` equal to the previous migration's `to_version`.
const MIGRATIONS: &[Migration] = &[Migration {
    from_version: 1,
    to_version: 2,
    upgrade_sql: r#"
        CREATE TABLE IF NOT EXISTS amountissued (
            asset      TEXT PRIMARY KEY,
            amountlow  BIGINT NOT NULL,
            amounthigh BIGINT NOT NULL
        );
    "#,
    description: "Add amountissued table for per-asset issuance tracking",
}];

/// Initializes a fresh database with the current schema.
///
/// Creates all tables and records [`CURRENT_VERSION`] as the schema version.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_SCHEMA)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    info!("Initialized fresh database at schema version {}", CURRENT_VERSION);
    Ok(())
}

/// Retrieves the current schema version from the database.
///
/// Returns version 1 if no version is recorded (the initial schema predates
/// version tracking).
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, _> = conn.query_row(
        "SELECT state FROM storestate WHERE statename = ?1",
        [state_keys::DATABASE_SCHEMA],
        |row| row.get(0),
    );

    match result {
        Ok(version_str) => version_str
            .parse()
            .map_err(|_| DbError::Migration(format!("Invalid schema version: {}", version_str))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(1),
        Err(e) => Err(e.into()),
    }
}

/// Records the schema version in the database.
///
/// This is called after each successful migration to update the version tracker.
pub fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO storestate (statename, state) VALUES (?1, ?2)",
        (state_keys::DATABASE_SCHEMA, version.to_string()),
    )?;
    Ok(())
}

/// Checks if the database requires migration.
///
/// Returns `true` if the database schema version is older than [`CURRENT_VERSION`].
pub fn needs_migration(conn: &Connection) -> Result<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < CURRENT_VERSION)
}

/// Runs all necessary migrations to bring the database up to date.
///
/// Migrations are applied sequentially, each in its own transaction.
/// If the database is already at [`CURRENT_VERSION`], this is a no-op.
///
/// # Errors
///
/// Returns an error if:
/// - The database version is newer than [`CURRENT_VERSION`]
/// - A required migration is not found
/// - Any migration SQL fails to execute
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let mut current_version = get_schema_version(conn)?;

    if current_version == CURRENT_VERSION {
        return Ok(());
    }

    if current_version > CURRENT_VERSION {
        return Err(DbError::Migration(format!(
            "Database version {} is newer than supported version {}",
            current_version, CURRENT_VERSION
        )));
    }

    info!(
        "Migrating database from version {} to {}",
        current_version, CURRENT_VERSION
    );

    while current_version < CURRENT_VERSION {
        let migration = MIGRATIONS
            .iter()
            .find(|m| m.from_version == current_version)
            .ok_or_else(|| {
                DbError::Migration(format!(
                    "No migration found from version {}",
                    current_version
                ))
            })?;

        info!(
            "Applying migration {} -> {}: {}",
            migration.from_version, migration.to_version, migration.description
        );

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.upgrade_sql)?;
        set_schema_version(&tx, migration.to_version)?;
        tx.commit()?;

        current_version = migration.to_version;
    }

    Ok(())
}

/// Verifies the database schema is compatible with this software version.
///
/// This is called during initialization to ensure the database can be safely
/// used.
pub fn verify_schema(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version < CURRENT_VERSION {
        return Err(DbError::Migration(format!(
            "Database schema version {} is too old, run migrations first",
            version
        )));
    }

    if version > CURRENT_VERSION {
        return Err(DbError::Migration(format!(
            "Database schema version {} is newer than this software supports ({})",
            version, CURRENT_VERSION
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Schema as it existed before issuance tracking was added.
    const V1_SCHEMA: &str = r#"
        CREATE TABLE storestate (
            statename TEXT PRIMARY KEY,
            state TEXT NOT NULL
        );
        CREATE TABLE ledgerentries (
            entrykey     TEXT PRIMARY KEY,
            lastmodified INTEGER NOT NULL,
            data         BLOB NOT NULL
        );
        CREATE TABLE sponsorship (
            sponsoredid  TEXT PRIMARY KEY,
            sponsoringid TEXT NOT NULL
        );
        CREATE TABLE sponsorshipcounter (
            sponsoringid  TEXT PRIMARY KEY,
            numsponsoring BIGINT NOT NULL
        );
    "#;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn fresh_schema_is_current() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
        assert!(!needs_migration(&conn).unwrap());
        verify_schema(&conn).unwrap();
    }

    #[test]
    fn migrates_v1_database() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(V1_SCHEMA).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
        assert!(needs_migration(&conn).unwrap());
        assert!(!table_exists(&conn, "amountissued"));

        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
        assert!(table_exists(&conn, "amountissued"));
        verify_schema(&conn).unwrap();
    }

    #[test]
    fn refuses_newer_database() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(V1_SCHEMA).unwrap();
        set_schema_version(&conn, CURRENT_VERSION + 1).unwrap();

        assert!(run_migrations(&conn).is_err());
        assert!(verify_schema(&conn).is_err());
    }

    #[test]
    fn run_migrations_is_idempotent_at_current() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }
}
