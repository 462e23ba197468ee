//! Database schema definitions.
//!
//! This module contains the complete SQL schema for the ledger-state backing
//! store: one table per record kind plus a key-value table for operational
//! state.
//!
//! # Tables
//!
//! - **State management**: `storestate` - key-value store for node state,
//!   including the schema version
//! - **Protocol entries**: `ledgerentries` - full ledger entries as XDR
//!   blobs keyed by the opaque encoding of their ledger key
//! - **Sponsorships**: `sponsorship` - who sponsors each sponsored account
//! - **Sponsorship counters**: `sponsorshipcounter` - per-sponsor counts
//! - **Issuance**: `amountissued` - per-asset cumulative issued amount,
//!   stored as two signed 64-bit halves of a 128-bit counter
//!
//! # Versioning
//!
//! The schema version is tracked in the `storestate` table and managed by
//! the [`migrations`](crate::migrations) module.

/// Complete SQL schema for initializing a fresh database.
///
/// This creates all tables and indexes needed by the ledger-state core.
/// For existing databases, use the migration system instead of re-running this.
pub const CREATE_SCHEMA: &str = r#"
-- Schema version tracking and operational state
CREATE TABLE IF NOT EXISTS storestate (
    statename TEXT PRIMARY KEY,
    state TEXT NOT NULL
);

-- Full protocol ledger entries, payload opaque to this layer
CREATE TABLE IF NOT EXISTS ledgerentries (
    entrykey     TEXT PRIMARY KEY,
    lastmodified INTEGER NOT NULL,
    data         BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS ledgerentries_lastmodified ON ledgerentries(lastmodified);

-- Sponsorship relationships
CREATE TABLE IF NOT EXISTS sponsorship (
    sponsoredid  TEXT PRIMARY KEY,
    sponsoringid TEXT NOT NULL
);

-- Per-sponsor reserve counters
CREATE TABLE IF NOT EXISTS sponsorshipcounter (
    sponsoringid  TEXT PRIMARY KEY,
    numsponsoring BIGINT NOT NULL
);

-- Per-asset cumulative issued amount, 128 bits as two raw 64-bit halves
CREATE TABLE IF NOT EXISTS amountissued (
    asset      TEXT PRIMARY KEY,
    amountlow  BIGINT NOT NULL,
    amounthigh BIGINT NOT NULL
);
"#;

/// Well-known keys for the `storestate` table.
pub mod state_keys {
    /// Current database schema version.
    ///
    /// Used by the migration system to track schema upgrades.
    pub const DATABASE_SCHEMA: &str = "databaseschema";
}
