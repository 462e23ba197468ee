//! Protocol ledger entry queries.
//!
//! Full protocol entries are stored as XDR blobs keyed by the opaque
//! encoding of their ledger key; the payload stays opaque to this layer.
//! The `lastmodified` column mirrors the entry's own
//! `last_modified_ledger_seq` for range scans during maintenance.

use hayashi_common::{ledger_entry_key, to_opaque_base64};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use stellar_xdr::curr::{LedgerEntry, LedgerKey, Limits, ReadXdr, WriteXdr};

use super::{max_rows, placeholders, row_placeholders};
use crate::error::DbError;

/// Query trait for protocol ledger entries.
pub trait LedgerEntryQueries {
    /// Loads one ledger entry by its key.
    fn load_ledger_entry(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>, DbError>;

    /// Loads the entries for a set of keys in batched statements.
    ///
    /// Keys without a row are simply absent from the result.
    fn bulk_load_ledger_entries(&self, keys: &[LedgerKey]) -> Result<Vec<LedgerEntry>, DbError>;

    /// Inserts or replaces ledger entries in batched statements, returning
    /// the total number of affected rows.
    fn bulk_upsert_ledger_entries(&self, entries: &[LedgerEntry]) -> Result<usize, DbError>;

    /// Deletes ledger entries in batched statements, returning the total
    /// number of affected rows.
    fn bulk_delete_ledger_entries(&self, keys: &[LedgerKey]) -> Result<usize, DbError>;

    /// Drops and recreates the `ledgerentries` table.
    fn reset_ledger_entries_table(&self) -> Result<(), DbError>;
}

impl LedgerEntryQueries for Connection {
    fn load_ledger_entry(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>, DbError> {
        let text = to_opaque_base64(key)?;
        let data: Option<Vec<u8>> = self
            .query_row(
                "SELECT data FROM ledgerentries WHERE entrykey = ?1",
                params![text],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|bytes| LedgerEntry::from_xdr(&bytes, Limits::none()).map_err(DbError::from))
            .transpose()
    }

    fn bulk_load_ledger_entries(&self, keys: &[LedgerKey]) -> Result<Vec<LedgerEntry>, DbError> {
        let mut out = Vec::new();
        for chunk in keys.chunks(max_rows(1)) {
            let mut texts = Vec::with_capacity(chunk.len());
            for key in chunk {
                texts.push(Value::from(to_opaque_base64(key)?));
            }
            let sql = format!(
                "SELECT data FROM ledgerentries WHERE entrykey IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = self.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(texts), |row| row.get::<_, Vec<u8>>(0))?;
            for row in rows {
                out.push(LedgerEntry::from_xdr(&row?, Limits::none())?);
            }
        }
        Ok(out)
    }

    fn bulk_upsert_ledger_entries(&self, entries: &[LedgerEntry]) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in entries.chunks(max_rows(3)) {
            let mut values = Vec::with_capacity(chunk.len() * 3);
            for entry in chunk {
                let key = ledger_entry_key(entry);
                values.push(Value::from(to_opaque_base64(&key)?));
                values.push(Value::from(entry.last_modified_ledger_seq as i64));
                values.push(Value::from(entry.to_xdr(Limits::none())?));
            }
            let sql = format!(
                "INSERT INTO ledgerentries (entrykey, lastmodified, data) VALUES {} \
                 ON CONFLICT(entrykey) DO UPDATE SET \
                 lastmodified = excluded.lastmodified, data = excluded.data",
                row_placeholders(chunk.len(), 3)
            );
            affected += self.execute(&sql, params_from_iter(values))?;
        }
        Ok(affected)
    }

    fn bulk_delete_ledger_entries(&self, keys: &[LedgerKey]) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in keys.chunks(max_rows(1)) {
            let mut texts = Vec::with_capacity(chunk.len());
            for key in chunk {
                texts.push(Value::from(to_opaque_base64(key)?));
            }
            let sql = format!(
                "DELETE FROM ledgerentries WHERE entrykey IN ({})",
                placeholders(chunk.len())
            );
            affected += self.execute(&sql, params_from_iter(texts))?;
        }
        Ok(affected)
    }

    fn reset_ledger_entries_table(&self) -> Result<(), DbError> {
        self.execute_batch(
            r#"
            DROP TABLE IF EXISTS ledgerentries;
            CREATE TABLE ledgerentries (
                entrykey     TEXT PRIMARY KEY,
                lastmodified INTEGER NOT NULL,
                data         BLOB NOT NULL
            );
            CREATE INDEX ledgerentries_lastmodified ON ledgerentries(lastmodified);
            "#,
        )?;
        Ok(())
    }
}
