//! Sponsorship relationship queries.
//!
//! One row per sponsored account, pointing at the account paying its
//! reserves. Account ids are keyed by their opaque canonical encoding.

use hayashi_common::{from_opaque_base64, to_opaque_base64};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use stellar_xdr::curr::AccountId;

use super::{max_rows, placeholders, row_placeholders};
use crate::error::DbError;

/// Query trait for sponsorship rows.
pub trait SponsorshipQueries {
    /// Loads the sponsor of one account.
    ///
    /// Returns `None` if the account is not sponsored.
    fn load_sponsorship(&self, sponsored: &AccountId) -> Result<Option<AccountId>, DbError>;

    /// Loads `(sponsored, sponsoring)` pairs for a set of accounts in
    /// batched statements. Unsponsored accounts are absent from the result.
    fn bulk_load_sponsorship(
        &self,
        sponsored: &[AccountId],
    ) -> Result<Vec<(AccountId, AccountId)>, DbError>;

    /// Inserts or replaces `(sponsored, sponsoring)` rows in batched
    /// statements. Returns the total number of affected rows.
    fn bulk_upsert_sponsorship(
        &self,
        rows: &[(AccountId, AccountId)],
    ) -> Result<usize, DbError>;

    /// Deletes sponsorship rows in batched statements, returning the total
    /// number of affected rows.
    fn bulk_delete_sponsorship(&self, sponsored: &[AccountId]) -> Result<usize, DbError>;

    /// Drops and recreates the `sponsorship` table.
    fn reset_sponsorship_table(&self) -> Result<(), DbError>;
}

impl SponsorshipQueries for Connection {
    fn load_sponsorship(&self, sponsored: &AccountId) -> Result<Option<AccountId>, DbError> {
        let key = to_opaque_base64(sponsored)?;
        let row: Option<String> = self
            .query_row(
                "SELECT sponsoringid FROM sponsorship WHERE sponsoredid = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        row.map(|text| from_opaque_base64(&text).map_err(DbError::from))
            .transpose()
    }

    fn bulk_load_sponsorship(
        &self,
        sponsored: &[AccountId],
    ) -> Result<Vec<(AccountId, AccountId)>, DbError> {
        let mut out = Vec::new();
        for chunk in sponsored.chunks(max_rows(1)) {
            let mut keys = Vec::with_capacity(chunk.len());
            for id in chunk {
                keys.push(Value::from(to_opaque_base64(id)?));
            }
            let sql = format!(
                "SELECT sponsoredid, sponsoringid FROM sponsorship WHERE sponsoredid IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = self.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(keys), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (sponsored_text, sponsoring_text) = row?;
                out.push((
                    from_opaque_base64(&sponsored_text)?,
                    from_opaque_base64(&sponsoring_text)?,
                ));
            }
        }
        Ok(out)
    }

    fn bulk_upsert_sponsorship(
        &self,
        rows: &[(AccountId, AccountId)],
    ) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in rows.chunks(max_rows(2)) {
            let mut values = Vec::with_capacity(chunk.len() * 2);
            for (sponsored, sponsoring) in chunk {
                values.push(Value::from(to_opaque_base64(sponsored)?));
                values.push(Value::from(to_opaque_base64(sponsoring)?));
            }
            let sql = format!(
                "INSERT INTO sponsorship (sponsoredid, sponsoringid) VALUES {} \
                 ON CONFLICT(sponsoredid) DO UPDATE SET sponsoringid = excluded.sponsoringid",
                row_placeholders(chunk.len(), 2)
            );
            affected += self.execute(&sql, params_from_iter(values))?;
        }
        Ok(affected)
    }

    fn bulk_delete_sponsorship(&self, sponsored: &[AccountId]) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in sponsored.chunks(max_rows(1)) {
            let mut keys = Vec::with_capacity(chunk.len());
            for id in chunk {
                keys.push(Value::from(to_opaque_base64(id)?));
            }
            let sql = format!(
                "DELETE FROM sponsorship WHERE sponsoredid IN ({})",
                placeholders(chunk.len())
            );
            affected += self.execute(&sql, params_from_iter(keys))?;
        }
        Ok(affected)
    }

    fn reset_sponsorship_table(&self) -> Result<(), DbError> {
        self.execute_batch(
            r#"
            DROP TABLE IF EXISTS sponsorship;
            CREATE TABLE sponsorship (
                sponsoredid  TEXT PRIMARY KEY,
                sponsoringid TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}
