//! Sponsorship counter queries.
//!
//! One row per sponsoring account: the number of reserves it currently
//! sponsors. Kept separate from the sponsorship table so a sponsor's count
//! is a point lookup rather than an aggregate.

use hayashi_common::{from_opaque_base64, to_opaque_base64};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use stellar_xdr::curr::AccountId;

use super::{max_rows, placeholders, row_placeholders};
use crate::error::DbError;

/// Query trait for sponsorship-counter rows.
pub trait SponsorshipCounterQueries {
    /// Loads the sponsoring count for one account.
    ///
    /// Returns `None` if the account sponsors nothing.
    fn load_sponsorship_counter(&self, sponsoring: &AccountId) -> Result<Option<i64>, DbError>;

    /// Loads `(sponsoring, count)` pairs for a set of accounts in batched
    /// statements. Accounts without a row are absent from the result.
    fn bulk_load_sponsorship_counters(
        &self,
        sponsoring: &[AccountId],
    ) -> Result<Vec<(AccountId, i64)>, DbError>;

    /// Inserts or replaces counter rows in batched statements, returning the
    /// total number of affected rows.
    fn bulk_upsert_sponsorship_counters(
        &self,
        rows: &[(AccountId, i64)],
    ) -> Result<usize, DbError>;

    /// Deletes counter rows in batched statements, returning the total
    /// number of affected rows.
    fn bulk_delete_sponsorship_counters(
        &self,
        sponsoring: &[AccountId],
    ) -> Result<usize, DbError>;

    /// Drops and recreates the `sponsorshipcounter` table.
    fn reset_sponsorship_counter_table(&self) -> Result<(), DbError>;
}

impl SponsorshipCounterQueries for Connection {
    fn load_sponsorship_counter(&self, sponsoring: &AccountId) -> Result<Option<i64>, DbError> {
        let key = to_opaque_base64(sponsoring)?;
        Ok(self
            .query_row(
                "SELECT numsponsoring FROM sponsorshipcounter WHERE sponsoringid = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn bulk_load_sponsorship_counters(
        &self,
        sponsoring: &[AccountId],
    ) -> Result<Vec<(AccountId, i64)>, DbError> {
        let mut out = Vec::new();
        for chunk in sponsoring.chunks(max_rows(1)) {
            let mut keys = Vec::with_capacity(chunk.len());
            for id in chunk {
                keys.push(Value::from(to_opaque_base64(id)?));
            }
            let sql = format!(
                "SELECT sponsoringid, numsponsoring FROM sponsorshipcounter \
                 WHERE sponsoringid IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = self.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(keys), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (text, count) = row?;
                out.push((from_opaque_base64(&text)?, count));
            }
        }
        Ok(out)
    }

    fn bulk_upsert_sponsorship_counters(
        &self,
        rows: &[(AccountId, i64)],
    ) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in rows.chunks(max_rows(2)) {
            let mut values = Vec::with_capacity(chunk.len() * 2);
            for (sponsoring, count) in chunk {
                values.push(Value::from(to_opaque_base64(sponsoring)?));
                values.push(Value::from(*count));
            }
            let sql = format!(
                "INSERT INTO sponsorshipcounter (sponsoringid, numsponsoring) VALUES {} \
                 ON CONFLICT(sponsoringid) DO UPDATE SET numsponsoring = excluded.numsponsoring",
                row_placeholders(chunk.len(), 2)
            );
            affected += self.execute(&sql, params_from_iter(values))?;
        }
        Ok(affected)
    }

    fn bulk_delete_sponsorship_counters(
        &self,
        sponsoring: &[AccountId],
    ) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in sponsoring.chunks(max_rows(1)) {
            let mut keys = Vec::with_capacity(chunk.len());
            for id in chunk {
                keys.push(Value::from(to_opaque_base64(id)?));
            }
            let sql = format!(
                "DELETE FROM sponsorshipcounter WHERE sponsoringid IN ({})",
                placeholders(chunk.len())
            );
            affected += self.execute(&sql, params_from_iter(keys))?;
        }
        Ok(affected)
    }

    fn reset_sponsorship_counter_table(&self) -> Result<(), DbError> {
        self.execute_batch(
            r#"
            DROP TABLE IF EXISTS sponsorshipcounter;
            CREATE TABLE sponsorshipcounter (
                sponsoringid  TEXT PRIMARY KEY,
                numsponsoring BIGINT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CREATE_SCHEMA;
    use stellar_xdr::curr::{PublicKey, Uint256};

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn
    }

    fn make_account_id(n: u8) -> AccountId {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(bytes)))
    }

    #[test]
    fn counter_round_trip() {
        let conn = setup_db();
        let sponsor = make_account_id(1);

        assert!(conn.load_sponsorship_counter(&sponsor).unwrap().is_none());

        conn.bulk_upsert_sponsorship_counters(&[(sponsor.clone(), 4)])
            .unwrap();
        assert_eq!(conn.load_sponsorship_counter(&sponsor).unwrap(), Some(4));

        conn.bulk_upsert_sponsorship_counters(&[(sponsor.clone(), 7)])
            .unwrap();
        assert_eq!(conn.load_sponsorship_counter(&sponsor).unwrap(), Some(7));

        let affected = conn
            .bulk_delete_sponsorship_counters(&[sponsor.clone()])
            .unwrap();
        assert_eq!(affected, 1);
        assert!(conn.load_sponsorship_counter(&sponsor).unwrap().is_none());
    }

    #[test]
    fn bulk_load_multiple_counters() {
        let conn = setup_db();
        let a = make_account_id(1);
        let b = make_account_id(2);

        conn.bulk_upsert_sponsorship_counters(&[(a.clone(), 1), (b.clone(), 2)])
            .unwrap();

        let mut loaded = conn
            .bulk_load_sponsorship_counters(&[a.clone(), b.clone(), make_account_id(3)])
            .unwrap();
        loaded.sort_by_key(|(_, n)| *n);
        assert_eq!(loaded, vec![(a, 1), (b, 2)]);
    }
}
