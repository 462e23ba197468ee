//! Per-asset issued-amount queries.
//!
//! The `amountissued` table holds one row per non-native asset: the total
//! number of units currently outstanding, as a 128-bit counter split into two
//! signed 64-bit columns. The split is a raw bit-pattern conversion; see
//! [`hayashi_common::math`].

use hayashi_common::{from_opaque_base64, join_u128, split_u128, to_opaque_base64};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use stellar_xdr::curr::Asset;

use super::{max_rows, placeholders, row_placeholders};
use crate::error::DbError;

/// Query trait for issued-amount rows.
pub trait AmountIssuedQueries {
    /// Loads the issued amount for one asset.
    ///
    /// Returns `None` if the asset has no recorded issuance.
    fn load_amount_issued(&self, asset: &Asset) -> Result<Option<u128>, DbError>;

    /// Loads the issued amounts for a set of assets in batched statements.
    ///
    /// Assets without a row are simply absent from the result.
    fn bulk_load_amount_issued(&self, assets: &[Asset]) -> Result<Vec<(Asset, u128)>, DbError>;

    /// Inserts or replaces issued-amount rows in batched statements.
    ///
    /// Returns the total number of affected rows.
    fn bulk_upsert_amount_issued(&self, rows: &[(Asset, u128)]) -> Result<usize, DbError>;

    /// Deletes issued-amount rows in batched statements.
    ///
    /// Returns the total number of affected rows, which is less than
    /// `assets.len()` when some assets had no row.
    fn bulk_delete_amount_issued(&self, assets: &[Asset]) -> Result<usize, DbError>;

    /// Drops and recreates the `amountissued` table.
    ///
    /// Used only during full-state rebuild.
    fn reset_amount_issued_table(&self) -> Result<(), DbError>;
}

impl AmountIssuedQueries for Connection {
    fn load_amount_issued(&self, asset: &Asset) -> Result<Option<u128>, DbError> {
        let key = to_opaque_base64(asset)?;
        let row = self
            .query_row(
                "SELECT amountlow, amounthigh FROM amountissued WHERE asset = ?1",
                params![key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(row.map(|(lo, hi)| join_u128(lo, hi)))
    }

    fn bulk_load_amount_issued(&self, assets: &[Asset]) -> Result<Vec<(Asset, u128)>, DbError> {
        let mut out = Vec::new();
        for chunk in assets.chunks(max_rows(1)) {
            let mut keys = Vec::with_capacity(chunk.len());
            for asset in chunk {
                keys.push(Value::from(to_opaque_base64(asset)?));
            }
            let sql = format!(
                "SELECT asset, amountlow, amounthigh FROM amountissued WHERE asset IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = self.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(keys), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;
            for row in rows {
                let (text, lo, hi) = row?;
                let asset: Asset = from_opaque_base64(&text)?;
                out.push((asset, join_u128(lo, hi)));
            }
        }
        Ok(out)
    }

    fn bulk_upsert_amount_issued(&self, rows: &[(Asset, u128)]) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in rows.chunks(max_rows(3)) {
            let mut values = Vec::with_capacity(chunk.len() * 3);
            for (asset, amount) in chunk {
                let (lo, hi) = split_u128(*amount);
                values.push(Value::from(to_opaque_base64(asset)?));
                values.push(Value::from(lo));
                values.push(Value::from(hi));
            }
            let sql = format!(
                "INSERT INTO amountissued (asset, amountlow, amounthigh) VALUES {} \
                 ON CONFLICT(asset) DO UPDATE SET \
                 amountlow = excluded.amountlow, amounthigh = excluded.amounthigh",
                row_placeholders(chunk.len(), 3)
            );
            affected += self.execute(&sql, params_from_iter(values))?;
        }
        Ok(affected)
    }

    fn bulk_delete_amount_issued(&self, assets: &[Asset]) -> Result<usize, DbError> {
        let mut affected = 0;
        for chunk in assets.chunks(max_rows(1)) {
            let mut keys = Vec::with_capacity(chunk.len());
            for asset in chunk {
                keys.push(Value::from(to_opaque_base64(asset)?));
            }
            let sql = format!(
                "DELETE FROM amountissued WHERE asset IN ({})",
                placeholders(chunk.len())
            );
            affected += self.execute(&sql, params_from_iter(keys))?;
        }
        Ok(affected)
    }

    fn reset_amount_issued_table(&self) -> Result<(), DbError> {
        self.execute_batch(
            r#"
            DROP TABLE IF EXISTS amountissued;
            CREATE TABLE amountissued (
                asset      TEXT PRIMARY KEY,
                amountlow  BIGINT NOT NULL,
                amounthigh BIGINT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}
