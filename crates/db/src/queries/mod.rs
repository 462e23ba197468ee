//! Typed query traits for each record kind.
//!
//! Query functionality is organized into one trait per record kind, each
//! implemented on [`rusqlite::Connection`]. Every kind exposes the same five
//! operations: point load, bulk load, bulk upsert, bulk delete, and table
//! reset. Bulk operations issue batched multi-row statements, chunked to stay
//! below SQLite's bind-variable limit, and report the total number of
//! affected rows; the transaction engine compares those counts against its
//! consistency policy.

mod amount_issued;
mod ledger_entries;
mod sponsorship;
mod sponsorship_counter;

pub use amount_issued::AmountIssuedQueries;
pub use ledger_entries::LedgerEntryQueries;
pub use sponsorship::SponsorshipQueries;
pub use sponsorship_counter::SponsorshipCounterQueries;

/// Upper bound on bind variables per statement.
///
/// SQLite's historical default for `SQLITE_MAX_VARIABLE_NUMBER` is 999;
/// staying well below it keeps the batched statements portable across
/// builds.
const MAX_BIND_PARAMS: usize = 900;

/// Maximum rows per batched statement for a table with `cols` bound columns.
fn max_rows(cols: usize) -> usize {
    MAX_BIND_PARAMS / cols
}

/// `?,?,...,?` with `n` placeholders.
fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

/// `(?,...),(?,...)` with `rows` rows of `cols` placeholders each.
fn row_placeholders(rows: usize, cols: usize) -> String {
    let row = format!("({})", placeholders(cols));
    let mut s = String::with_capacity(rows * (row.len() + 1));
    for i in 0..rows {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&row);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
        assert_eq!(row_placeholders(2, 3), "(?,?,?),(?,?,?)");
    }
}
