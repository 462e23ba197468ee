//! Ledger-state storage core: record model and layered transaction engine.
//!
//! This crate lets many logically distinct kinds of ledger-derived state
//! (protocol ledger entries, sponsorship relationships, sponsorship
//! counters, per-asset issued-amount counters) be read, mutated, and
//! atomically committed through a single uniform abstraction, with durable
//! persistence through [`hayashi_db`].
//!
//! # Architecture Overview
//!
//! - [`RecordKey`] / [`RecordEntry`]: discriminated key and value types
//!   unifying heterogeneous record kinds under one identity/equality/hash
//!   contract
//! - [`StateStore`]: the layered transaction engine - a stack of nested
//!   frames with copy-on-write deltas, read fallthrough, commit/rollback,
//!   and root-level bulk flush
//! - [`EntryCache`]: root-scoped read-through memoization of resolved
//!   records
//!
//! # Transaction Model
//!
//! A caller opens a root frame, nests child frames per unit of work, and
//! issues loads and upserts/erases against the active leaf:
//!
//! ```no_run
//! use hayashi_db::Database;
//! use hayashi_state::{
//!     IssuedAmountEntry, RecordEntry, RecordKey, StateStore, StateStoreConfig,
//! };
//! # let asset: stellar_xdr::curr::Asset = unimplemented!();
//!
//! let db = Database::open_in_memory()?;
//! let mut store = StateStore::new(db, StateStoreConfig::default());
//!
//! let root = store.open();
//! let op = store.open();
//!
//! // An operation adjusts issuance inside its own frame.
//! let issued = match store.load(op, &RecordKey::issued_amount(asset.clone()))? {
//!     Some(entry) => entry.issued_amount_entry()?.clone().checked_add(90)?,
//!     None => IssuedAmountEntry { asset, amount: 90 },
//! };
//! store.upsert(op, RecordEntry::from(issued))?;
//!
//! store.commit(op)?;   // merge into the root frame, nothing durable yet
//! store.commit(root)?; // type-partitioned bulk flush, all-or-nothing
//! # Ok::<(), hayashi_state::StateError>(())
//! ```
//!
//! Rolling back a frame discards its delta without touching its parent or
//! the backing store. A failed root commit leaves the backing store and the
//! entry cache exactly as they were before the attempt.

mod cache;
mod error;
mod record;
mod store;

pub use cache::{CachedEntry, EntryCache};
pub use error::{Result, StateError};
pub use record::{
    IssuedAmountEntry, IssuedAmountKey, RecordEntry, RecordKey, RecordKind, SponsorshipCounterEntry,
    SponsorshipCounterKey, SponsorshipEntry, SponsorshipKey,
};
pub use store::{ConsistencyMode, FrameHandle, StateStore, StateStoreConfig};
