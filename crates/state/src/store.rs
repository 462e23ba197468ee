//! The layered transaction engine.
//!
//! [`StateStore`] stacks nested transaction frames over the backing store.
//! Each frame holds a copy-on-write delta from its parent; loads resolve
//! through the stack (local delta, then parents, then the entry cache, then
//! the per-kind persistence adapter), child commits merge deltas upward, and
//! only the root commit makes anything durable.
//!
//! # Root commit
//!
//! Committing the outermost frame partitions its delta by record kind,
//! splits each kind into upserts and tombstones, and flushes every kind with
//! batched statements inside one enclosing SQL transaction. Affected-row
//! counts are checked against the configured [`ConsistencyMode`]; any
//! failure rolls the SQL transaction back, so callers never observe one
//! kind's data flushed while another kind's flush failed. The entry cache is
//! refreshed only after the SQL transaction commits, before the commit call
//! returns.
//!
//! # Ownership
//!
//! The store is a single logical writer: every operation takes `&mut self`,
//! and at most one leaf frame is active at a time. Operations through a
//! non-leaf handle fail with [`StateError::HasOpenChild`]; handles to closed
//! frames fail with [`StateError::InactiveFrame`].

use std::collections::{HashMap, HashSet};

use hayashi_db::{
    AmountIssuedQueries, Database, DbError, LedgerEntryQueries, SponsorshipCounterQueries,
    SponsorshipQueries,
};
use stellar_xdr::curr::{AccountId, Asset, LedgerEntry, LedgerKey};
use tracing::{debug, info};

use crate::cache::{CachedEntry, EntryCache};
use crate::error::{Result, StateError};
use crate::record::{
    IssuedAmountEntry, RecordEntry, RecordKey, RecordKind, SponsorshipCounterEntry,
    SponsorshipEntry,
};

/// Policy governing affected-row checks for bulk deletions at root commit.
///
/// Upserts must always affect exactly the submitted row count; only
/// deletions are policy-dependent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsistencyMode {
    /// Every submitted deletion must delete exactly one row.
    Exact,
    /// Deletions may target rows that are already gone. Used when
    /// converging from an approximate state, where delete-of-absent is
    /// expected and idempotent.
    ExtraDeletes,
}

/// Tuning for a [`StateStore`].
#[derive(Clone, Copy, Debug)]
pub struct StateStoreConfig {
    /// Affected-row policy for bulk deletions at root commit.
    pub consistency: ConsistencyMode,
    /// Maximum resident entries in the root entry cache.
    pub cache_capacity: usize,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            consistency: ConsistencyMode::Exact,
            cache_capacity: 4096,
        }
    }
}

/// Handle to one open transaction frame.
///
/// Handles are cheap copies; they stay valid until their frame is committed
/// or rolled back and are rejected with [`StateError::InactiveFrame`]
/// afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHandle {
    depth: usize,
    id: u64,
}

/// One level of nested transaction state.
#[derive(Debug)]
struct Frame {
    id: u64,
    /// `None` is a tombstone: the key is deleted at this level even if a
    /// parent or the backing store still has a value.
    delta: HashMap<RecordKey, Option<RecordEntry>>,
}

/// Layered transaction store over ledger-derived state records.
pub struct StateStore {
    db: Database,
    cache: EntryCache,
    consistency: ConsistencyMode,
    frames: Vec<Frame>,
    next_frame_id: u64,
}

impl StateStore {
    /// Creates a store over `db` with the given tuning.
    pub fn new(db: Database, config: StateStoreConfig) -> Self {
        Self {
            db,
            cache: EntryCache::new(config.cache_capacity),
            consistency: config.consistency,
            frames: Vec::new(),
            next_frame_id: 0,
        }
    }

    /// Opens a new transaction frame.
    ///
    /// The first open frame is the root frame; while any frame is open,
    /// further opens nest inside the current leaf. There is no nesting
    /// bound, though lookups walk the stack linearly on a miss.
    pub fn open(&mut self) -> FrameHandle {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        self.frames.push(Frame {
            id,
            delta: HashMap::new(),
        });
        FrameHandle {
            depth: self.frames.len() - 1,
            id,
        }
    }

    /// Number of currently open frames.
    pub fn open_frames(&self) -> usize {
        self.frames.len()
    }

    /// Resolves a key through the frame stack.
    ///
    /// Checks the leaf's delta first (a tombstone resolves to `None`), then
    /// each parent delta down to the root, then the entry cache, and finally
    /// the per-kind persistence adapter, memoizing what the adapter
    /// returned. Returns `None` if no live value exists at any level.
    pub fn load(&mut self, handle: FrameHandle, key: &RecordKey) -> Result<Option<RecordEntry>> {
        self.require_leaf(handle)?;
        for frame in self.frames.iter().rev() {
            if let Some(slot) = frame.delta.get(key) {
                return Ok(slot.clone());
            }
        }
        self.load_root(key)
    }

    /// Records `entry` in the leaf frame's delta under its identity key,
    /// shadowing any parent value until commit or rollback.
    pub fn upsert(&mut self, handle: FrameHandle, entry: RecordEntry) -> Result<()> {
        let key = entry.to_key();
        let frame = self.leaf_mut(handle)?;
        frame.delta.insert(key, Some(entry));
        Ok(())
    }

    /// Records a tombstone for `key` in the leaf frame's delta.
    pub fn erase(&mut self, handle: FrameHandle, key: RecordKey) -> Result<()> {
        let frame = self.leaf_mut(handle)?;
        frame.delta.insert(key, None);
        Ok(())
    }

    /// Commits a frame.
    ///
    /// A nested frame merges its delta into its parent (local entries,
    /// including tombstones, win per key) with no backing-store effect. The
    /// root frame flushes its delta to the backing store; on failure nothing
    /// becomes durable, the frame is consumed, and the caller retries from a
    /// fresh frame.
    pub fn commit(&mut self, handle: FrameHandle) -> Result<()> {
        self.require_leaf(handle)?;
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Err(StateError::InactiveFrame),
        };
        let depth = self.frames.len();
        if let Some(parent) = self.frames.last_mut() {
            debug!(
                entries = frame.delta.len(),
                depth,
                "merged child frame into parent"
            );
            parent.delta.extend(frame.delta);
            return Ok(());
        }
        self.commit_root(frame.delta)
    }

    /// Discards a frame's delta. Parents and the backing store are
    /// unaffected.
    pub fn rollback(&mut self, handle: FrameHandle) -> Result<()> {
        self.require_leaf(handle)?;
        if let Some(frame) = self.frames.pop() {
            debug!(entries = frame.delta.len(), "rolled back frame");
        }
        Ok(())
    }

    /// Warms the entry cache for a set of keys with per-kind bulk loads.
    ///
    /// Keys with no backing row are cached as confirmed absent. Returns the
    /// number of keys that resolved to a live entry. Frame deltas are not
    /// consulted; prefetching affects only root-level resolution.
    pub fn prefetch(&mut self, keys: &HashSet<RecordKey>) -> Result<usize> {
        let mut ledger_keys: Vec<LedgerKey> = Vec::new();
        let mut sponsored: Vec<AccountId> = Vec::new();
        let mut sponsoring: Vec<AccountId> = Vec::new();
        let mut assets: Vec<Asset> = Vec::new();
        for key in keys {
            match key {
                RecordKey::LedgerEntry(k) => ledger_keys.push(k.clone()),
                RecordKey::Sponsorship(k) => sponsored.push(k.sponsored_id.clone()),
                RecordKey::SponsorshipCounter(k) => sponsoring.push(k.sponsoring_id.clone()),
                RecordKey::IssuedAmount(k) => assets.push(k.asset.clone()),
            }
        }

        let mut resolved: HashMap<RecordKey, RecordEntry> = HashMap::new();
        if !ledger_keys.is_empty() {
            for entry in self
                .db
                .with_connection(|conn| conn.bulk_load_ledger_entries(&ledger_keys))?
            {
                let record = RecordEntry::LedgerEntry(entry);
                resolved.insert(record.to_key(), record);
            }
        }
        if !sponsored.is_empty() {
            for (sponsored_id, sponsoring_id) in self
                .db
                .with_connection(|conn| conn.bulk_load_sponsorship(&sponsored))?
            {
                let record = RecordEntry::Sponsorship(SponsorshipEntry {
                    sponsored_id,
                    sponsoring_id,
                });
                resolved.insert(record.to_key(), record);
            }
        }
        if !sponsoring.is_empty() {
            for (sponsoring_id, num_sponsoring) in self
                .db
                .with_connection(|conn| conn.bulk_load_sponsorship_counters(&sponsoring))?
            {
                let record = RecordEntry::SponsorshipCounter(SponsorshipCounterEntry {
                    sponsoring_id,
                    num_sponsoring,
                });
                resolved.insert(record.to_key(), record);
            }
        }
        if !assets.is_empty() {
            for (asset, amount) in self
                .db
                .with_connection(|conn| conn.bulk_load_amount_issued(&assets))?
            {
                let record = RecordEntry::IssuedAmount(IssuedAmountEntry { asset, amount });
                resolved.insert(record.to_key(), record);
            }
        }

        let mut found = 0;
        for key in keys {
            let value = resolved.remove(key);
            if value.is_some() {
                found += 1;
            }
            self.cache.put(key.clone(), value);
        }
        debug!(requested = keys.len(), found, "prefetched records");
        Ok(found)
    }

    /// Drops and recreates one kind's backing table.
    ///
    /// Used only during full-state rebuild. Clears the entry cache, since
    /// cached slots may reference the dropped table. Fails with
    /// [`StateError::HasOpenChild`] while any frame is open.
    pub fn reset(&mut self, kind: RecordKind) -> Result<()> {
        if !self.frames.is_empty() {
            return Err(StateError::HasOpenChild);
        }
        self.db.with_connection(|conn| match kind {
            RecordKind::LedgerEntry => conn.reset_ledger_entries_table(),
            RecordKind::Sponsorship => conn.reset_sponsorship_table(),
            RecordKind::SponsorshipCounter => conn.reset_sponsorship_counter_table(),
            RecordKind::IssuedAmount => conn.reset_amount_issued_table(),
        })?;
        self.cache.clear();
        info!(kind = %kind, "reset backing table");
        Ok(())
    }

    fn require_live(&self, handle: FrameHandle) -> Result<()> {
        match self.frames.get(handle.depth) {
            Some(frame) if frame.id == handle.id => Ok(()),
            _ => Err(StateError::InactiveFrame),
        }
    }

    fn require_leaf(&self, handle: FrameHandle) -> Result<()> {
        self.require_live(handle)?;
        if handle.depth + 1 != self.frames.len() {
            return Err(StateError::HasOpenChild);
        }
        Ok(())
    }

    fn leaf_mut(&mut self, handle: FrameHandle) -> Result<&mut Frame> {
        self.require_leaf(handle)?;
        Ok(&mut self.frames[handle.depth])
    }

    /// Resolves a key at root visibility: cache first, then the matching
    /// persistence adapter, memoizing the result either way.
    fn load_root(&mut self, key: &RecordKey) -> Result<Option<RecordEntry>> {
        if let Some(slot) = self.cache.get(key) {
            return Ok(match slot {
                CachedEntry::Live(entry) => Some(entry.clone()),
                CachedEntry::Absent => None,
            });
        }
        let loaded = self.load_from_store(key)?;
        self.cache.put(key.clone(), loaded.clone());
        Ok(loaded)
    }

    fn load_from_store(&self, key: &RecordKey) -> Result<Option<RecordEntry>> {
        match key {
            RecordKey::LedgerEntry(k) => {
                let entry = self.db.with_connection(|conn| conn.load_ledger_entry(k))?;
                Ok(entry.map(RecordEntry::LedgerEntry))
            }
            RecordKey::Sponsorship(k) => {
                let sponsoring = self
                    .db
                    .with_connection(|conn| conn.load_sponsorship(&k.sponsored_id))?;
                Ok(sponsoring.map(|sponsoring_id| {
                    RecordEntry::Sponsorship(SponsorshipEntry {
                        sponsored_id: k.sponsored_id.clone(),
                        sponsoring_id,
                    })
                }))
            }
            RecordKey::SponsorshipCounter(k) => {
                let count = self
                    .db
                    .with_connection(|conn| conn.load_sponsorship_counter(&k.sponsoring_id))?;
                Ok(count.map(|num_sponsoring| {
                    RecordEntry::SponsorshipCounter(SponsorshipCounterEntry {
                        sponsoring_id: k.sponsoring_id.clone(),
                        num_sponsoring,
                    })
                }))
            }
            RecordKey::IssuedAmount(k) => {
                let amount = self
                    .db
                    .with_connection(|conn| conn.load_amount_issued(&k.asset))?;
                Ok(amount.map(|amount| {
                    RecordEntry::IssuedAmount(IssuedAmountEntry {
                        asset: k.asset.clone(),
                        amount,
                    })
                }))
            }
        }
    }

    /// Flushes the root delta: type-partitioned batched writes inside one
    /// enclosing SQL transaction, then a synchronous cache refresh.
    fn commit_root(&mut self, delta: HashMap<RecordKey, Option<RecordEntry>>) -> Result<()> {
        if delta.is_empty() {
            debug!("root commit with empty delta");
            return Ok(());
        }

        let mut ledger_upserts: Vec<LedgerEntry> = Vec::new();
        let mut ledger_deletes: Vec<LedgerKey> = Vec::new();
        let mut sponsorship_upserts: Vec<(AccountId, AccountId)> = Vec::new();
        let mut sponsorship_deletes: Vec<AccountId> = Vec::new();
        let mut counter_upserts: Vec<(AccountId, i64)> = Vec::new();
        let mut counter_deletes: Vec<AccountId> = Vec::new();
        let mut issued_upserts: Vec<(Asset, u128)> = Vec::new();
        let mut issued_deletes: Vec<Asset> = Vec::new();

        for (key, slot) in &delta {
            match slot {
                Some(RecordEntry::LedgerEntry(e)) => ledger_upserts.push(e.clone()),
                Some(RecordEntry::Sponsorship(e)) => {
                    sponsorship_upserts.push((e.sponsored_id.clone(), e.sponsoring_id.clone()))
                }
                Some(RecordEntry::SponsorshipCounter(e)) => {
                    counter_upserts.push((e.sponsoring_id.clone(), e.num_sponsoring))
                }
                Some(RecordEntry::IssuedAmount(e)) => {
                    issued_upserts.push((e.asset.clone(), e.amount))
                }
                None => match key {
                    RecordKey::LedgerEntry(k) => ledger_deletes.push(k.clone()),
                    RecordKey::Sponsorship(k) => {
                        sponsorship_deletes.push(k.sponsored_id.clone())
                    }
                    RecordKey::SponsorshipCounter(k) => {
                        counter_deletes.push(k.sponsoring_id.clone())
                    }
                    RecordKey::IssuedAmount(k) => issued_deletes.push(k.asset.clone()),
                },
            }
        }

        let upserts = ledger_upserts.len()
            + sponsorship_upserts.len()
            + counter_upserts.len()
            + issued_upserts.len();
        let deletes = delta.len() - upserts;

        let mut conn = self.db.connection()?;
        let tx = conn.transaction().map_err(DbError::from)?;

        if !ledger_upserts.is_empty() {
            let affected = tx.bulk_upsert_ledger_entries(&ledger_upserts)?;
            check_upsert_count(RecordKind::LedgerEntry, ledger_upserts.len(), affected)?;
        }
        if !ledger_deletes.is_empty() {
            let affected = tx.bulk_delete_ledger_entries(&ledger_deletes)?;
            check_delete_count(
                self.consistency,
                RecordKind::LedgerEntry,
                ledger_deletes.len(),
                affected,
            )?;
        }
        if !sponsorship_upserts.is_empty() {
            let affected = tx.bulk_upsert_sponsorship(&sponsorship_upserts)?;
            check_upsert_count(RecordKind::Sponsorship, sponsorship_upserts.len(), affected)?;
        }
        if !sponsorship_deletes.is_empty() {
            let affected = tx.bulk_delete_sponsorship(&sponsorship_deletes)?;
            check_delete_count(
                self.consistency,
                RecordKind::Sponsorship,
                sponsorship_deletes.len(),
                affected,
            )?;
        }
        if !counter_upserts.is_empty() {
            let affected = tx.bulk_upsert_sponsorship_counters(&counter_upserts)?;
            check_upsert_count(
                RecordKind::SponsorshipCounter,
                counter_upserts.len(),
                affected,
            )?;
        }
        if !counter_deletes.is_empty() {
            let affected = tx.bulk_delete_sponsorship_counters(&counter_deletes)?;
            check_delete_count(
                self.consistency,
                RecordKind::SponsorshipCounter,
                counter_deletes.len(),
                affected,
            )?;
        }
        if !issued_upserts.is_empty() {
            let affected = tx.bulk_upsert_amount_issued(&issued_upserts)?;
            check_upsert_count(RecordKind::IssuedAmount, issued_upserts.len(), affected)?;
        }
        if !issued_deletes.is_empty() {
            let affected = tx.bulk_delete_amount_issued(&issued_deletes)?;
            check_delete_count(
                self.consistency,
                RecordKind::IssuedAmount,
                issued_deletes.len(),
                affected,
            )?;
        }

        tx.commit().map_err(DbError::from)?;

        // The delta is durable; refresh the cache before any subsequent load
        // can observe the committed state.
        for (key, slot) in delta {
            self.cache.put(key, slot);
        }
        debug!(upserts, deletes, "flushed root commit");
        Ok(())
    }
}

/// Upserts are insert-or-replace and must affect exactly the submitted row
/// count regardless of consistency mode.
fn check_upsert_count(kind: RecordKind, expected: usize, actual: usize) -> Result<()> {
    if actual != expected {
        return Err(StateError::PersistenceWriteFailed {
            kind,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_delete_count(
    mode: ConsistencyMode,
    kind: RecordKind,
    expected: usize,
    actual: usize,
) -> Result<()> {
    match mode {
        ConsistencyMode::Exact if actual != expected => Err(StateError::ConsistencyViolation {
            kind,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
