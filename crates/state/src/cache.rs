//! Read-through entry cache for root-level loads.
//!
//! The cache memoizes what the backing store last returned (or was last told
//! to contain) for a key, including an explicit confirmed-absent marker so a
//! repeated miss does not repeat the round trip. It is owned by the store's
//! root and lives exactly as long as it; the backing store stays
//! authoritative and the cache must never diverge from what the next cold
//! load would return, which is why commits refresh it synchronously and
//! table resets clear it.

use std::collections::HashMap;

use crate::record::{RecordEntry, RecordKey};

/// A resolved cache slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CachedEntry {
    /// The backing store holds this value for the key.
    Live(RecordEntry),
    /// The backing store is known to have no row for the key.
    Absent,
}

/// Bounded map from record key to last known resolved value.
#[derive(Debug)]
pub struct EntryCache {
    entries: HashMap<RecordKey, CachedEntry>,
    capacity: usize,
}

impl EntryCache {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero disables caching entirely.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    /// Looks up the cached slot for a key.
    pub fn get(&self, key: &RecordKey) -> Option<&CachedEntry> {
        self.entries.get(key)
    }

    /// Records the resolved value for a key, `None` meaning confirmed
    /// absent.
    ///
    /// At capacity an arbitrary resident entry is evicted first; the cache
    /// is advisory, so which one does not matter for correctness.
    pub fn put(&mut self, key: RecordKey, value: Option<RecordEntry>) {
        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(evict) = self.entries.keys().next().cloned() {
                self.entries.remove(&evict);
            }
        }
        let slot = match value {
            Some(entry) => CachedEntry::Live(entry),
            None => CachedEntry::Absent,
        };
        self.entries.insert(key, slot);
    }

    /// Drops every cached slot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of resident slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::IssuedAmountEntry;
    use stellar_xdr::curr::{AccountId, AlphaNum4, Asset, AssetCode4, PublicKey, Uint256};

    fn make_asset(issuer: u8) -> Asset {
        let mut issuer_bytes = [0u8; 32];
        issuer_bytes[0] = issuer;
        Asset::CreditAlphanum4(AlphaNum4 {
            asset_code: AssetCode4(*b"TST\0"),
            issuer: AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(issuer_bytes))),
        })
    }

    fn key(issuer: u8) -> RecordKey {
        RecordKey::issued_amount(make_asset(issuer))
    }

    fn entry(issuer: u8, amount: u128) -> RecordEntry {
        RecordEntry::from(IssuedAmountEntry {
            asset: make_asset(issuer),
            amount,
        })
    }

    #[test]
    fn caches_live_and_absent_slots() {
        let mut cache = EntryCache::new(8);
        assert!(cache.get(&key(1)).is_none());

        cache.put(key(1), Some(entry(1, 90)));
        assert_eq!(cache.get(&key(1)), Some(&CachedEntry::Live(entry(1, 90))));

        cache.put(key(2), None);
        assert_eq!(cache.get(&key(2)), Some(&CachedEntry::Absent));
    }

    #[test]
    fn put_overwrites_existing_slot() {
        let mut cache = EntryCache::new(8);
        cache.put(key(1), Some(entry(1, 90)));
        cache.put(key(1), Some(entry(1, 50)));
        assert_eq!(cache.get(&key(1)), Some(&CachedEntry::Live(entry(1, 50))));
        assert_eq!(cache.len(), 1);

        cache.put(key(1), None);
        assert_eq!(cache.get(&key(1)), Some(&CachedEntry::Absent));
    }

    #[test]
    fn evicts_at_capacity() {
        let mut cache = EntryCache::new(2);
        cache.put(key(1), Some(entry(1, 1)));
        cache.put(key(2), Some(entry(2, 2)));
        cache.put(key(3), Some(entry(3, 3)));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(3)).is_some());
    }

    #[test]
    fn overwrite_at_capacity_does_not_evict() {
        let mut cache = EntryCache::new(2);
        cache.put(key(1), Some(entry(1, 1)));
        cache.put(key(2), Some(entry(2, 2)));
        cache.put(key(2), Some(entry(2, 20)));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(1)).is_some());
        assert_eq!(cache.get(&key(2)), Some(&CachedEntry::Live(entry(2, 20))));
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let mut cache = EntryCache::new(0);
        cache.put(key(1), Some(entry(1, 1)));
        assert!(cache.is_empty());
        assert!(cache.get(&key(1)).is_none());
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache = EntryCache::new(8);
        cache.put(key(1), Some(entry(1, 1)));
        cache.put(key(2), None);
        cache.clear();
        assert!(cache.is_empty());
    }
}
