//! The variant record model.
//!
//! Ledger-derived state comes in several kinds with different payloads:
//! full protocol ledger entries, sponsorship relationships, sponsorship
//! counters, and per-asset issued-amount counters. [`RecordKey`] and
//! [`RecordEntry`] unify them under one identity/equality/hash contract so
//! the transaction engine can track all of them in a single delta map.
//!
//! # Identity
//!
//! Two keys are equal only if their kinds match and their payload identity
//! matches; the derived `Hash` mixes the variant discriminant with the
//! payload hash, so records of different kinds never collide even when their
//! payload bytes coincide. Keys are immutable values: the hash of a key can
//! never go stale because there is no in-place mutation to invalidate it.
//!
//! # Variant access
//!
//! Engine code matches on the enums exhaustively. The typed accessors
//! (`ledger_key`, `issued_amount_entry`, ...) exist for callers at dynamic
//! boundaries and fail with [`StateError::WrongVariant`] instead of ever
//! returning another kind's payload.

use std::fmt;

use hayashi_common::ledger_entry_key;
use stellar_xdr::curr::{AccountId, Asset, LedgerEntry, LedgerKey};

use crate::error::{Result, StateError};

/// The closed set of record kinds.
///
/// Adding a kind means extending every match site; the compiler enforces the
/// closed-world design.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A full protocol ledger entry (account, trustline, offer, ...).
    LedgerEntry,
    /// A sponsorship relationship, keyed by the sponsored account.
    Sponsorship,
    /// A per-sponsor reserve counter, keyed by the sponsoring account.
    SponsorshipCounter,
    /// A per-asset cumulative issued amount.
    IssuedAmount,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::LedgerEntry => "ledger-entry",
            RecordKind::Sponsorship => "sponsorship",
            RecordKind::SponsorshipCounter => "sponsorship-counter",
            RecordKind::IssuedAmount => "issued-amount",
        };
        f.write_str(name)
    }
}

/// Identity of a sponsorship record: the account whose reserves are paid by
/// someone else.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SponsorshipKey {
    /// The sponsored account.
    pub sponsored_id: AccountId,
}

/// Identity of a sponsorship-counter record: the account paying for others.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SponsorshipCounterKey {
    /// The sponsoring account.
    pub sponsoring_id: AccountId,
}

/// Identity of an issued-amount record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IssuedAmountKey {
    /// The issued asset.
    pub asset: Asset,
}

/// A sponsorship relationship.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsorshipEntry {
    /// The sponsored account.
    pub sponsored_id: AccountId,
    /// The account paying the sponsored account's reserves.
    pub sponsoring_id: AccountId,
}

/// A per-sponsor reserve counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsorshipCounterEntry {
    /// The sponsoring account.
    pub sponsoring_id: AccountId,
    /// Number of reserves this account currently sponsors.
    pub num_sponsoring: i64,
}

/// A per-asset cumulative issued amount.
///
/// The amount is the total units currently outstanding: issued minus
/// returned or burned. It is adjusted by many operation types through the
/// standard load/mutate/commit cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedAmountEntry {
    /// The issued asset.
    pub asset: Asset,
    /// Units currently outstanding.
    pub amount: u128,
}

impl IssuedAmountEntry {
    /// Returns this entry with `delta` more units outstanding.
    ///
    /// Issuance totals must stay exact, so an adjustment past 2^128 - 1
    /// fails with [`StateError::IssuanceOverflow`] rather than saturating.
    pub fn checked_add(mut self, delta: u128) -> Result<Self> {
        self.amount = self
            .amount
            .checked_add(delta)
            .ok_or(StateError::IssuanceOverflow)?;
        Ok(self)
    }

    /// Returns this entry with `delta` fewer units outstanding.
    ///
    /// Fails with [`StateError::IssuanceOverflow`] if more units would be
    /// returned than are outstanding.
    pub fn checked_sub(mut self, delta: u128) -> Result<Self> {
        self.amount = self
            .amount
            .checked_sub(delta)
            .ok_or(StateError::IssuanceOverflow)?;
        Ok(self)
    }
}

/// Discriminated identity key over all record kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Identity of a protocol ledger entry.
    LedgerEntry(LedgerKey),
    /// Identity of a sponsorship record.
    Sponsorship(SponsorshipKey),
    /// Identity of a sponsorship-counter record.
    SponsorshipCounter(SponsorshipCounterKey),
    /// Identity of an issued-amount record.
    IssuedAmount(IssuedAmountKey),
}

impl RecordKey {
    /// Key for the sponsorship record of `sponsored_id`.
    pub fn sponsorship(sponsored_id: AccountId) -> Self {
        RecordKey::Sponsorship(SponsorshipKey { sponsored_id })
    }

    /// Key for the sponsorship counter of `sponsoring_id`.
    pub fn sponsorship_counter(sponsoring_id: AccountId) -> Self {
        RecordKey::SponsorshipCounter(SponsorshipCounterKey { sponsoring_id })
    }

    /// Key for the issued-amount record of `asset`.
    pub fn issued_amount(asset: Asset) -> Self {
        RecordKey::IssuedAmount(IssuedAmountKey { asset })
    }

    /// The key's kind, without touching the payload.
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordKey::LedgerEntry(_) => RecordKind::LedgerEntry,
            RecordKey::Sponsorship(_) => RecordKind::Sponsorship,
            RecordKey::SponsorshipCounter(_) => RecordKind::SponsorshipCounter,
            RecordKey::IssuedAmount(_) => RecordKind::IssuedAmount,
        }
    }

    /// The protocol ledger key, or `WrongVariant`.
    pub fn ledger_key(&self) -> Result<&LedgerKey> {
        match self {
            RecordKey::LedgerEntry(k) => Ok(k),
            other => Err(wrong_variant(RecordKind::LedgerEntry, other.kind())),
        }
    }

    /// The sponsorship key, or `WrongVariant`.
    pub fn sponsorship_key(&self) -> Result<&SponsorshipKey> {
        match self {
            RecordKey::Sponsorship(k) => Ok(k),
            other => Err(wrong_variant(RecordKind::Sponsorship, other.kind())),
        }
    }

    /// The sponsorship-counter key, or `WrongVariant`.
    pub fn sponsorship_counter_key(&self) -> Result<&SponsorshipCounterKey> {
        match self {
            RecordKey::SponsorshipCounter(k) => Ok(k),
            other => Err(wrong_variant(RecordKind::SponsorshipCounter, other.kind())),
        }
    }

    /// The issued-amount key, or `WrongVariant`.
    pub fn issued_amount_key(&self) -> Result<&IssuedAmountKey> {
        match self {
            RecordKey::IssuedAmount(k) => Ok(k),
            other => Err(wrong_variant(RecordKind::IssuedAmount, other.kind())),
        }
    }
}

impl From<LedgerKey> for RecordKey {
    fn from(key: LedgerKey) -> Self {
        RecordKey::LedgerEntry(key)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::LedgerEntry(k) => write!(f, "LedgerEntry({:?})", k),
            RecordKey::Sponsorship(k) => {
                write!(f, "Sponsorship {{ sponsored_id: {:?} }}", k.sponsored_id)
            }
            RecordKey::SponsorshipCounter(k) => write!(
                f,
                "SponsorshipCounter {{ sponsoring_id: {:?} }}",
                k.sponsoring_id
            ),
            RecordKey::IssuedAmount(k) => {
                write!(f, "IssuedAmount {{ asset: {:?} }}", k.asset)
            }
        }
    }
}

/// Discriminated value over all record kinds.
///
/// Values are owned by whichever frame delta currently holds them; once
/// committed to the cache or backing store, ownership transfers there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordEntry {
    /// A full protocol ledger entry.
    LedgerEntry(LedgerEntry),
    /// A sponsorship relationship.
    Sponsorship(SponsorshipEntry),
    /// A per-sponsor reserve counter.
    SponsorshipCounter(SponsorshipCounterEntry),
    /// A per-asset cumulative issued amount.
    IssuedAmount(IssuedAmountEntry),
}

impl RecordEntry {
    /// The entry's kind, without touching the payload.
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordEntry::LedgerEntry(_) => RecordKind::LedgerEntry,
            RecordEntry::Sponsorship(_) => RecordKind::Sponsorship,
            RecordEntry::SponsorshipCounter(_) => RecordKind::SponsorshipCounter,
            RecordEntry::IssuedAmount(_) => RecordKind::IssuedAmount,
        }
    }

    /// Projects the entry to its identity key, dropping non-key fields.
    pub fn to_key(&self) -> RecordKey {
        match self {
            RecordEntry::LedgerEntry(e) => RecordKey::LedgerEntry(ledger_entry_key(e)),
            RecordEntry::Sponsorship(e) => RecordKey::sponsorship(e.sponsored_id.clone()),
            RecordEntry::SponsorshipCounter(e) => {
                RecordKey::sponsorship_counter(e.sponsoring_id.clone())
            }
            RecordEntry::IssuedAmount(e) => RecordKey::issued_amount(e.asset.clone()),
        }
    }

    /// The protocol ledger entry, or `WrongVariant`.
    pub fn ledger_entry(&self) -> Result<&LedgerEntry> {
        match self {
            RecordEntry::LedgerEntry(e) => Ok(e),
            other => Err(wrong_variant(RecordKind::LedgerEntry, other.kind())),
        }
    }

    /// The sponsorship entry, or `WrongVariant`.
    pub fn sponsorship_entry(&self) -> Result<&SponsorshipEntry> {
        match self {
            RecordEntry::Sponsorship(e) => Ok(e),
            other => Err(wrong_variant(RecordKind::Sponsorship, other.kind())),
        }
    }

    /// The sponsorship-counter entry, or `WrongVariant`.
    pub fn sponsorship_counter_entry(&self) -> Result<&SponsorshipCounterEntry> {
        match self {
            RecordEntry::SponsorshipCounter(e) => Ok(e),
            other => Err(wrong_variant(RecordKind::SponsorshipCounter, other.kind())),
        }
    }

    /// The issued-amount entry, or `WrongVariant`.
    pub fn issued_amount_entry(&self) -> Result<&IssuedAmountEntry> {
        match self {
            RecordEntry::IssuedAmount(e) => Ok(e),
            other => Err(wrong_variant(RecordKind::IssuedAmount, other.kind())),
        }
    }
}

impl From<LedgerEntry> for RecordEntry {
    fn from(entry: LedgerEntry) -> Self {
        RecordEntry::LedgerEntry(entry)
    }
}

impl From<SponsorshipEntry> for RecordEntry {
    fn from(entry: SponsorshipEntry) -> Self {
        RecordEntry::Sponsorship(entry)
    }
}

impl From<SponsorshipCounterEntry> for RecordEntry {
    fn from(entry: SponsorshipCounterEntry) -> Self {
        RecordEntry::SponsorshipCounter(entry)
    }
}

impl From<IssuedAmountEntry> for RecordEntry {
    fn from(entry: IssuedAmountEntry) -> Self {
        RecordEntry::IssuedAmount(entry)
    }
}

impl fmt::Display for RecordEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordEntry::LedgerEntry(e) => write!(f, "LedgerEntry({:?})", e),
            RecordEntry::Sponsorship(e) => write!(
                f,
                "Sponsorship {{ sponsored_id: {:?}, sponsoring_id: {:?} }}",
                e.sponsored_id, e.sponsoring_id
            ),
            RecordEntry::SponsorshipCounter(e) => write!(
                f,
                "SponsorshipCounter {{ sponsoring_id: {:?}, num_sponsoring: {} }}",
                e.sponsoring_id, e.num_sponsoring
            ),
            RecordEntry::IssuedAmount(e) => write!(
                f,
                "IssuedAmount {{ asset: {:?}, amount: {} }}",
                e.asset, e.amount
            ),
        }
    }
}

fn wrong_variant(expected: RecordKind, actual: RecordKind) -> StateError {
    StateError::WrongVariant { expected, actual }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use stellar_xdr::curr::{AlphaNum4, AssetCode4, PublicKey, Uint256};

    fn make_account_id(n: u8) -> AccountId {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(bytes)))
    }

    fn make_asset(code: &str, issuer: u8) -> Asset {
        let mut code_bytes = [0u8; 4];
        code_bytes[..code.len().min(4)].copy_from_slice(&code.as_bytes()[..code.len().min(4)]);
        Asset::CreditAlphanum4(AlphaNum4 {
            asset_code: AssetCode4(code_bytes),
            issuer: make_account_id(issuer),
        })
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn accessor_on_matching_variant_returns_payload() {
        let key = RecordKey::issued_amount(make_asset("IDR", 1));
        assert_eq!(key.kind(), RecordKind::IssuedAmount);
        assert_eq!(
            key.issued_amount_key().unwrap().asset,
            make_asset("IDR", 1)
        );
    }

    #[test]
    fn accessor_on_wrong_variant_fails_loudly() {
        let key = RecordKey::sponsorship(make_account_id(1));
        for (result, expected) in [
            (key.ledger_key().err(), RecordKind::LedgerEntry),
            (
                key.sponsorship_counter_key().err(),
                RecordKind::SponsorshipCounter,
            ),
            (key.issued_amount_key().err(), RecordKind::IssuedAmount),
        ] {
            match result {
                Some(StateError::WrongVariant {
                    expected: e,
                    actual,
                }) => {
                    assert_eq!(e, expected);
                    assert_eq!(actual, RecordKind::Sponsorship);
                }
                other => panic!("expected WrongVariant, got {:?}", other),
            }
        }
    }

    #[test]
    fn entry_accessor_on_wrong_variant_fails_loudly() {
        let entry = RecordEntry::from(IssuedAmountEntry {
            asset: make_asset("IDR", 1),
            amount: 90,
        });
        assert!(matches!(
            entry.sponsorship_entry(),
            Err(StateError::WrongVariant {
                expected: RecordKind::Sponsorship,
                actual: RecordKind::IssuedAmount,
            })
        ));
        assert_eq!(entry.issued_amount_entry().unwrap().amount, 90);
    }

    #[test]
    fn keys_of_same_kind_compare_by_payload() {
        let a = RecordKey::issued_amount(make_asset("IDR", 1));
        let b = RecordKey::issued_amount(make_asset("IDR", 1));
        let c = RecordKey::issued_amount(make_asset("USD", 1));

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn keys_of_different_kinds_never_compare_equal() {
        // Identical payload bytes under different discriminants.
        let sponsorship = RecordKey::sponsorship(make_account_id(7));
        let counter = RecordKey::sponsorship_counter(make_account_id(7));

        assert_ne!(sponsorship, counter);
        assert_ne!(hash_of(&sponsorship), hash_of(&counter));
    }

    #[test]
    fn entry_projects_to_its_key() {
        let sponsorship = RecordEntry::from(SponsorshipEntry {
            sponsored_id: make_account_id(1),
            sponsoring_id: make_account_id(2),
        });
        assert_eq!(
            sponsorship.to_key(),
            RecordKey::sponsorship(make_account_id(1))
        );

        let counter = RecordEntry::from(SponsorshipCounterEntry {
            sponsoring_id: make_account_id(2),
            num_sponsoring: 3,
        });
        assert_eq!(
            counter.to_key(),
            RecordKey::sponsorship_counter(make_account_id(2))
        );

        let issued = RecordEntry::from(IssuedAmountEntry {
            asset: make_asset("IDR", 1),
            amount: 90,
        });
        assert_eq!(
            issued.to_key(),
            RecordKey::issued_amount(make_asset("IDR", 1))
        );
    }

    #[test]
    fn checked_issuance_arithmetic() {
        let entry = IssuedAmountEntry {
            asset: make_asset("IDR", 1),
            amount: u128::MAX - 1,
        };

        let bumped = entry.clone().checked_add(1).unwrap();
        assert_eq!(bumped.amount, u128::MAX);
        assert!(matches!(
            bumped.clone().checked_add(1),
            Err(StateError::IssuanceOverflow)
        ));

        let drained = bumped.checked_sub(u128::MAX).unwrap();
        assert_eq!(drained.amount, 0);
        assert!(matches!(
            drained.checked_sub(1),
            Err(StateError::IssuanceOverflow)
        ));
    }

    #[test]
    fn display_names_the_kind() {
        let key = RecordKey::issued_amount(make_asset("IDR", 1));
        assert!(key.to_string().starts_with("IssuedAmount"));

        let entry = RecordEntry::from(SponsorshipCounterEntry {
            sponsoring_id: make_account_id(2),
            num_sponsoring: 3,
        });
        let text = entry.to_string();
        assert!(text.starts_with("SponsorshipCounter"));
        assert!(text.contains("num_sponsoring: 3"));
    }
}
