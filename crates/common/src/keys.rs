//! Ledger entry to ledger key projection.

use stellar_xdr::curr::{LedgerEntry, LedgerEntryData, LedgerKey};

/// Extract the identity key from a protocol ledger entry.
///
/// Drops the non-key fields of each entry kind, leaving exactly the fields
/// the protocol defines as the entry's identity.
pub fn ledger_entry_key(entry: &LedgerEntry) -> LedgerKey {
    match &entry.data {
        LedgerEntryData::Account(a) => LedgerKey::Account(stellar_xdr::curr::LedgerKeyAccount {
            account_id: a.account_id.clone(),
        }),
        LedgerEntryData::Trustline(t) => {
            LedgerKey::Trustline(stellar_xdr::curr::LedgerKeyTrustLine {
                account_id: t.account_id.clone(),
                asset: t.asset.clone(),
            })
        }
        LedgerEntryData::Offer(o) => LedgerKey::Offer(stellar_xdr::curr::LedgerKeyOffer {
            seller_id: o.seller_id.clone(),
            offer_id: o.offer_id,
        }),
        LedgerEntryData::Data(d) => LedgerKey::Data(stellar_xdr::curr::LedgerKeyData {
            account_id: d.account_id.clone(),
            data_name: d.data_name.clone(),
        }),
        LedgerEntryData::ClaimableBalance(cb) => {
            LedgerKey::ClaimableBalance(stellar_xdr::curr::LedgerKeyClaimableBalance {
                balance_id: cb.balance_id.clone(),
            })
        }
        LedgerEntryData::LiquidityPool(lp) => {
            LedgerKey::LiquidityPool(stellar_xdr::curr::LedgerKeyLiquidityPool {
                liquidity_pool_id: lp.liquidity_pool_id.clone(),
            })
        }
        LedgerEntryData::ContractData(cd) => {
            LedgerKey::ContractData(stellar_xdr::curr::LedgerKeyContractData {
                contract: cd.contract.clone(),
                key: cd.key.clone(),
                durability: cd.durability,
            })
        }
        LedgerEntryData::ContractCode(cc) => {
            LedgerKey::ContractCode(stellar_xdr::curr::LedgerKeyContractCode {
                hash: cc.hash.clone(),
            })
        }
        LedgerEntryData::ConfigSetting(cs) => {
            LedgerKey::ConfigSetting(stellar_xdr::curr::LedgerKeyConfigSetting {
                config_setting_id: cs.discriminant(),
            })
        }
        LedgerEntryData::Ttl(t) => LedgerKey::Ttl(stellar_xdr::curr::LedgerKeyTtl {
            key_hash: t.key_hash.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{
        AccountEntry, AccountEntryExt, AccountId, DataEntry, DataEntryExt, LedgerEntryExt,
        PublicKey, SequenceNumber, String32, String64, Thresholds, Uint256,
    };

    fn make_account_id(n: u8) -> AccountId {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(bytes)))
    }

    fn wrap(data: LedgerEntryData) -> LedgerEntry {
        LedgerEntry {
            last_modified_ledger_seq: 7,
            data,
            ext: LedgerEntryExt::V0,
        }
    }

    #[test]
    fn account_entry_keys_by_account_id() {
        let entry = wrap(LedgerEntryData::Account(AccountEntry {
            account_id: make_account_id(3),
            balance: 100,
            seq_num: SequenceNumber(1),
            num_sub_entries: 0,
            inflation_dest: None,
            flags: 0,
            home_domain: String32::default(),
            thresholds: Thresholds([1, 0, 0, 0]),
            signers: vec![].try_into().unwrap(),
            ext: AccountEntryExt::V0,
        }));

        match ledger_entry_key(&entry) {
            LedgerKey::Account(k) => assert_eq!(k.account_id, make_account_id(3)),
            other => panic!("unexpected key: {:?}", other),
        }
    }

    #[test]
    fn data_entry_key_drops_value() {
        let name = String64::try_from("config".as_bytes().to_vec()).unwrap();
        let entry = wrap(LedgerEntryData::Data(DataEntry {
            account_id: make_account_id(5),
            data_name: name.clone(),
            data_value: vec![1, 2, 3].try_into().unwrap(),
            ext: DataEntryExt::V0,
        }));

        match ledger_entry_key(&entry) {
            LedgerKey::Data(k) => {
                assert_eq!(k.account_id, make_account_id(5));
                assert_eq!(k.data_name, name);
            }
            other => panic!("unexpected key: {:?}", other),
        }
    }
}
