//! Canonical opaque text encoding for XDR values.
//!
//! The backing store keys rows by a fixed textual encoding of the record's
//! identity (an asset, an account id, a full ledger key). The encoding is the
//! base64 of the value's XDR bytes: XDR serialization is deterministic, so
//! equal values always produce the same string, and it is injective over
//! well-formed values, so distinct values never collide. Collision here would
//! silently merge distinct records' rows, which is why the uniqueness
//! property is tested below rather than assumed.
//!
//! The encoding is a storage key format, not a wire format; nothing outside
//! the persistence layer should parse it.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use stellar_xdr::curr::{Limits, ReadXdr, WriteXdr};

use crate::error::Result;

/// Encode an XDR value into its canonical opaque storage key.
pub fn to_opaque_base64<T: WriteXdr>(value: &T) -> Result<String> {
    let bytes = value.to_xdr(Limits::none())?;
    Ok(BASE64.encode(bytes))
}

/// Decode a value previously encoded with [`to_opaque_base64`].
///
/// Fails if the text is not valid base64 or the decoded bytes are not the
/// XDR of a `T`, either of which indicates backing-store corruption.
pub fn from_opaque_base64<T: ReadXdr>(text: &str) -> Result<T> {
    let bytes = BASE64.decode(text)?;
    Ok(T::from_xdr(bytes, Limits::none())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stellar_xdr::curr::{
        AccountId, AlphaNum12, AlphaNum4, Asset, AssetCode12, AssetCode4, PublicKey, Uint256,
    };

    fn make_account_id(n: u8) -> AccountId {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(bytes)))
    }

    fn make_asset4(code: &str, issuer: u8) -> Asset {
        let mut code_bytes = [0u8; 4];
        code_bytes[..code.len().min(4)].copy_from_slice(&code.as_bytes()[..code.len().min(4)]);
        Asset::CreditAlphanum4(AlphaNum4 {
            asset_code: AssetCode4(code_bytes),
            issuer: make_account_id(issuer),
        })
    }

    #[test]
    fn asset_round_trip() {
        for asset in [Asset::Native, make_asset4("USD", 1), make_asset4("IDR", 7)] {
            let text = to_opaque_base64(&asset).unwrap();
            let back: Asset = from_opaque_base64(&text).unwrap();
            assert_eq!(back, asset);
        }
    }

    #[test]
    fn account_id_round_trip() {
        let id = make_account_id(42);
        let text = to_opaque_base64(&id).unwrap();
        let back: AccountId = from_opaque_base64(&text).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn distinct_assets_encode_differently() {
        let a = make_asset4("USD", 1);
        let b = make_asset4("USD", 2);
        let c = make_asset4("EUR", 1);
        let enc_a = to_opaque_base64(&a).unwrap();
        assert_ne!(enc_a, to_opaque_base64(&b).unwrap());
        assert_ne!(enc_a, to_opaque_base64(&c).unwrap());
        assert_ne!(enc_a, to_opaque_base64(&Asset::Native).unwrap());
    }

    #[test]
    fn rejects_corrupt_text() {
        assert!(from_opaque_base64::<Asset>("not//valid//base64!!!").is_err());
        // Valid base64 that is not a valid Asset XDR.
        assert!(from_opaque_base64::<Asset>(&BASE64.encode([0xffu8; 3])).is_err());
    }

    fn arb_asset() -> impl Strategy<Value = Asset> {
        let code4 = ("[A-Z]{1,4}", any::<u8>()).prop_map(|(code, issuer)| {
            let mut bytes = [0u8; 4];
            bytes[..code.len()].copy_from_slice(code.as_bytes());
            Asset::CreditAlphanum4(AlphaNum4 {
                asset_code: AssetCode4(bytes),
                issuer: make_account_id(issuer),
            })
        });
        let code12 = ("[A-Z]{5,12}", any::<u8>()).prop_map(|(code, issuer)| {
            let mut bytes = [0u8; 12];
            bytes[..code.len()].copy_from_slice(code.as_bytes());
            Asset::CreditAlphanum12(AlphaNum12 {
                asset_code: AssetCode12(bytes),
                issuer: make_account_id(issuer),
            })
        });
        prop_oneof![Just(Asset::Native), code4, code12]
    }

    proptest! {
        // Equal assets canonicalize identically and unequal assets always
        // differ; a collision would merge two assets' issuance totals.
        #[test]
        fn encoding_is_unique(a in arb_asset(), b in arb_asset()) {
            let enc_a = to_opaque_base64(&a).unwrap();
            let enc_b = to_opaque_base64(&b).unwrap();
            prop_assert_eq!(a == b, enc_a == enc_b);
        }

        #[test]
        fn encoding_round_trips(a in arb_asset()) {
            let text = to_opaque_base64(&a).unwrap();
            let back: Asset = from_opaque_base64(&text).unwrap();
            prop_assert_eq!(back, a);
        }
    }
}
