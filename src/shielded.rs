// keyring-core — hierarchical deterministic keyring for a shielded wallet
// SPDX-License-Identifier: GPL-3.0-or-later
//
// shielded: ZIP32 Sapling derivation — extended spending/viewing keys and
// payment addresses (C3)
//
// Operation: derive(seed, index) -> (xsk, xfvk, paymentAddr), derived as a
// single hardened child of the Sapling master key at `index`. All three
// results are deterministic functions of (seed, index) alone.

use sapling_crypto::zip32::{ExtendedFullViewingKey, ExtendedSpendingKey};
use zip32::ChildIndex;

use crate::error::{CoreError, Result};

/// Byte length of both `ExtendedSpendingKey` and `ExtendedFullViewingKey`
/// encodings: 1 (depth) + 4 (parent fvk tag) + 4 (child index) + 32 (chain
/// code) + 96 (expsk/fvk) + 32 (dk).
pub const EXTENDED_KEY_LEN: usize = 169;

/// A derived shielded account: an extended spending key plus the full
/// viewing key and default payment address it authorizes.
#[derive(Debug, Clone)]
pub struct ShieldedKeys {
    pub xsk_bytes: [u8; EXTENDED_KEY_LEN],
    pub xsk_bech32m: String,
    pub xfvk_bech32m: String,
    pub payment_address_bech32m: String,
}

/// Derive the shielded account at `index` from a BIP39 seed, encoding the
/// spending key, viewing key, and default payment address as bech32m under
/// the given HRPs (supplied by the chain registry).
pub fn derive(
    seed: &[u8; 64],
    index: u32,
    spending_key_hrp: &str,
    viewing_key_hrp: &str,
    payment_address_hrp: &str,
) -> Result<ShieldedKeys> {
    let master = ExtendedSpendingKey::master(seed);
    let child_index = ChildIndex::hardened(index);
    let xsk = master.derive_child(child_index);

    let xsk_bytes: [u8; EXTENDED_KEY_LEN] = xsk
        .to_bytes()
        .try_into()
        .map_err(|_| CoreError::KeyStoreError("unexpected xsk encoding length".to_string()))?;

    let xfvk = ExtendedFullViewingKey::from(&xsk);
    let xfvk_bytes: Vec<u8> = xfvk.to_bytes().to_vec();

    let dfvk = xfvk.to_diversifiable_full_viewing_key();
    let (_, payment_address) = dfvk.default_address();
    let payment_address_bytes = payment_address.to_bytes();

    let xsk_bech32m = encode_bech32m(spending_key_hrp, &xsk_bytes)?;
    let xfvk_bech32m = encode_bech32m(viewing_key_hrp, &xfvk_bytes)?;
    let payment_address_bech32m = encode_bech32m(payment_address_hrp, &payment_address_bytes)?;

    Ok(ShieldedKeys {
        xsk_bytes,
        xsk_bech32m,
        xfvk_bech32m,
        payment_address_bech32m,
    })
}

fn encode_bech32m(hrp: &str, data: &[u8]) -> Result<String> {
    let hrp = bech32::Hrp::parse(hrp)
        .map_err(|e| CoreError::KeyStoreError(format!("invalid hrp: {e}")))?;
    bech32::encode::<bech32::Bech32m>(hrp, data)
        .map_err(|e| CoreError::KeyStoreError(format!("bech32m encode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_seed() -> [u8; 64] {
        let m = crate::mnemonic::Mnemonic::from_phrase(TEST_PHRASE).unwrap();
        *m.to_seed("")
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = test_seed();
        let a = derive(&seed, 0, "secret-extended-key-test", "zxviews", "ztestsapling").unwrap();
        let b = derive(&seed, 0, "secret-extended-key-test", "zxviews", "ztestsapling").unwrap();
        assert_eq!(a.xsk_bytes, b.xsk_bytes);
        assert_eq!(a.xfvk_bech32m, b.xfvk_bech32m);
        assert_eq!(a.payment_address_bech32m, b.payment_address_bech32m);
    }

    #[test]
    fn different_indices_differ() {
        let seed = test_seed();
        let a = derive(&seed, 0, "secret-extended-key-test", "zxviews", "ztestsapling").unwrap();
        let b = derive(&seed, 1, "secret-extended-key-test", "zxviews", "ztestsapling").unwrap();
        assert_ne!(a.xsk_bytes, b.xsk_bytes);
        assert_ne!(a.payment_address_bech32m, b.payment_address_bech32m);
    }

    #[test]
    fn xsk_is_169_bytes_and_bech32m_encoded() {
        let seed = test_seed();
        let keys = derive(&seed, 0, "secret-extended-key-test", "zxviews", "ztestsapling").unwrap();
        assert_eq!(keys.xsk_bytes.len(), EXTENDED_KEY_LEN);
        assert!(keys.xsk_bech32m.starts_with("secret-extended-key-test1"));
        assert!(keys.payment_address_bech32m.starts_with("ztestsapling1"));
    }
}
