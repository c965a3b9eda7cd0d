// keyring-core — hierarchical deterministic keyring for a shielded wallet
// SPDX-License-Identifier: GPL-3.0-or-later
//
// transparent: BIP32/BIP44 secp256k1 derivation + implicit address encoding (C2)
//
// Path rendering: m/44'/<coinType>'/<account>/<change>[/<index>]. Only the
// purpose (44) and coinType segments are hardened; account/change/index are
// not — this keyring's accounts are not meant to isolate compromise the way
// a hardened account segment would, since the account boundary here is the
// Keystore's own record model, not BIP44's.
//
// Types:
//   DerivationPath        — (account, change, index?) tuple
// Functions:
//   derive_private_key()  — seed + coin_type + path -> 32-byte privkey
//   compressed_public_key()
//   encode_implicit_address()

use hmac::{Hmac, Mac};
use k256::ecdsa::SigningKey;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

type HmacSha512 = Hmac<Sha512>;

const HARDENED: u32 = 0x8000_0000;
const PURPOSE: u32 = 44;

/// BIP44-shaped path components used by a single transparent account.
#[derive(Debug, Clone, Copy)]
pub struct DerivationPath {
    pub account: u32,
    pub change: u32,
    pub index: Option<u32>,
}

impl DerivationPath {
    pub fn root() -> Self {
        Self {
            account: 0,
            change: 0,
            index: None,
        }
    }

    /// Render as `m/44'/<coinType>'/<account>/<change>[/<index>]`.
    pub fn render(&self, coin_type: u32) -> String {
        let mut s = format!("m/44'/{}'/{}/{}", coin_type, self.account, self.change);
        if let Some(index) = self.index {
            s.push('/');
            s.push_str(&index.to_string());
        }
        s
    }
}

/// Derive the 32-byte private key for `path` under `coin_type`, starting
/// from a BIP39 seed. Equivalent to BIP32 descent through
/// `[44', coinType', account, change, index?]`, hardening only the first
/// two segments.
pub fn derive_private_key(
    seed: &[u8; 64],
    coin_type: u32,
    path: &DerivationPath,
) -> Result<Zeroizing<[u8; 32]>> {
    let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
        .map_err(|e| CoreError::KeyStoreError(format!("hmac init: {e}")))?;
    mac.update(seed);
    let result = mac.finalize().into_bytes();

    let mut key = Zeroizing::new([0u8; 32]);
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&result[..32]);
    chain_code.copy_from_slice(&result[32..]);

    let mut indices: Vec<u32> = vec![
        PURPOSE | HARDENED,
        coin_type | HARDENED,
        path.account,
        path.change,
    ];
    if let Some(index) = path.index {
        indices.push(index);
    }

    for index in indices {
        let mut mac = HmacSha512::new_from_slice(&chain_code)
            .map_err(|e| CoreError::KeyStoreError(format!("hmac init: {e}")))?;

        if index & HARDENED != 0 {
            mac.update(&[0x00]);
            mac.update(&*key);
        } else {
            let pubkey = compressed_public_key(&key)?;
            mac.update(&pubkey);
        }
        mac.update(&index.to_be_bytes());

        let result = mac.finalize().into_bytes();
        let mut child = [0u8; 32];
        child.copy_from_slice(&result[..32]);

        *key = add_private_keys(&key, &child)?;
        chain_code.copy_from_slice(&result[32..]);
    }

    Ok(key)
}

/// Compressed secp256k1 public key (33 bytes) for a private key.
pub fn compressed_public_key(private_key: &[u8; 32]) -> Result<[u8; 33]> {
    let signing_key = SigningKey::from_bytes(private_key.into())
        .map_err(|e| CoreError::KeyStoreError(format!("invalid private key: {e}")))?;
    let encoded = signing_key.verifying_key().to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}

fn add_private_keys(parent: &[u8; 32], child: &[u8; 32]) -> Result<[u8; 32]> {
    use k256::elliptic_curve::ops::Reduce;
    use k256::{Scalar, U256};

    let parent_scalar = <Scalar as Reduce<U256>>::reduce_bytes(parent.into());
    let child_scalar = <Scalar as Reduce<U256>>::reduce_bytes(child.into());
    let sum = parent_scalar + child_scalar;

    let mut out = [0u8; 32];
    out.copy_from_slice(&sum.to_bytes());
    Ok(out)
}

/// Encode an implicit address: `address_hash(compressed_pubkey)` rendered as
/// bech32m under `hrp`. `address_hash` is supplied by the chain registry so
/// this module stays chain-agnostic.
pub fn encode_implicit_address(
    pubkey_compressed: &[u8; 33],
    hrp: &str,
    address_hash: impl Fn(&[u8]) -> Vec<u8>,
) -> Result<String> {
    let hashed = address_hash(pubkey_compressed);
    let hrp = bech32::Hrp::parse(hrp)
        .map_err(|e| CoreError::KeyStoreError(format!("invalid hrp: {e}")))?;
    bech32::encode::<bech32::Bech32m>(hrp, &hashed)
        .map_err(|e| CoreError::KeyStoreError(format!("bech32m encode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    const TEST_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_seed() -> [u8; 64] {
        let m = crate::mnemonic::Mnemonic::from_phrase(TEST_PHRASE).unwrap();
        *m.to_seed("")
    }

    fn sha256_20(data: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize()[..20].to_vec()
    }

    #[test]
    fn path_renders_only_purpose_and_coin_type_hardened() {
        let path = DerivationPath {
            account: 0,
            change: 0,
            index: Some(3),
        };
        assert_eq!(path.render(877), "m/44'/877'/0/0/3");
    }

    #[test]
    fn root_path_omits_index() {
        assert_eq!(DerivationPath::root().render(877), "m/44'/877'/0/0");
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = test_seed();
        let path = DerivationPath::root();
        let k1 = derive_private_key(&seed, 877, &path).unwrap();
        let k2 = derive_private_key(&seed, 877, &path).unwrap();
        assert_eq!(*k1, *k2);
        assert_ne!(*k1, [0u8; 32]);
    }

    #[test]
    fn different_coin_types_differ() {
        let seed = test_seed();
        let path = DerivationPath::root();
        let k1 = derive_private_key(&seed, 877, &path).unwrap();
        let k2 = derive_private_key(&seed, 118, &path).unwrap();
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn implicit_address_is_deterministic_bech32m() {
        let seed = test_seed();
        let path = DerivationPath::root();
        let privkey = derive_private_key(&seed, 877, &path).unwrap();
        let pubkey = compressed_public_key(&privkey).unwrap();
        let addr1 = encode_implicit_address(&pubkey, "tnam", sha256_20).unwrap();
        let addr2 = encode_implicit_address(&pubkey, "tnam", sha256_20).unwrap();
        assert_eq!(addr1, addr2);
        assert!(addr1.starts_with("tnam1"));
    }
}
