// keyring-core — hierarchical deterministic keyring for a shielded wallet
// SPDX-License-Identifier: GPL-3.0-or-later
//
// crypto_box: scrypt-KDF + XChaCha20-Poly1305 password encryption (C4)
//
// Types:
//   CryptoBoxParams — tunable scrypt cost (logN, r, p), defaults 15/8/1
//   CryptoBox       — an encrypted blob, serializable to the exact byte
//                     layout external tooling must also be able to parse
// Functions:
//   encrypt()       — password + plaintext -> CryptoBox
//   decrypt()       — password + CryptoBox -> plaintext
//   check_password()

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use scrypt::Params as ScryptParams;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

const KDF_SCRYPT: u8 = 1;
const AEAD_XCHACHA20POLY1305: u8 = 1;
const FORMAT_VERSION: u8 = 1;

/// Scrypt cost parameters. `log_n` is log2(N); defaults match the spec's
/// baseline of N=2^15, r=8, p=1.
#[derive(Debug, Clone, Copy)]
pub struct CryptoBoxParams {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl Default for CryptoBoxParams {
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
        }
    }
}

/// An encrypted blob: scrypt salt + XChaCha20-Poly1305 nonce/ciphertext/tag,
/// plus the cost parameters needed to re-derive the key on decrypt.
#[derive(Clone)]
pub struct CryptoBox {
    params: CryptoBoxParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

impl std::fmt::Debug for CryptoBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoBox")
            .field("log_n", &self.params.log_n)
            .field("r", &self.params.r)
            .field("p", &self.params.p)
            .field("ciphertext", &format!("[{} bytes]", self.ciphertext.len()))
            .finish()
    }
}

fn derive_key(password: &str, salt: &[u8; SALT_LEN], params: &CryptoBoxParams) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let scrypt_params = ScryptParams::new(params.log_n, params.r, params.p, KEY_LEN)
        .map_err(|e| CoreError::KeyStoreError(format!("invalid scrypt params: {e}")))?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(password.as_bytes(), salt, &scrypt_params, &mut *key)
        .map_err(|e| CoreError::KeyStoreError(format!("scrypt derivation failed: {e}")))?;
    Ok(key)
}

/// Encrypt `plaintext` under `password` using `params` (or the defaults).
pub fn encrypt(plaintext: &[u8], password: &str, params: CryptoBoxParams) -> Result<CryptoBox> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt, &params)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&*key)
        .map_err(|e| CoreError::KeyStoreError(format!("cipher init: {e}")))?;
    let nonce = XNonce::from_slice(&nonce_bytes);

    let mut sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CoreError::KeyStoreError(format!("encryption failed: {e}")))?;

    let tag_offset = sealed.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&sealed[tag_offset..]);
    sealed.truncate(tag_offset);

    Ok(CryptoBox {
        params,
        salt,
        nonce: nonce_bytes,
        ciphertext: sealed,
        tag,
    })
}

/// Decrypt `boxed` under `password`. Fails with `BadPassword` on any AEAD
/// authentication failure — wrong password and corrupted ciphertext are
/// indistinguishable to this layer.
pub fn decrypt(boxed: &CryptoBox, password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let key = derive_key(password, &boxed.salt, &boxed.params)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&*key)
        .map_err(|e| CoreError::KeyStoreError(format!("cipher init: {e}")))?;
    let nonce = XNonce::from_slice(&boxed.nonce);

    let mut sealed = Vec::with_capacity(boxed.ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(&boxed.ciphertext);
    sealed.extend_from_slice(&boxed.tag);

    let plaintext = cipher
        .decrypt(nonce, sealed.as_ref())
        .map_err(|_| CoreError::BadPassword)?;
    Ok(Zeroizing::new(plaintext))
}

/// Check whether `password` unlocks `boxed`, without returning the plaintext.
pub fn check_password(boxed: &CryptoBox, password: &str) -> bool {
    decrypt(boxed, password).is_ok()
}

impl CryptoBox {
    /// Serialize to the portable byte layout: version, kdf+aead ids, scrypt
    /// cost, salt, nonce, length-prefixed ciphertext, length-prefixed tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 1 + 3 + SALT_LEN + 1 + NONCE_LEN + 4 + self.ciphertext.len() + 2 + TAG_LEN);
        out.push(FORMAT_VERSION);
        out.push(KDF_SCRYPT);
        out.push(self.params.log_n);
        out.push(self.params.r as u8);
        out.push(self.params.p as u8);
        out.extend_from_slice(&self.salt);
        out.push(AEAD_XCHACHA20POLY1305);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&(self.ciphertext.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&(TAG_LEN as u16).to_le_bytes());
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse the byte layout written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let version = take_u8(&mut cursor)?;
        if version != FORMAT_VERSION {
            return Err(CoreError::KeyStoreError(format!("unsupported blob version {version}")));
        }
        let kdf_id = take_u8(&mut cursor)?;
        if kdf_id != KDF_SCRYPT {
            return Err(CoreError::KeyStoreError(format!("unsupported kdf id {kdf_id}")));
        }
        let log_n = take_u8(&mut cursor)?;
        let r = take_u8(&mut cursor)? as u32;
        let p = take_u8(&mut cursor)? as u32;
        let salt = take_array::<SALT_LEN>(&mut cursor)?;
        let aead_id = take_u8(&mut cursor)?;
        if aead_id != AEAD_XCHACHA20POLY1305 {
            return Err(CoreError::KeyStoreError(format!("unsupported aead id {aead_id}")));
        }
        let nonce = take_array::<NONCE_LEN>(&mut cursor)?;
        let ct_len = take_u32_le(&mut cursor)? as usize;
        let ciphertext = take_vec(&mut cursor, ct_len)?;
        let tag_len = take_u16_le(&mut cursor)? as usize;
        if tag_len != TAG_LEN {
            return Err(CoreError::KeyStoreError(format!("unexpected tag length {tag_len}")));
        }
        let tag = take_array::<TAG_LEN>(&mut cursor)?;

        Ok(Self {
            params: CryptoBoxParams { log_n, r, p },
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn take_u8(cursor: &mut &[u8]) -> Result<u8> {
    let (&byte, rest) = cursor.split_first().ok_or_else(truncated)?;
    *cursor = rest;
    Ok(byte)
}

fn take_array<const N: usize>(cursor: &mut &[u8]) -> Result<[u8; N]> {
    if cursor.len() < N {
        return Err(truncated());
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&cursor[..N]);
    *cursor = &cursor[N..];
    Ok(out)
}

fn take_vec(cursor: &mut &[u8], len: usize) -> Result<Vec<u8>> {
    if cursor.len() < len {
        return Err(truncated());
    }
    let out = cursor[..len].to_vec();
    *cursor = &cursor[len..];
    Ok(out)
}

fn take_u32_le(cursor: &mut &[u8]) -> Result<u32> {
    let bytes = take_array::<4>(cursor)?;
    Ok(u32::from_le_bytes(bytes))
}

fn take_u16_le(cursor: &mut &[u8]) -> Result<u16> {
    let bytes = take_array::<2>(cursor)?;
    Ok(u16::from_le_bytes(bytes))
}

fn truncated() -> CoreError {
    CoreError::KeyStoreError("truncated crypto box blob".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> CryptoBoxParams {
        CryptoBoxParams { log_n: 4, r: 8, p: 1 }
    }

    #[test]
    fn roundtrip() {
        let data = b"shielded spending key material";
        let boxed = encrypt(data, "correct horse", fast_params()).unwrap();
        let decrypted = decrypt(&boxed, "correct horse").unwrap();
        assert_eq!(&*decrypted, data);
    }

    #[test]
    fn wrong_password_is_bad_password() {
        let boxed = encrypt(b"secret", "right", fast_params()).unwrap();
        let err = decrypt(&boxed, "wrong").unwrap_err();
        assert!(matches!(err, CoreError::BadPassword));
        assert!(!check_password(&boxed, "wrong"));
        assert!(check_password(&boxed, "right"));
    }

    #[test]
    fn byte_layout_roundtrips() {
        let boxed = encrypt(b"payload", "pw", fast_params()).unwrap();
        let bytes = boxed.to_bytes();
        let parsed = CryptoBox::from_bytes(&bytes).unwrap();
        let decrypted = decrypt(&parsed, "pw").unwrap();
        assert_eq!(&*decrypted, b"payload");
    }

    #[test]
    fn different_encryptions_differ() {
        let a = encrypt(b"same", "pw", fast_params()).unwrap();
        let b = encrypt(b"same", "pw", fast_params()).unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn rejects_bad_version_byte() {
        let boxed = encrypt(b"payload", "pw", fast_params()).unwrap();
        let mut bytes = boxed.to_bytes();
        bytes[0] = 9;
        assert!(CryptoBox::from_bytes(&bytes).is_err());
    }
}
