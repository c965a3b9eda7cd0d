// keyring-core — hierarchical deterministic keyring for a shielded wallet
// SPDX-License-Identifier: GPL-3.0-or-later
//
// error: the taxonomy every fallible operation in this crate returns.
//
// Display impls are written to never interpolate secret material — no
// password, phrase, private key, xsk, or ciphertext byte ever reaches a
// CoreError's message. Callers logging these errors get useful context
// without risking a leak.

use thiserror::Error;

/// The full error taxonomy for keyring-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The keystore is locked (or has no active parent) and the operation requires
    /// an unlocked state, or an empty password was supplied to `store_mnemonic`.
    #[error("no password set: keystore is locked or the password was empty")]
    NoPassword,

    /// AEAD authentication failed while decrypting a `crypto` blob.
    #[error("bad password")]
    BadPassword,

    /// An account id or address was not found.
    #[error("unknown account")]
    UnknownAccount,

    /// The chain registry has no entry for the requested chain identifier.
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    /// The mnemonic phrase failed checksum or vocabulary validation.
    #[error("invalid mnemonic phrase")]
    InvalidMnemonic,

    /// Storage I/O failure, or an invariant was violated mid-batch during rotation.
    #[error("keystore error: {0}")]
    KeyStoreError(String),

    /// A record with the computed id already exists.
    #[error("duplicate account")]
    Duplicate,
}

pub type Result<T> = std::result::Result<T, CoreError>;
