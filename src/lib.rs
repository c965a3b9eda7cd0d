// keyring-core — hierarchical deterministic keyring for a shielded wallet
// SPDX-License-Identifier: GPL-3.0-or-later
//
// A password-protected, content-addressed keyring for a privacy-preserving
// wallet: BIP39 phrases seed both a transparent (BIP32/BIP44 secp256k1)
// and a shielded (ZIP32 Sapling) key hierarchy, and every secret at rest
// is wrapped in a scrypt + XChaCha20-Poly1305 encrypted blob.
//
// Modules:
//   error         — the CoreError taxonomy every fallible operation returns
//   mnemonic      — BIP39 phrase generation, validation, seed expansion
//   transparent   — BIP32/BIP44 secp256k1 derivation + implicit addressing
//   shielded      — ZIP32 Sapling derivation + key/address encoding
//   crypto_box    — password-based encryption of arbitrary secret payloads
//   collaborators — trait boundaries for external systems + test doubles
//   keystore      — the facade: persisted records, lock state, rotation

pub mod collaborators;
pub mod crypto_box;
pub mod error;
pub mod keystore;
pub mod mnemonic;
pub mod shielded;
pub mod transparent;

pub use error::{CoreError, Result};
pub use keystore::{AccountRecord, AccountType, Keystore, PublicAccountRecord};
pub use mnemonic::{Mnemonic, WordCount};
