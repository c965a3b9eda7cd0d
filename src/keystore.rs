// keyring-core — hierarchical deterministic keyring for a shielded wallet
// SPDX-License-Identifier: GPL-3.0-or-later
//
// keystore: the facade (C5) — a persisted, content-addressed collection of
// account records with a lock/unlock lifecycle and atomic password rotation.
//
// Every public method takes `state` for its full duration: a single
// `tokio::sync::Mutex` gives the "one logical mutation at a time" property
// directly from its FIFO wake order, so no separate scheduling logic is
// needed to keep resetPassword's batch rotation serialized against
// concurrent derives or deletes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::collaborators::{ChainQuery, ChainRegistry, KvStore, TransactionBuilder};
use crate::crypto_box::{self, CryptoBox, CryptoBoxParams};
use crate::error::{CoreError, Result};
use crate::mnemonic::{Mnemonic, WordCount};
use crate::shielded;
use crate::transparent::{self, DerivationPath};

const KEY_STORE_KEY: &str = "key-store";
const ACTIVE_ID_KEY: &str = "parent-account-id";

/// Fixed UUIDv5 namespace every account id is derived under.
fn namespace() -> Uuid {
    Uuid::parse_str("9bfceade-37fe-11ed-acc0-a3da3461b38c").expect("valid fixed namespace uuid")
}

/// What kind of secret a record's `crypto` blob decrypts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Mnemonic,
    PrivateKey,
    ShieldedKeys,
}

/// A persisted account. `crypto` holds the encrypted secret payload; every
/// other field is plaintext and safe to log or display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub alias: String,
    pub chain_id: String,
    pub account: u32,
    pub change: u32,
    pub index: Option<u32>,
    pub account_type: AccountType,
    pub address: String,
    pub owner: String,
    #[serde(with = "base64_blob")]
    pub crypto: Vec<u8>,
}

/// A record with its `crypto` blob stripped, as returned by the query ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAccountRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub alias: String,
    pub chain_id: String,
    pub account: u32,
    pub change: u32,
    pub index: Option<u32>,
    pub account_type: AccountType,
    pub address: String,
    pub owner: String,
}

impl From<&AccountRecord> for PublicAccountRecord {
    fn from(r: &AccountRecord) -> Self {
        Self {
            id: r.id.clone(),
            parent_id: r.parent_id.clone(),
            alias: r.alias.clone(),
            chain_id: r.chain_id.clone(),
            account: r.account,
            change: r.change,
            index: r.index,
            account_type: r.account_type,
            address: r.address.clone(),
            owner: r.owner.clone(),
        }
    }
}

mod base64_blob {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// The secret a record's `crypto` blob protects, tagged by account type so
/// encoding/decryption never depends on stringly-typed JSON probing.
enum Secret {
    Mnemonic(Zeroizing<String>),
    Transparent(Zeroizing<String>),
    Shielded { spending_key: String, viewing_key: String },
}

#[derive(Serialize, Deserialize)]
struct ShieldedSecretJson {
    #[serde(rename = "spendingKey")]
    spending_key: String,
    #[serde(rename = "viewingKey")]
    viewing_key: String,
}

fn secret_plaintext(secret: &Secret) -> Result<Zeroizing<Vec<u8>>> {
    match secret {
        Secret::Mnemonic(phrase) => Ok(Zeroizing::new(phrase.as_bytes().to_vec())),
        Secret::Transparent(hex_key) => Ok(Zeroizing::new(hex_key.as_bytes().to_vec())),
        Secret::Shielded { spending_key, viewing_key } => {
            let json = ShieldedSecretJson {
                spending_key: spending_key.clone(),
                viewing_key: viewing_key.clone(),
            };
            serde_json::to_vec(&json)
                .map(Zeroizing::new)
                .map_err(|e| CoreError::KeyStoreError(format!("shielded secret encode: {e}")))
        }
    }
}

fn parse_secret(account_type: AccountType, plaintext: &[u8]) -> Result<Secret> {
    match account_type {
        AccountType::Mnemonic => {
            let phrase = String::from_utf8(plaintext.to_vec())
                .map_err(|e| CoreError::KeyStoreError(format!("phrase decode: {e}")))?;
            Ok(Secret::Mnemonic(Zeroizing::new(phrase)))
        }
        AccountType::PrivateKey => {
            let hex_key = String::from_utf8(plaintext.to_vec())
                .map_err(|e| CoreError::KeyStoreError(format!("privkey decode: {e}")))?;
            Ok(Secret::Transparent(Zeroizing::new(hex_key)))
        }
        AccountType::ShieldedKeys => {
            let json: ShieldedSecretJson = serde_json::from_slice(plaintext)
                .map_err(|e| CoreError::KeyStoreError(format!("shielded secret decode: {e}")))?;
            Ok(Secret::Shielded {
                spending_key: json.spending_key,
                viewing_key: json.viewing_key,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockState {
    Empty,
    Locked,
    Unlocked,
}

struct KeystoreState {
    lock_state: LockState,
    password: Option<Zeroizing<String>>,
    active_id: Option<String>,
}

/// The keyring facade: persisted records, lock/unlock lifecycle, derivation,
/// rotation, and cascading deletion, all serialized through one mutex.
pub struct Keystore {
    kv: Arc<dyn KvStore>,
    chain_registry: Arc<dyn ChainRegistry>,
    tx_builder: Arc<dyn TransactionBuilder>,
    chain_query: Arc<dyn ChainQuery>,
    state: tokio::sync::Mutex<KeystoreState>,
}

impl Keystore {
    pub fn new(
        kv: Arc<dyn KvStore>,
        chain_registry: Arc<dyn ChainRegistry>,
        tx_builder: Arc<dyn TransactionBuilder>,
        chain_query: Arc<dyn ChainQuery>,
    ) -> Self {
        Self {
            kv,
            chain_registry,
            tx_builder,
            chain_query,
            state: tokio::sync::Mutex::new(KeystoreState {
                lock_state: LockState::Empty,
                password: None,
                active_id: None,
            }),
        }
    }

    async fn save_sdk_store(&self, parent_id: &str) -> Result<()> {
        let bytes = self.tx_builder.encode().await?;
        self.kv.put(&format!("sdk-store:{parent_id}"), bytes).await
    }

    /// Sample a fresh phrase. Pure; never touches storage or in-memory state.
    pub fn generate_mnemonic(&self, word_count: WordCount) -> String {
        Mnemonic::generate(word_count).phrase().to_string()
    }

    async fn load_records(&self) -> Result<Vec<AccountRecord>> {
        match self.kv.get(KEY_STORE_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::KeyStoreError(format!("key-store decode: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn save_records(&self, records: &[AccountRecord]) -> Result<()> {
        let bytes = serde_json::to_vec(records)
            .map_err(|e| CoreError::KeyStoreError(format!("key-store encode: {e}")))?;
        self.kv.put(KEY_STORE_KEY, bytes).await
    }

    async fn load_active_id(&self) -> Result<Option<String>> {
        match self.kv.get(ACTIVE_ID_KEY).await? {
            Some(bytes) => Ok(Some(
                String::from_utf8(bytes)
                    .map_err(|e| CoreError::KeyStoreError(format!("active id decode: {e}")))?,
            )),
            None => Ok(None),
        }
    }

    async fn save_active_id(&self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => self.kv.put(ACTIVE_ID_KEY, id.as_bytes().to_vec()).await,
            None => self.kv.put(ACTIVE_ID_KEY, Vec::new()).await,
        }
    }

    /// Import a mnemonic as a new parent account, derive and register its
    /// root transparent key with the transaction builder, and mark it active.
    #[instrument(skip(self, phrase, password), fields(alias = %alias, chain_id = %chain_id))]
    pub async fn store_mnemonic(
        &self,
        phrase: &str,
        password: &str,
        alias: &str,
        chain_id: &str,
    ) -> Result<PublicAccountRecord> {
        if password.is_empty() {
            return Err(CoreError::NoPassword);
        }
        let mnemonic = Mnemonic::from_phrase(phrase)?;
        let chain = self.chain_registry.lookup(chain_id)?;

        let seed = mnemonic.to_seed("");
        let root_path = DerivationPath::root();
        let privkey = transparent::derive_private_key(&seed, chain.coin_type, &root_path)?;
        let pubkey = transparent::compressed_public_key(&privkey)?;
        let address = transparent::encode_implicit_address(&pubkey, &chain.address_hrp, |b| {
            (chain.address_hash)(b)
        })?;

        let mut state = self.state.lock().await;
        let mut records = self.load_records().await?;
        let rank = records.len();
        let id = Uuid::new_v5(&namespace(), format!("{phrase}::{rank}").as_bytes()).to_string();
        if records.iter().any(|r| r.id == id) {
            return Err(CoreError::Duplicate);
        }

        let secret = Secret::Mnemonic(Zeroizing::new(phrase.to_string()));
        let plaintext = secret_plaintext(&secret)?;
        let crypto = crypto_box::encrypt(&plaintext, password, CryptoBoxParams::default())?;
        let record = AccountRecord {
            id: id.clone(),
            parent_id: None,
            alias: alias.to_string(),
            chain_id: chain_id.to_string(),
            account: 0,
            change: 0,
            index: None,
            account_type: AccountType::Mnemonic,
            address: address.clone(),
            owner: address,
            crypto: crypto.to_bytes(),
        };
        records.push(record.clone());
        self.save_records(&records).await?;
        self.save_active_id(Some(&id)).await?;

        let privkey_hex = hex::encode(&*privkey);
        self.tx_builder.add_key(&privkey_hex, password, alias).await?;
        self.save_sdk_store(&id).await?;

        state.lock_state = LockState::Unlocked;
        state.password = Some(Zeroizing::new(password.to_string()));
        state.active_id = Some(id);

        Ok(PublicAccountRecord::from(&record))
    }

    /// Unlock the active parent by verifying `password` against its blob.
    #[instrument(skip(self, password))]
    pub async fn unlock(&self, password: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let active_id = match &state.active_id {
            Some(id) => id.clone(),
            None => self.load_active_id().await?.ok_or(CoreError::UnknownAccount)?,
        };
        let records = self.load_records().await?;
        let parent = records
            .iter()
            .find(|r| r.id == active_id)
            .ok_or(CoreError::UnknownAccount)?;
        let boxed = CryptoBox::from_bytes(&parent.crypto)?;
        if !crypto_box::check_password(&boxed, password) {
            return Err(CoreError::BadPassword);
        }
        state.lock_state = LockState::Unlocked;
        state.password = Some(Zeroizing::new(password.to_string()));
        state.active_id = Some(active_id);
        Ok(())
    }

    /// Forget the cached password. Idempotent.
    #[instrument(skip(self))]
    pub async fn lock(&self) {
        let mut state = self.state.lock().await;
        if state.lock_state == LockState::Unlocked {
            state.lock_state = LockState::Locked;
        }
        state.password = None;
    }

    /// Derive a child account from the active parent's phrase.
    #[instrument(skip(self), fields(alias = %alias, chain_id = %chain_id, account_type = ?account_type))]
    pub async fn derive_account(
        &self,
        path: DerivationPath,
        account_type: AccountType,
        alias: &str,
        chain_id: &str,
    ) -> Result<PublicAccountRecord> {
        let state = self.state.lock().await;
        let password = state.password.clone().ok_or(CoreError::NoPassword)?;
        let active_id = state.active_id.clone().ok_or(CoreError::NoPassword)?;

        let mut records = self.load_records().await?;
        let parent = records
            .iter()
            .find(|r| r.id == active_id)
            .cloned()
            .ok_or(CoreError::UnknownAccount)?;

        let boxed = CryptoBox::from_bytes(&parent.crypto)?;
        let plaintext = crypto_box::decrypt(&boxed, &password)?;
        let phrase = match parse_secret(parent.account_type, &plaintext)? {
            Secret::Mnemonic(phrase) => phrase,
            _ => return Err(CoreError::KeyStoreError("active parent is not a Mnemonic account".to_string())),
        };
        let mnemonic = Mnemonic::from_phrase(&phrase)?;
        let seed = mnemonic.to_seed("");

        let chain = self.chain_registry.lookup(chain_id)?;
        let index = path.index.unwrap_or(0);

        // Carries the raw xsk bytes alongside the Shielded secret so the
        // transaction-builder registration below doesn't need to re-derive.
        let mut xsk_bytes: Option<[u8; shielded::EXTENDED_KEY_LEN]> = None;

        let (secret, address, owner) = match account_type {
            AccountType::ShieldedKeys => {
                let keys = shielded::derive(
                    &seed,
                    index,
                    &chain.spending_key_hrp,
                    &chain.viewing_key_hrp,
                    &chain.payment_address_hrp,
                )?;
                xsk_bytes = Some(keys.xsk_bytes);
                (
                    Secret::Shielded {
                        spending_key: keys.xsk_bech32m.clone(),
                        viewing_key: keys.xfvk_bech32m.clone(),
                    },
                    keys.payment_address_bech32m,
                    keys.xfvk_bech32m,
                )
            }
            AccountType::PrivateKey => {
                let privkey = transparent::derive_private_key(&seed, chain.coin_type, &path)?;
                let pubkey = transparent::compressed_public_key(&privkey)?;
                let address = transparent::encode_implicit_address(&pubkey, &chain.address_hrp, |b| {
                    (chain.address_hash)(b)
                })?;
                (
                    Secret::Transparent(Zeroizing::new(hex::encode(&*privkey))),
                    address.clone(),
                    address,
                )
            }
            AccountType::Mnemonic => {
                return Err(CoreError::KeyStoreError(
                    "cannot derive a Mnemonic-typed child account".to_string(),
                ));
            }
        };

        let kind = match account_type {
            AccountType::ShieldedKeys => "shielded-account",
            _ => "account",
        };
        let id = Uuid::new_v5(
            &namespace(),
            format!("{kind}::{active_id}::{}::{}::{}", path.account, path.change, index).as_bytes(),
        )
        .to_string();
        if records.iter().any(|r| r.id == id) {
            return Err(CoreError::Duplicate);
        }

        let plaintext = secret_plaintext(&secret)?;
        let crypto = crypto_box::encrypt(&plaintext, &password, CryptoBoxParams::default())?;

        let record = AccountRecord {
            id: id.clone(),
            parent_id: Some(active_id.clone()),
            alias: alias.to_string(),
            chain_id: chain_id.to_string(),
            account: path.account,
            change: path.change,
            index: path.index,
            account_type,
            address,
            owner,
            crypto: crypto.to_bytes(),
        };

        match &secret {
            Secret::Transparent(hex_key) => {
                self.tx_builder.add_key(hex_key, &password, alias).await?;
            }
            Secret::Shielded { .. } => {
                let keys_bytes = xsk_bytes.expect("ShieldedKeys branch always sets xsk_bytes");
                self.tx_builder.add_spending_key(&keys_bytes, &password, alias).await?;
            }
            Secret::Mnemonic(_) => unreachable!("Mnemonic children are rejected above"),
        }
        self.save_sdk_store(&active_id).await?;

        records.push(record.clone());
        self.save_records(&records).await?;

        Ok(PublicAccountRecord::from(&record))
    }

    /// Re-encrypt `accountId` and every descendant under `new`, verifying
    /// `old` first. Entirely staged in memory; the single `save_records`
    /// call at the end makes the rotation atomic without an explicit
    /// rollback step — a failure anywhere above it leaves storage untouched.
    #[instrument(skip(self, old, new), fields(account_id = %account_id))]
    pub async fn reset_password(&self, old: &str, new: &str, account_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut records = self.load_records().await?;

        let target_idx = records
            .iter()
            .position(|r| r.id == account_id)
            .ok_or(CoreError::UnknownAccount)?;
        let target_box = CryptoBox::from_bytes(&records[target_idx].crypto)?;
        if !crypto_box::check_password(&target_box, old) {
            return Err(CoreError::BadPassword);
        }

        let mut staged = records.clone();
        for record in staged.iter_mut() {
            let in_scope = record.id == account_id || record.parent_id.as_deref() == Some(account_id);
            if !in_scope {
                continue;
            }
            let boxed = CryptoBox::from_bytes(&record.crypto)?;
            let plaintext = crypto_box::decrypt(&boxed, old)?;
            let re_encrypted = crypto_box::encrypt(&plaintext, new, CryptoBoxParams::default())?;
            record.crypto = re_encrypted.to_bytes();
        }

        records = staged;
        self.save_records(&records).await?;

        if state.active_id.as_deref() == Some(account_id) {
            state.password = Some(Zeroizing::new(new.to_string()));
        }
        Ok(())
    }

    /// Remove `accountId` and every record with `parentId = accountId`.
    #[instrument(skip(self, password), fields(account_id = %account_id))]
    pub async fn delete_account(&self, account_id: &str, password: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let records = self.load_records().await?;

        let target = records
            .iter()
            .find(|r| r.id == account_id)
            .ok_or(CoreError::UnknownAccount)?;
        let boxed = CryptoBox::from_bytes(&target.crypto)?;
        if !crypto_box::check_password(&boxed, password) {
            return Err(CoreError::BadPassword);
        }

        let remaining: Vec<AccountRecord> = records
            .into_iter()
            .filter(|r| r.id != account_id && r.parent_id.as_deref() != Some(account_id))
            .collect();
        self.save_records(&remaining).await?;

        if state.active_id.as_deref() == Some(account_id) {
            state.active_id = None;
            state.password = None;
            state.lock_state = LockState::Empty;
            self.save_active_id(None).await?;
        }
        Ok(())
    }

    /// The active parent plus its children, with `crypto` stripped.
    pub async fn query_accounts(&self) -> Result<Vec<PublicAccountRecord>> {
        let state = self.state.lock().await;
        let active_id = match &state.active_id {
            Some(id) => id.clone(),
            None => return Ok(Vec::new()),
        };
        let records = self.load_records().await?;
        Ok(records
            .iter()
            .filter(|r| r.id == active_id || r.parent_id.as_deref() == Some(active_id.as_str()))
            .map(PublicAccountRecord::from)
            .collect())
    }

    /// Every record of type `Mnemonic`, with `crypto` stripped.
    pub async fn query_parent_accounts(&self) -> Result<Vec<PublicAccountRecord>> {
        let _state = self.state.lock().await;
        let records = self.load_records().await?;
        Ok(records
            .iter()
            .filter(|r| r.account_type == AccountType::Mnemonic)
            .map(PublicAccountRecord::from)
            .collect())
    }

    /// Balances for `accountId`'s owner, reparsed as integers. Empty if the
    /// account is unknown.
    pub async fn query_balances(&self, account_id: &str) -> Result<Vec<(String, u128)>> {
        let _state = self.state.lock().await;
        let records = self.load_records().await?;
        let owner = match records.iter().find(|r| r.id == account_id) {
            Some(r) => r.owner.clone(),
            None => return Ok(Vec::new()),
        };
        let raw = self.chain_query.query_balance(&owner).await?;
        raw.into_iter()
            .map(|(token, amount)| {
                amount
                    .parse::<u128>()
                    .map(|n| (token, n))
                    .map_err(|e| CoreError::KeyStoreError(format!("balance amount decode: {e}")))
            })
            .collect()
    }

    /// Switch the active parent id, without unlocking it.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn set_active_account_id(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let records = self.load_records().await?;
        if !records.iter().any(|r| r.id == id) {
            return Err(CoreError::UnknownAccount);
        }
        self.save_active_id(Some(id)).await?;
        state.active_id = Some(id.to_string());
        state.password = None;
        state.lock_state = LockState::Locked;

        if let Some(bytes) = self.kv.get(&format!("sdk-store:{id}")).await? {
            self.tx_builder.decode(&bytes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{
        MemoryKvStore, RecordingTransactionBuilder, StaticChainRegistry, StubChainQuery,
    };

    const TEST_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn new_keystore() -> Keystore {
        Keystore::new(
            Arc::new(MemoryKvStore::new()),
            Arc::new(StaticChainRegistry::new()),
            Arc::new(RecordingTransactionBuilder::new()),
            Arc::new(StubChainQuery::new()),
        )
    }

    #[tokio::test]
    async fn store_mnemonic_rejects_empty_password() {
        let ks = new_keystore();
        let err = ks.store_mnemonic(TEST_PHRASE, "", "root", "namada").await.unwrap_err();
        assert!(matches!(err, CoreError::NoPassword));
    }

    #[tokio::test]
    async fn s1_create_and_derive_transparent() {
        let ks = new_keystore();
        let parent = ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        assert_eq!(ks.query_accounts().await.unwrap().len(), 1);

        let path = DerivationPath { account: 0, change: 0, index: Some(0) };
        let child = ks
            .derive_account(path, AccountType::PrivateKey, "a", "namada")
            .await
            .unwrap();
        assert_eq!(ks.query_accounts().await.unwrap().len(), 2);
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));

        let expected_id = Uuid::new_v5(
            &namespace(),
            format!("account::{}::0::0::0", parent.id).as_bytes(),
        )
        .to_string();
        assert_eq!(child.id, expected_id);
    }

    #[tokio::test]
    async fn s2_shielded_derive() {
        let ks = new_keystore();
        ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        let path = DerivationPath { account: 0, change: 0, index: Some(0) };
        let child = ks
            .derive_account(path, AccountType::ShieldedKeys, "z", "namada")
            .await
            .unwrap();
        assert_eq!(child.owner, child.owner);
        assert!(child.address.starts_with("ztestsapling1"));
    }

    #[tokio::test]
    async fn s3_password_rotation_preserves_derivation() {
        let ks = new_keystore();
        let parent = ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        let path = DerivationPath { account: 0, change: 0, index: Some(0) };
        ks.derive_account(path, AccountType::PrivateKey, "a", "namada").await.unwrap();

        ks.reset_password("hunter2", "correcthorse", &parent.id).await.unwrap();

        ks.lock().await;
        assert!(ks.unlock("correcthorse").await.is_ok());
        ks.lock().await;
        assert!(matches!(ks.unlock("hunter2").await, Err(CoreError::BadPassword)));
    }

    #[tokio::test]
    async fn s4_delete_cascades() {
        let ks = new_keystore();
        let parent = ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        let path = DerivationPath { account: 0, change: 0, index: Some(0) };
        ks.derive_account(path, AccountType::PrivateKey, "a", "namada").await.unwrap();

        ks.delete_account(&parent.id, "hunter2").await.unwrap();
        assert_eq!(ks.query_accounts().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn s5_bad_password_is_non_destructive() {
        let ks = new_keystore();
        let parent = ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        let err = ks.reset_password("wrong", "new", &parent.id).await.unwrap_err();
        assert!(matches!(err, CoreError::BadPassword));

        ks.lock().await;
        assert!(ks.unlock("hunter2").await.is_ok());
    }

    #[tokio::test]
    async fn s6_lock_unlock() {
        let ks = new_keystore();
        ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        let path = DerivationPath { account: 0, change: 0, index: Some(1) };

        ks.lock().await;
        let err = ks.derive_account(path, AccountType::PrivateKey, "a", "namada").await.unwrap_err();
        assert!(matches!(err, CoreError::NoPassword));

        ks.unlock("hunter2").await.unwrap();
        let path = DerivationPath { account: 0, change: 0, index: Some(1) };
        assert!(ks.derive_account(path, AccountType::PrivateKey, "a", "namada").await.is_ok());
    }

    #[tokio::test]
    async fn deriving_before_any_mnemonic_fails_with_no_password() {
        let ks = new_keystore();
        let path = DerivationPath { account: 0, change: 0, index: Some(0) };
        let err = ks.derive_account(path, AccountType::PrivateKey, "a", "namada").await.unwrap_err();
        assert!(matches!(err, CoreError::NoPassword));
    }

    #[tokio::test]
    async fn query_balances_reparses_amounts_as_integers() {
        let ks = new_keystore();
        let parent = ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        let balances = ks.query_balances(&parent.id).await.unwrap();
        assert_eq!(balances, vec![("untok".to_string(), 0u128)]);
    }

    #[tokio::test]
    async fn query_balances_is_empty_for_unknown_account() {
        let ks = new_keystore();
        ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        assert_eq!(ks.query_balances("bogus").await.unwrap(), Vec::new());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn no_tracing_event_leaks_secrets() {
        let ks = new_keystore();
        let parent = ks.store_mnemonic(TEST_PHRASE, "hunter2", "root", "namada").await.unwrap();
        let path = DerivationPath { account: 0, change: 0, index: Some(0) };
        ks.derive_account(path, AccountType::PrivateKey, "a", "namada").await.unwrap();
        ks.reset_password("hunter2", "correcthorse", &parent.id).await.unwrap();
        ks.lock().await;
        ks.unlock("correcthorse").await.unwrap();

        assert!(!logs_contain("hunter2"));
        assert!(!logs_contain("correcthorse"));
        assert!(!logs_contain(TEST_PHRASE));
    }
}
