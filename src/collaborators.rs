// keyring-core — hierarchical deterministic keyring for a shielded wallet
// SPDX-License-Identifier: GPL-3.0-or-later
//
// collaborators: trait boundaries for the five external systems this core
// is wired to, plus in-memory implementations used only by tests (C7).
//
// Production callers supply their own `KvStore`/`TransactionBuilder`/
// `ChainRegistry`/`ChainQuery` — a persistence driver, a signing/broadcast
// layer, and a chain metadata table respectively. None of those concerns
// belong in this crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{CoreError, Result};

/// Abstract key-value persistence. The core stores exactly three keys:
/// `key-store`, `sdk-store`, and `parent-account-id`.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// The external signer/broadcaster. The keystore hands it freshly derived
/// secrets so it can build and sign transactions; it never informs
/// derivation or storage decisions here.
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    async fn add_key(&self, priv_hex: &str, password: &str, alias: &str) -> Result<()>;
    async fn add_spending_key(&self, xsk_bytes: &[u8], password: &str, alias: &str) -> Result<()>;
    async fn encode(&self) -> Result<Vec<u8>>;
    async fn decode(&self, bytes: &[u8]) -> Result<()>;
}

/// Per-chain metadata needed for derivation and address encoding.
#[derive(Clone)]
pub struct ChainEntry {
    pub coin_type: u32,
    pub address_hrp: String,
    pub spending_key_hrp: String,
    pub viewing_key_hrp: String,
    pub payment_address_hrp: String,
    pub address_hash: Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>,
}

impl std::fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEntry")
            .field("coin_type", &self.coin_type)
            .field("address_hrp", &self.address_hrp)
            .field("spending_key_hrp", &self.spending_key_hrp)
            .field("viewing_key_hrp", &self.viewing_key_hrp)
            .field("payment_address_hrp", &self.payment_address_hrp)
            .finish_non_exhaustive()
    }
}

/// Maps a chain identifier to the metadata C2/C3 need.
pub trait ChainRegistry: Send + Sync {
    fn lookup(&self, chain_id: &str) -> Result<ChainEntry>;
}

/// External balance lookups, keyed by an account's `owner` field.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    async fn query_balance(&self, owner: &str) -> Result<Vec<(String, String)>>;
}

/// In-memory `KvStore` used by tests and as a development fallback.
#[derive(Default)]
pub struct MemoryKvStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// No-op `TransactionBuilder` recorder used by tests: it remembers what it
/// was told but never builds or signs anything.
#[derive(Default)]
pub struct RecordingTransactionBuilder {
    keys: Mutex<Vec<String>>,
    spending_keys: Mutex<Vec<Vec<u8>>>,
}

impl RecordingTransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_key_count(&self) -> usize {
        self.keys.lock().await.len()
    }

    pub async fn recorded_spending_key_count(&self) -> usize {
        self.spending_keys.lock().await.len()
    }
}

#[async_trait]
impl TransactionBuilder for RecordingTransactionBuilder {
    async fn add_key(&self, priv_hex: &str, _password: &str, alias: &str) -> Result<()> {
        self.keys.lock().await.push(format!("{alias}:{}", priv_hex.len()));
        Ok(())
    }

    async fn add_spending_key(&self, xsk_bytes: &[u8], _password: &str, alias: &str) -> Result<()> {
        self.spending_keys.lock().await.push(xsk_bytes.to_vec());
        let _ = alias;
        Ok(())
    }

    async fn encode(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn decode(&self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// A fixed single-chain registry, sufficient to run the scenarios in the
/// test suite without a caller-supplied one.
pub struct StaticChainRegistry {
    chains: HashMap<String, ChainEntry>,
}

impl StaticChainRegistry {
    pub fn new() -> Self {
        let mut chains = HashMap::new();
        chains.insert(
            "namada".to_string(),
            ChainEntry {
                coin_type: 877,
                address_hrp: "tnam".to_string(),
                spending_key_hrp: "secret-extended-key-test".to_string(),
                viewing_key_hrp: "zxviews".to_string(),
                payment_address_hrp: "ztestsapling".to_string(),
                address_hash: Arc::new(sha256_ripemd160),
            },
        );
        Self { chains }
    }

    pub fn with_entry(mut self, chain_id: &str, entry: ChainEntry) -> Self {
        self.chains.insert(chain_id.to_string(), entry);
        self
    }
}

impl Default for StaticChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainRegistry for StaticChainRegistry {
    fn lookup(&self, chain_id: &str) -> Result<ChainEntry> {
        self.chains
            .get(chain_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownChain(chain_id.to_string()))
    }
}

fn sha256_ripemd160(data: &[u8]) -> Vec<u8> {
    use ripemd::Ripemd160;
    use sha2::{Digest, Sha256};

    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).to_vec()
}

/// Stub `ChainQuery` returning a single fixed balance, used by tests.
#[derive(Default)]
pub struct StubChainQuery;

impl StubChainQuery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChainQuery for StubChainQuery {
    async fn query_balance(&self, _owner: &str) -> Result<Vec<(String, String)>> {
        Ok(vec![("untok".to_string(), "0".to_string())])
    }
}
