use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TransactionType, TxData};
use crate::wallet;

/// Transaction id of the genesis placeholder, shared by all nodes.
pub const GENESIS_TX_ID: &str = "63ec3ac02f822450039df13ddf7c3c0f19bab4acd4dc928c62fcd78d5ebc6dba";

/// Timestamp baked into the genesis block.
pub const GENESIS_TIMESTAMP: i64 = 1_465_154_705;

/// A single block holding an ordered list of transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    /// Seconds since epoch, author-supplied.
    pub timestamp: i64,
    /// Proof-of-work counter.
    pub nonce: u64,
    /// Cached digest of the block's own fields; never trusted, always
    /// recomputed during validation.
    pub hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The fixed genesis block every node agrees on: index 0, previous hash
    /// `"0"`, a constant timestamp and one empty placeholder transaction.
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            previous_hash: String::from("0"),
            timestamp: GENESIS_TIMESTAMP,
            nonce: 0,
            hash: String::new(),
            transactions: vec![Transaction {
                id: GENESIS_TX_ID.to_string(),
                hash: None,
                kind: TransactionType::Regular,
                data: TxData::default(),
            }],
        };
        block.hash = block.compute_hash();
        block
    }

    /// Create a block over the given parent with its hash filled in.
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: i64,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut block = Self {
            index,
            previous_hash,
            timestamp,
            nonce: 0,
            hash: String::new(),
            transactions,
        };
        block.hash = block.compute_hash();
        block
    }

    /// SHA-256 over the block's fields (excluding `hash` itself).
    /// Transactions are serialized deterministically as JSON.
    pub fn compute_hash(&self) -> String {
        let txs_json = serde_json::to_string(&self.transactions).expect("serialize txs");
        let preimage = format!(
            "{}:{}:{}:{}:{}",
            self.index, self.previous_hash, self.timestamp, self.nonce, txs_json
        );
        wallet::hash_hex(preimage.as_bytes())
    }
}
