//! Disk persistence: the chain and the pending pool as two JSON snapshots,
//! rewritten wholesale after every validated mutation.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::blockchain::Block;
use crate::error::Result;
use crate::transaction::Transaction;

const BLOCKS_FILE: &str = "blocks.json";
const TRANSACTIONS_FILE: &str = "transactions.json";

/// Paths of the two snapshot files under a node's data directory.
#[derive(Debug)]
pub struct ChainStore {
    blocks_path: PathBuf,
    transactions_path: PathBuf,
}

impl ChainStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: &Path) -> Result<Self> {
        if !data_dir.exists() {
            fs::create_dir_all(data_dir)?;
        }
        Ok(Self {
            blocks_path: data_dir.join(BLOCKS_FILE),
            transactions_path: data_dir.join(TRANSACTIONS_FILE),
        })
    }

    /// Load the persisted chain; an absent file reads as an empty chain.
    pub fn read_blocks(&self) -> Result<Vec<Block>> {
        read_json(&self.blocks_path)
    }

    pub fn write_blocks(&self, blocks: &[Block]) -> Result<()> {
        write_json(&self.blocks_path, blocks)
    }

    /// Load the persisted pending pool; an absent file reads as empty.
    pub fn read_transactions(&self) -> Result<Vec<Transaction>> {
        read_json(&self.transactions_path)
    }

    pub fn write_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        write_json(&self.transactions_path, transactions)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut buf = String::new();
    File::open(path)?.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

fn write_json<T: serde::Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    let mut f = File::create(path)?;
    f.write_all(json.as_bytes())?;
    debug!("wrote {} entries to {}", items.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempdir().unwrap();
        let store = ChainStore::open(dir.path()).unwrap();
        assert!(store.read_blocks().unwrap().is_empty());
        assert!(store.read_transactions().unwrap().is_empty());
    }

    #[test]
    fn snapshots_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ChainStore::open(dir.path()).unwrap();

        let blocks = vec![Block::genesis()];
        store.write_blocks(&blocks).unwrap();
        assert_eq!(store.read_blocks().unwrap(), blocks);

        let pool = blocks[0].transactions.clone();
        store.write_transactions(&pool).unwrap();
        assert_eq!(store.read_transactions().unwrap(), pool);
    }

    #[test]
    fn rewrites_replace_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = ChainStore::open(dir.path()).unwrap();

        store.write_blocks(&[Block::genesis()]).unwrap();
        store.write_blocks(&[]).unwrap();
        assert!(store.read_blocks().unwrap().is_empty());
    }
}
