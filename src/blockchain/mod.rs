pub mod block;
pub mod difficulty;
pub mod model;

pub use block::Block;
pub use difficulty::DifficultyOracle;
pub use model::{Blockchain, SignInInfo};

use crate::transaction::Transaction;

/// Reward credited to a block's miner on top of collected fees.
pub const MINING_REWARD: u64 = 5_000_000_000;

/// Minimum fee a regular transaction must leave for the block's creator.
pub const FEE_PER_TRANSACTION: u64 = 1;

/// Baseline difficulty the oracle is seeded with (lower value = harder).
pub const BASE_DIFFICULTY: u64 = 9_007_199_254_740_991;

/// Checkpoint interval: difficulty is recomputed every this many blocks.
pub const EVERY_X_BLOCKS: usize = 5;

/// Target seconds per block.
pub const EXPECTED_BLOCK_TIME_SECS: i64 = 5;

/// Dead zone around the target ratio inside which difficulty is left alone.
pub const DEAD_ZONE_LOWER: f64 = 0.95;
pub const DEAD_ZONE_UPPER: f64 = 1.05;

/// Bounds on a single adjustment step.
pub const ADJUSTMENT_FACTOR_MIN: f64 = 0.25;
pub const ADJUSTMENT_FACTOR_MAX: f64 = 4.0;

/// Hardest allowed difficulty value.
pub const MIN_DIFFICULTY: u64 = 1;

/// Change notification emitted by the ledger after a mutation is persisted.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    BlockAdded(Block),
    TransactionAdded(Transaction),
    BlockchainReplaced(Vec<Block>),
}
