//! Error taxonomy for ledger, node and builder operations.
//!
//! Validation errors are fatal to the single operation that raised them and
//! never to the process: the chain, pool and peer set are left untouched by a
//! rejected call.

use thiserror::Error;

/// Result type alias for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// A transaction rejected by self-check or ledger validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransactionValidationError {
    #[error("transaction '{id}' hash mismatch: expected '{expected}' got '{got}'")]
    HashMismatch {
        id: String,
        expected: String,
        got: String,
    },
    #[error("transaction '{id}' carries an invalid signature for address '{address}'")]
    InvalidSignature { id: String, address: String },
    #[error("transaction '{id}' outputs exceed inputs: inputs '{inputs}', outputs '{outputs}'")]
    Unbalanced {
        id: String,
        inputs: u128,
        outputs: u128,
    },
    #[error("transaction '{id}' fee is too low: got '{fee}', required '{required}'")]
    InsufficientFee { id: String, fee: u128, required: u64 },
    #[error("transaction '{id}' is already in the blockchain")]
    AlreadyConfirmed { id: String },
    #[error("transaction '{id}' is already pending")]
    AlreadyPending { id: String },
    #[error("transaction '{id}' spends output '{transaction}:{index}' which is already spent")]
    InputAlreadySpent {
        id: String,
        transaction: String,
        index: u32,
    },
    #[error("transaction '{id}' claims output '{transaction}:{index}' already claimed by a pending transaction")]
    InputClaimedByPending {
        id: String,
        transaction: String,
        index: u32,
    },
}

/// A candidate block rejected by `check_block`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BlockValidationError {
    #[error("invalid index: expected '{expected}' got '{got}'")]
    IndexMismatch { expected: u64, got: u64 },
    #[error("invalid previous hash: expected '{expected}' got '{got}'")]
    PreviousHashMismatch { expected: String, got: String },
    #[error("invalid hash: expected '{expected}' got '{got}'")]
    HashMismatch { expected: String, got: String },
    #[error("invalid block balance: inputs sum '{inputs}', outputs sum '{outputs}'")]
    Unbalanced { inputs: u128, outputs: u128 },
    #[error("output '{transaction}:{index}' is spent more than once within the block")]
    DoubleSpend { transaction: String, index: u32 },
    #[error("invalid fee transaction count: expected at most 1, got '{count}'")]
    TooManyFeeTransactions { count: usize },
    #[error("invalid reward transaction count: expected at most 1, got '{count}'")]
    TooManyRewardTransactions { count: usize },
}

/// A candidate chain rejected by `check_chain` or `replace_chain`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BlockchainValidationError {
    #[error("genesis block does not match the fixed genesis block")]
    GenesisMismatch,
    #[error("invalid block sequence at index {index}: {source}")]
    InvalidBlockSequence {
        index: u64,
        source: BlockValidationError,
    },
    #[error("received blockchain is not longer than the current blockchain: current '{current}', received '{received}'")]
    NotLonger { current: usize, received: usize },
}

/// Malformed input handed to the transaction builder.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArgumentError {
    #[error("a list of unspent output transactions is required")]
    MissingUtxoList,
    #[error("a destination address is required")]
    MissingDestination,
    #[error("a transaction amount is required")]
    MissingAmount,
    #[error("a signing key is required")]
    MissingSigningKey,
    #[error("malformed signing key: {0}")]
    InvalidSigningKey(&'static str),
    #[error("the sender does not have enough to pay for the transaction: available '{available}', required '{required}'")]
    InsufficientFunds { available: u128, required: u128 },
    #[error("change amount '{change}' does not fit a transaction output")]
    OversizedChange { change: u128 },
}

/// Top-level error for any ledger or node operation.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Transaction(#[from] TransactionValidationError),
    #[error(transparent)]
    Block(#[from] BlockValidationError),
    #[error(transparent)]
    Blockchain(#[from] BlockchainValidationError),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("network error: {0}")]
    Network(String),
}
