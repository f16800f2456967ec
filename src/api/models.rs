use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::blockchain::Blockchain;
use crate::error::NodeError;
use crate::node::Node;

/// Shared application state: the ledger behind its single-writer mutex and
/// the peer layer.
pub struct AppState {
    pub ledger: Arc<Mutex<Blockchain>>,
    pub node: Arc<Node>,
}

/* ---------- Response models ---------- */

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn from_error(err: &NodeError) -> Self {
        Self {
            error: err.to_string(),
        }
    }

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Wallet-side transaction creation: the node selects unspent outputs owned
/// by the secret's address, builds, signs and submits in one call.
#[derive(Deserialize)]
pub struct BuildTransactionRequest {
    pub secret: String,
    pub to: String,
    pub amount: u64,
    #[serde(default = "default_fee")]
    pub fee: u64,
    #[serde(default)]
    pub student_id: Option<String>,
}

fn default_fee() -> u64 {
    crate::blockchain::FEE_PER_TRANSACTION
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty: u64,
}

#[derive(Serialize)]
pub struct ConfirmationsResponse {
    pub confirmations: usize,
}
