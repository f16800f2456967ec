use serde::{Deserialize, Serialize};

use crate::blockchain::FEE_PER_TRANSACTION;
use crate::error::TransactionValidationError;
use crate::wallet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Regular,
    Fee,
    Reward,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Regular => "regular",
            TransactionType::Fee => "fee",
            TransactionType::Reward => "reward",
        }
    }
}

/// Spends a prior output identified by `(transaction, index)`.
///
/// The `student_id`/`event_id`/`timestamp`/`real_world_time` fields are audit
/// metadata assigned at build time and carried through the ledger unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    pub transaction: String,
    pub index: u32,
    pub amount: u64,
    /// Hex Ed25519 verifying key of the output's owner.
    pub address: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Milliseconds since epoch, assigned by the builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_world_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    /// Smallest currency unit.
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxData {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Content hash; `None` only for the genesis placeholder.
    pub hash: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub data: TxData,
}

/// Digest each input's owner signs: SHA-256 of the canonical JSON of the
/// outpoint reference plus signer address and audit metadata. `Transaction::check`
/// and the builder share this framing, so it cannot drift between them.
pub fn input_signing_payload(
    transaction: &str,
    index: u32,
    address: &str,
    student_id: Option<&str>,
    event_id: Option<&str>,
    timestamp: Option<i64>,
) -> String {
    // serde_json maps are ordered by key, keeping the digest deterministic.
    let payload = serde_json::json!({
        "transaction": transaction,
        "index": index,
        "address": address,
        "student_id": student_id,
        "event_id": event_id,
        "timestamp": timestamp,
    });
    wallet::hash_hex(payload.to_string().as_bytes())
}

impl Transaction {
    /// Content digest over `id + type + data`.
    pub fn compute_hash(&self) -> String {
        let data_json = serde_json::to_string(&self.data).expect("serialize tx data");
        wallet::hash_hex(format!("{}{}{}", self.id, self.kind.as_str(), data_json).as_bytes())
    }

    /// Amounts are summed in u128: individual values are u64 on the wire,
    /// but their sum over attacker-supplied data must not be able to wrap.
    pub fn input_total(&self) -> u128 {
        self.data.inputs.iter().map(|i| u128::from(i.amount)).sum()
    }

    pub fn output_total(&self) -> u128 {
        self.data.outputs.iter().map(|o| u128::from(o.amount)).sum()
    }

    /// Structural self-check: content hash, every input signature, and for
    /// regular transactions the balance and minimum fee.
    pub fn check(&self) -> Result<(), TransactionValidationError> {
        let expected = self.compute_hash();
        if self.hash.as_deref() != Some(expected.as_str()) {
            return Err(TransactionValidationError::HashMismatch {
                id: self.id.clone(),
                expected,
                got: self.hash.clone().unwrap_or_else(|| "null".to_string()),
            });
        }

        for input in &self.data.inputs {
            let digest = input_signing_payload(
                &input.transaction,
                input.index,
                &input.address,
                input.student_id.as_deref(),
                input.event_id.as_deref(),
                input.timestamp,
            );
            if !wallet::verify_signature_hex(&input.address, &input.signature, &digest) {
                return Err(TransactionValidationError::InvalidSignature {
                    id: self.id.clone(),
                    address: input.address.clone(),
                });
            }
        }

        if self.kind == TransactionType::Regular {
            let inputs = self.input_total();
            let outputs = self.output_total();
            if outputs > inputs {
                return Err(TransactionValidationError::Unbalanced {
                    id: self.id.clone(),
                    inputs,
                    outputs,
                });
            }
            let fee = inputs - outputs;
            if fee < u128::from(FEE_PER_TRANSACTION) {
                return Err(TransactionValidationError::InsufficientFee {
                    id: self.id.clone(),
                    fee,
                    required: FEE_PER_TRANSACTION,
                });
            }
        }

        Ok(())
    }
}
