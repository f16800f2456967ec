use chrono::Utc;

use super::model::{Transaction, TransactionType, TxData, TxInput, TxOutput, input_signing_payload};
use super::utxo::UnspentOutput;
use crate::error::ArgumentError;
use crate::wallet;

/// Assembles a signed transaction from caller-supplied unspent outputs.
///
/// A construction helper, not a consensus authority: the ledger re-validates
/// everything this produces. The builder assigns the transaction id up front
/// so each input signature can commit to it (as `event_id`).
pub struct TransactionBuilder {
    utxos: Option<Vec<UnspentOutput>>,
    destination: Option<String>,
    amount: Option<u64>,
    change_address: Option<String>,
    fee: u64,
    secret_key: Option<String>,
    kind: TransactionType,
    student_id: Option<String>,
    transaction_id: String,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            utxos: None,
            destination: None,
            amount: None,
            change_address: None,
            fee: 0,
            secret_key: None,
            kind: TransactionType::Regular,
            student_id: None,
            transaction_id: wallet::random_id(),
        }
    }

    pub fn from(mut self, utxos: Vec<UnspentOutput>) -> Self {
        self.utxos = Some(utxos);
        self
    }

    pub fn to(mut self, address: impl Into<String>, amount: u64) -> Self {
        self.destination = Some(address.into());
        self.amount = Some(amount);
        self
    }

    pub fn change(mut self, address: impl Into<String>) -> Self {
        self.change_address = Some(address.into());
        self
    }

    pub fn fee(mut self, amount: u64) -> Self {
        self.fee = amount;
        self
    }

    pub fn sign(mut self, secret_hex: impl Into<String>) -> Self {
        self.secret_key = Some(secret_hex.into());
        self
    }

    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = kind;
        self
    }

    pub fn student_id(mut self, id: impl Into<String>) -> Self {
        self.student_id = Some(id.into());
        self
    }

    pub fn build(self) -> Result<Transaction, ArgumentError> {
        let utxos = self.utxos.ok_or(ArgumentError::MissingUtxoList)?;
        let destination = self.destination.ok_or(ArgumentError::MissingDestination)?;
        let amount = self.amount.ok_or(ArgumentError::MissingAmount)?;
        let secret = self.secret_key.ok_or(ArgumentError::MissingSigningKey)?;
        let key = wallet::signing_key_from_secret(&secret)
            .map_err(ArgumentError::InvalidSigningKey)?;

        let available = UnspentOutput::total(&utxos);
        let required = u128::from(amount) + u128::from(self.fee);
        // Zero change is a hard failure too: the change output is mandatory.
        if available <= required {
            return Err(ArgumentError::InsufficientFunds {
                available,
                required,
            });
        }
        let change_amount = u64::try_from(available - required)
            .map_err(|_| ArgumentError::OversizedChange {
                change: available - required,
            })?;

        let now = Utc::now();
        let timestamp = now.timestamp_millis();
        let real_world_time = now.format("%B %-d, %Y %H:%M:%S").to_string();

        let inputs = utxos
            .into_iter()
            .map(|utxo| {
                let digest = input_signing_payload(
                    &utxo.transaction,
                    utxo.index,
                    &utxo.address,
                    self.student_id.as_deref(),
                    Some(&self.transaction_id),
                    Some(timestamp),
                );
                TxInput {
                    transaction: utxo.transaction,
                    index: utxo.index,
                    amount: utxo.amount,
                    address: utxo.address,
                    signature: wallet::sign_hash_hex(&key, &digest),
                    student_id: self.student_id.clone(),
                    event_id: Some(self.transaction_id.clone()),
                    timestamp: Some(timestamp),
                    real_world_time: Some(real_world_time.clone()),
                }
            })
            .collect();

        let outputs = vec![
            TxOutput {
                address: destination,
                amount,
            },
            TxOutput {
                address: self.change_address.unwrap_or_default(),
                amount: change_amount,
            },
        ];
        // Whatever remains beyond amount + change is the fee collected by the
        // block's creator.

        let mut tx = Transaction {
            id: self.transaction_id,
            hash: None,
            kind: self.kind,
            data: TxData { inputs, outputs },
        };
        tx.hash = Some(tx.compute_hash());
        Ok(tx)
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
