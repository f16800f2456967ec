use serde::{Deserialize, Serialize};

/// A spendable output as seen by a wallet: the outpoint reference plus the
/// amount and owner. Derived on demand from the chain and the pending pool,
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub transaction: String,
    pub index: u32,
    pub amount: u64,
    pub address: String,
}

impl UnspentOutput {
    /// Summed in u128 so a large selection cannot wrap.
    pub fn total(utxos: &[UnspentOutput]) -> u128 {
        utxos.iter().map(|u| u128::from(u.amount)).sum()
    }
}
