pub mod builder;
pub mod model;
pub mod utxo;

pub use builder::TransactionBuilder;
pub use model::{Transaction, TransactionType, TxData, TxInput, TxOutput};
pub use utxo::UnspentOutput;
