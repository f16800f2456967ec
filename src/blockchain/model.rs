use std::collections::HashSet;

use log::{debug, info};
use serde::Serialize;
use tokio::sync::broadcast;

use super::block::Block;
use super::difficulty::DifficultyOracle;
use super::{LedgerEvent, MINING_REWARD};
use crate::error::{
    BlockValidationError, BlockchainValidationError, Result, TransactionValidationError,
};
use crate::storage::ChainStore;
use crate::transaction::{Transaction, TransactionType, UnspentOutput};

/// Capacity of the ledger event channel; subscribers that fall further behind
/// than this observe a lag error, not blocked mutations.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One attendance record read back out of a confirmed block: the audit
/// metadata the first input of the block's regular transaction carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignInInfo {
    pub block_index: u64,
    pub address: String,
    pub student_id: Option<String>,
    pub real_world_time: Option<String>,
}

/// The single source of truth for accepted blocks and the pending pool.
///
/// Every mutation is gated by validation and serialized by the caller's mutex;
/// persistence happens before the corresponding event fires, so observers
/// never see an event for unpersisted state.
#[derive(Debug)]
pub struct Blockchain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    oracle: DifficultyOracle,
    store: ChainStore,
    events: broadcast::Sender<LedgerEvent>,
}

impl Blockchain {
    /// Load chain and pool from the store, installing the genesis block when
    /// the chain is empty and dropping pending transactions that are already
    /// confirmed.
    pub fn open(store: ChainStore) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut ledger = Self {
            blocks: store.read_blocks()?,
            pending: store.read_transactions()?,
            oracle: DifficultyOracle::new(),
            store,
            events,
        };

        if ledger.blocks.is_empty() {
            info!("blockchain empty, adding genesis block");
            ledger.blocks.push(Block::genesis());
            ledger.store.write_blocks(&ledger.blocks)?;
        }

        let confirmed: HashSet<&str> = ledger
            .blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .map(|t| t.id.as_str())
            .collect();
        let before = ledger.pending.len();
        ledger.pending.retain(|t| !confirmed.contains(t.id.as_str()));
        if ledger.pending.len() != before {
            info!(
                "dropped {} pending transactions already in the blockchain",
                before - ledger.pending.len()
            );
            ledger.store.write_transactions(&ledger.pending)?;
        }

        ledger.oracle = DifficultyOracle::replay(&ledger.blocks);
        Ok(ledger)
    }

    /// Subscribe to change notifications (`BlockAdded`, `TransactionAdded`,
    /// `BlockchainReplaced`).
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /* ---------- Queries ---------- */

    pub fn get_all_blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get_block_by_index(&self, index: u64) -> Option<&Block> {
        self.blocks.iter().find(|b| b.index == index)
    }

    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == hash)
    }

    pub fn get_last_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("blockchain always holds at least the genesis block")
    }

    pub fn get_all_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn get_transaction_by_id(&self, id: &str) -> Option<&Transaction> {
        self.pending.iter().find(|t| t.id == id)
    }

    /// The block containing the given confirmed transaction, if any.
    pub fn get_transaction_from_blocks(&self, transaction_id: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.transactions.iter().any(|t| t.id == transaction_id))
    }

    /// Difficulty the next mined block must satisfy. Advances the oracle when
    /// the chain currently ends on a checkpoint, so repeated calls while the
    /// tip sits on a checkpoint re-apply the adjustment and compound it.
    /// That compounding is inherited behavior, kept as-is.
    pub fn difficulty_for_next_block(&mut self) -> u64 {
        self.oracle.difficulty_for(&self.blocks)
    }

    /// Attendance records across the chain: for each block whose first
    /// regular transaction carries inputs, the first input's address and
    /// audit metadata. Blocks without one (genesis, pure reward blocks) are
    /// skipped.
    pub fn get_sign_in_info(&self) -> Vec<SignInInfo> {
        self.blocks
            .iter()
            .filter_map(|block| {
                let regular = block
                    .transactions
                    .iter()
                    .find(|t| t.kind == TransactionType::Regular)?;
                let first = regular.data.inputs.first()?;
                Some(SignInInfo {
                    block_index: block.index,
                    address: first.address.clone(),
                    student_id: first.student_id.clone(),
                    real_world_time: first.real_world_time.clone(),
                })
            })
            .collect()
    }

    /// The UTXO view for `address`, inclusive of pending spends: outputs to
    /// the address across blocks and pool, minus every output the address has
    /// referenced as an input anywhere. A pending spend therefore already
    /// shadows its source output.
    pub fn get_unspent_transactions_for_address(&self, address: &str) -> Vec<UnspentOutput> {
        let mut outputs: Vec<UnspentOutput> = Vec::new();
        let mut spent: HashSet<(&str, u32)> = HashSet::new();

        let all = self
            .blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .chain(self.pending.iter());
        for tx in all {
            for (index, output) in tx.data.outputs.iter().enumerate() {
                if output.address == address {
                    outputs.push(UnspentOutput {
                        transaction: tx.id.clone(),
                        index: index as u32,
                        amount: output.amount,
                        address: output.address.clone(),
                    });
                }
            }
            for input in &tx.data.inputs {
                if input.address == address {
                    spent.insert((input.transaction.as_str(), input.index));
                }
            }
        }

        outputs.retain(|o| !spent.contains(&(o.transaction.as_str(), o.index)));
        outputs
    }

    /* ---------- Validation ---------- */

    /// Validate `candidate` as the direct successor of `previous`, in order:
    /// index, linkage, recomputed hash, block balance, intra-block double
    /// spend, fee/reward multiplicity. The proof-of-work threshold is not
    /// compared here.
    pub fn check_block(
        candidate: &Block,
        previous: &Block,
    ) -> std::result::Result<(), BlockValidationError> {
        if previous.index + 1 != candidate.index {
            return Err(BlockValidationError::IndexMismatch {
                expected: previous.index + 1,
                got: candidate.index,
            });
        }
        if previous.hash != candidate.previous_hash {
            return Err(BlockValidationError::PreviousHashMismatch {
                expected: previous.hash.clone(),
                got: candidate.previous_hash.clone(),
            });
        }

        let expected_hash = candidate.compute_hash();
        if expected_hash != candidate.hash {
            return Err(BlockValidationError::HashMismatch {
                expected: expected_hash,
                got: candidate.hash.clone(),
            });
        }

        // Outputs may exceed inputs only by the mining reward. Summed in u128
        // so wire-supplied amounts cannot wrap the comparison.
        let inputs: u128 = candidate.transactions.iter().map(|t| t.input_total()).sum();
        let outputs: u128 = candidate
            .transactions
            .iter()
            .map(|t| t.output_total())
            .sum();
        if inputs + u128::from(MINING_REWARD) < outputs {
            return Err(BlockValidationError::Unbalanced { inputs, outputs });
        }

        let mut seen: HashSet<(&str, u32)> = HashSet::new();
        for input in candidate
            .transactions
            .iter()
            .flat_map(|t| t.data.inputs.iter())
        {
            if !seen.insert((input.transaction.as_str(), input.index)) {
                return Err(BlockValidationError::DoubleSpend {
                    transaction: input.transaction.clone(),
                    index: input.index,
                });
            }
        }

        let fee_count = candidate
            .transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Fee)
            .count();
        if fee_count > 1 {
            return Err(BlockValidationError::TooManyFeeTransactions { count: fee_count });
        }
        let reward_count = candidate
            .transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Reward)
            .count();
        if reward_count > 1 {
            return Err(BlockValidationError::TooManyRewardTransactions {
                count: reward_count,
            });
        }

        Ok(())
    }

    /// Validate a transaction against a reference chain: self-check, id not
    /// already confirmed, and every referenced output unspent in the chain.
    pub fn check_transaction(
        tx: &Transaction,
        reference_chain: &[Block],
    ) -> std::result::Result<(), TransactionValidationError> {
        tx.check()?;

        let confirmed = reference_chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .any(|t| t.id == tx.id);
        if confirmed {
            return Err(TransactionValidationError::AlreadyConfirmed { id: tx.id.clone() });
        }

        for input in &tx.data.inputs {
            let spent = reference_chain
                .iter()
                .flat_map(|b| b.transactions.iter())
                .flat_map(|t| t.data.inputs.iter())
                .any(|i| i.transaction == input.transaction && i.index == input.index);
            if spent {
                return Err(TransactionValidationError::InputAlreadySpent {
                    id: tx.id.clone(),
                    transaction: input.transaction.clone(),
                    index: input.index,
                });
            }
        }

        Ok(())
    }

    /// Validate a whole candidate chain: the first block must equal the fixed
    /// genesis exactly, every adjacent pair must pass `check_block`.
    pub fn check_chain(candidate: &[Block]) -> std::result::Result<(), BlockchainValidationError> {
        if candidate.first() != Some(&Block::genesis()) {
            return Err(BlockchainValidationError::GenesisMismatch);
        }

        for i in 1..candidate.len() {
            Self::check_block(&candidate[i], &candidate[i - 1]).map_err(|source| {
                BlockchainValidationError::InvalidBlockSequence {
                    index: candidate[i].index,
                    source,
                }
            })?;
        }
        Ok(())
    }

    /* ---------- Mutation ---------- */

    /// Validate against the current tip, append, persist, purge the block's
    /// transactions from the pool, then emit `BlockAdded`.
    pub fn add_block(&mut self, block: Block) -> Result<Block> {
        Self::check_block(&block, self.get_last_block())?;

        self.blocks.push(block.clone());
        self.store.write_blocks(&self.blocks)?;
        self.remove_block_transactions(&block)?;

        info!("block added: {}", block.hash);
        debug!("block added: {block:?}");
        let _ = self.events.send(LedgerEvent::BlockAdded(block.clone()));
        Ok(block)
    }

    /// Validate against chain and pool, append to the pool, persist, then
    /// emit `TransactionAdded`. Rejections leave the pool untouched.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<Transaction> {
        Self::check_transaction(&tx, &self.blocks)?;

        // The pool participates in the double-spend rule: a pending sibling
        // claims its inputs just as firmly as a confirmed block does.
        if self.pending.iter().any(|t| t.id == tx.id) {
            return Err(TransactionValidationError::AlreadyPending { id: tx.id.clone() }.into());
        }
        for input in &tx.data.inputs {
            let claimed = self
                .pending
                .iter()
                .flat_map(|t| t.data.inputs.iter())
                .any(|i| i.transaction == input.transaction && i.index == input.index);
            if claimed {
                return Err(TransactionValidationError::InputClaimedByPending {
                    id: tx.id.clone(),
                    transaction: input.transaction.clone(),
                    index: input.index,
                }
                .into());
            }
        }

        self.pending.push(tx.clone());
        self.store.write_transactions(&self.pending)?;

        info!("transaction added: {}", tx.id);
        debug!("transaction added: {tx:?}");
        let _ = self.events.send(LedgerEvent::TransactionAdded(tx.clone()));
        Ok(tx)
    }

    /// Replace the local history with a strictly longer valid chain.
    ///
    /// The suffix beyond the current length is appended through the normal
    /// `add_block` path, so pool pruning and `BlockAdded` events fire exactly
    /// as for organic mining; afterwards the difficulty oracle is re-derived
    /// from the new history and `BlockchainReplaced` fires with the new tail.
    /// Assumes the candidate shares the current chain as a prefix; a suffix
    /// that does not link onto the local tip is rejected by `add_block`
    /// before anything is mutated.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<Vec<Block>> {
        if candidate.len() <= self.blocks.len() {
            return Err(BlockchainValidationError::NotLonger {
                current: self.blocks.len(),
                received: candidate.len(),
            }
            .into());
        }

        Self::check_chain(&candidate)?;

        info!("received blockchain is valid, replacing current blockchain");
        let suffix: Vec<Block> = candidate[self.blocks.len()..].to_vec();
        for block in &suffix {
            self.add_block(block.clone())?;
        }

        self.oracle = DifficultyOracle::replay(&self.blocks);
        let _ = self
            .events
            .send(LedgerEvent::BlockchainReplaced(suffix.clone()));
        Ok(suffix)
    }

    /// Drop every pool transaction whose id appears in `block`.
    fn remove_block_transactions(&mut self, block: &Block) -> Result<()> {
        let before = self.pending.len();
        self.pending
            .retain(|t| !block.transactions.iter().any(|bt| bt.id == t.id));
        if self.pending.len() != before {
            debug!(
                "purged {} confirmed transactions from the pool",
                before - self.pending.len()
            );
        }
        self.store.write_transactions(&self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::transaction::{TransactionBuilder, TxData, TxOutput};
    use crate::wallet;
    use tempfile::{TempDir, tempdir};

    fn open_ledger() -> (Blockchain, TempDir) {
        let dir = tempdir().unwrap();
        let store = ChainStore::open(dir.path()).unwrap();
        (Blockchain::open(store).unwrap(), dir)
    }

    fn reward_tx(address: &str, amount: u64) -> Transaction {
        let mut tx = Transaction {
            id: wallet::random_id(),
            hash: None,
            kind: TransactionType::Reward,
            data: TxData {
                inputs: vec![],
                outputs: vec![TxOutput {
                    address: address.to_string(),
                    amount,
                }],
            },
        };
        tx.hash = Some(tx.compute_hash());
        tx
    }

    fn next_block(previous: &Block, transactions: Vec<Transaction>) -> Block {
        Block::new(
            previous.index + 1,
            previous.hash.clone(),
            previous.timestamp + 5,
            transactions,
        )
    }

    struct Funded {
        secret: String,
        address: String,
        reward_id: String,
    }

    /// Mine one reward block so `address` owns a spendable MINING_REWARD.
    fn fund(ledger: &mut Blockchain) -> Funded {
        let secret = wallet::generate_secret_hex();
        let address = wallet::address_from_secret(&secret).unwrap();
        let reward = reward_tx(&address, MINING_REWARD);
        let reward_id = reward.id.clone();
        let block = next_block(ledger.get_last_block(), vec![reward]);
        ledger.add_block(block).unwrap();
        Funded {
            secret,
            address,
            reward_id,
        }
    }

    fn spend(funded: &Funded, destination: &str, amount: u64) -> Transaction {
        let utxo = UnspentOutput {
            transaction: funded.reward_id.clone(),
            index: 0,
            amount: MINING_REWARD,
            address: funded.address.clone(),
        };
        TransactionBuilder::new()
            .from(vec![utxo])
            .to(destination, amount)
            .change(&funded.address)
            .fee(1)
            .sign(&funded.secret)
            .build()
            .unwrap()
    }

    #[test]
    fn open_installs_genesis_once() {
        let dir = tempdir().unwrap();
        {
            let store = ChainStore::open(dir.path()).unwrap();
            let ledger = Blockchain::open(store).unwrap();
            assert_eq!(ledger.get_all_blocks(), &[Block::genesis()]);
        }
        // Reopening reads the same chain back rather than reinstalling.
        let store = ChainStore::open(dir.path()).unwrap();
        let ledger = Blockchain::open(store).unwrap();
        assert_eq!(ledger.get_all_blocks().len(), 1);
    }

    #[test]
    fn reward_block_scenario_with_multiplicity_rejection() {
        let (mut ledger, _dir) = open_ledger();
        let genesis = ledger.get_last_block().clone();

        let accepted = next_block(&genesis, vec![reward_tx("miner-a", MINING_REWARD)]);
        ledger.add_block(accepted.clone()).unwrap();
        assert_eq!(ledger.get_last_block().hash, accepted.hash);

        let rejected = next_block(
            ledger.get_last_block(),
            vec![
                reward_tx("miner-a", MINING_REWARD),
                reward_tx("miner-b", MINING_REWARD),
            ],
        );
        let err = ledger.add_block(rejected).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Block(BlockValidationError::TooManyRewardTransactions { count: 2 })
        ));
        // The rejection left the chain exactly as it was.
        assert_eq!(ledger.get_last_block().hash, accepted.hash);
    }

    #[test]
    fn check_block_rejects_bad_index_link_and_hash() {
        let genesis = Block::genesis();

        let mut wrong_index = next_block(&genesis, vec![]);
        wrong_index.index = 5;
        wrong_index.hash = wrong_index.compute_hash();
        assert!(matches!(
            Blockchain::check_block(&wrong_index, &genesis),
            Err(BlockValidationError::IndexMismatch {
                expected: 1,
                got: 5
            })
        ));

        let mut wrong_link = next_block(&genesis, vec![]);
        wrong_link.previous_hash = "bogus".to_string();
        wrong_link.hash = wrong_link.compute_hash();
        assert!(matches!(
            Blockchain::check_block(&wrong_link, &genesis),
            Err(BlockValidationError::PreviousHashMismatch { .. })
        ));

        let mut wrong_hash = next_block(&genesis, vec![]);
        wrong_hash.hash = "f00".to_string();
        assert!(matches!(
            Blockchain::check_block(&wrong_hash, &genesis),
            Err(BlockValidationError::HashMismatch { .. })
        ));
    }

    #[test]
    fn block_balance_boundary() {
        let genesis = Block::genesis();

        // Outputs equal to inputs + MINING_REWARD: boundary, must pass.
        let at_boundary = next_block(&genesis, vec![reward_tx("miner", MINING_REWARD)]);
        assert!(Blockchain::check_block(&at_boundary, &genesis).is_ok());

        let over = next_block(&genesis, vec![reward_tx("miner", MINING_REWARD + 1)]);
        assert!(matches!(
            Blockchain::check_block(&over, &genesis),
            Err(BlockValidationError::Unbalanced { .. })
        ));
    }

    #[test]
    fn output_sums_past_u64_max_are_unbalanced_not_wrapped() {
        // Each amount fits the wire format; only their sum exceeds u64. The
        // block must be rejected on balance, not accepted via wraparound.
        let genesis = Block::genesis();
        let block = next_block(
            &genesis,
            vec![
                reward_tx("miner-a", u64::MAX),
                reward_tx("miner-b", MINING_REWARD + 100),
            ],
        );
        assert!(matches!(
            Blockchain::check_block(&block, &genesis),
            Err(BlockValidationError::Unbalanced { .. })
        ));
    }

    #[test]
    fn intra_block_double_spend_is_rejected() {
        let (mut ledger, _dir) = open_ledger();
        let funded = fund(&mut ledger);

        let first = spend(&funded, "shop-a", 100);
        let second = spend(&funded, "shop-b", 200);
        let block = next_block(ledger.get_last_block(), vec![first, second]);
        let err = ledger.add_block(block).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Block(BlockValidationError::DoubleSpend { .. })
        ));
    }

    #[test]
    fn add_block_purges_confirmed_transactions_from_pool() {
        let (mut ledger, _dir) = open_ledger();
        let funded = fund(&mut ledger);

        let tx = spend(&funded, "shop", 100);
        ledger.add_transaction(tx.clone()).unwrap();
        assert!(ledger.get_transaction_by_id(&tx.id).is_some());

        let block = next_block(ledger.get_last_block(), vec![tx.clone()]);
        ledger.add_block(block).unwrap();
        assert!(ledger.get_transaction_by_id(&tx.id).is_none());
        assert!(ledger.get_transaction_from_blocks(&tx.id).is_some());
    }

    #[test]
    fn double_spend_against_pending_pool_is_rejected() {
        let (mut ledger, _dir) = open_ledger();
        let funded = fund(&mut ledger);

        ledger.add_transaction(spend(&funded, "shop-a", 100)).unwrap();
        let err = ledger
            .add_transaction(spend(&funded, "shop-b", 200))
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::Transaction(TransactionValidationError::InputClaimedByPending { .. })
        ));
    }

    #[test]
    fn double_spend_against_confirmed_chain_is_rejected() {
        let (mut ledger, _dir) = open_ledger();
        let funded = fund(&mut ledger);

        let confirmed = spend(&funded, "shop-a", 100);
        let block = next_block(ledger.get_last_block(), vec![confirmed]);
        ledger.add_block(block).unwrap();

        let err = ledger
            .add_transaction(spend(&funded, "shop-b", 200))
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::Transaction(TransactionValidationError::InputAlreadySpent { .. })
        ));
    }

    #[test]
    fn duplicate_transaction_ids_are_rejected() {
        let (mut ledger, _dir) = open_ledger();
        let funded = fund(&mut ledger);

        let tx = spend(&funded, "shop", 100);
        ledger.add_transaction(tx.clone()).unwrap();
        let err = ledger.add_transaction(tx.clone()).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Transaction(TransactionValidationError::AlreadyPending { .. })
        ));

        let block = next_block(ledger.get_last_block(), vec![tx.clone()]);
        ledger.add_block(block).unwrap();
        let err = ledger.add_transaction(tx).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Transaction(TransactionValidationError::AlreadyConfirmed { .. })
        ));
    }

    #[test]
    fn utxo_view_includes_pending_and_excludes_spent() {
        let (mut ledger, _dir) = open_ledger();
        let funded = fund(&mut ledger);

        let before = ledger.get_unspent_transactions_for_address(&funded.address);
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].amount, MINING_REWARD);

        let tx = spend(&funded, "shop", 100);
        ledger.add_transaction(tx.clone()).unwrap();

        // The reward output is shadowed by the pending spend; the pending
        // change output is already spendable.
        let after = ledger.get_unspent_transactions_for_address(&funded.address);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].transaction, tx.id);
        assert_eq!(after[0].amount, MINING_REWARD - 101);
    }

    #[test]
    fn sign_in_info_reads_audit_metadata_back_out() {
        let (mut ledger, _dir) = open_ledger();
        let funded = fund(&mut ledger);

        // Genesis and the pure reward block carry no sign-in.
        assert!(ledger.get_sign_in_info().is_empty());

        let tx = TransactionBuilder::new()
            .from(vec![UnspentOutput {
                transaction: funded.reward_id.clone(),
                index: 0,
                amount: MINING_REWARD,
                address: funded.address.clone(),
            }])
            .to("shop", 100)
            .change(&funded.address)
            .fee(1)
            .student_id("s-42")
            .sign(&funded.secret)
            .build()
            .unwrap();
        let block = next_block(ledger.get_last_block(), vec![tx]);
        ledger.add_block(block).unwrap();

        let info = ledger.get_sign_in_info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].block_index, 2);
        assert_eq!(info[0].address, funded.address);
        assert_eq!(info[0].student_id.as_deref(), Some("s-42"));
        assert!(info[0].real_world_time.is_some());
    }

    #[test]
    fn check_chain_accepts_valid_and_rejects_foreign_genesis() {
        let (mut ledger, _dir) = open_ledger();
        fund(&mut ledger);
        fund(&mut ledger);
        assert!(Blockchain::check_chain(ledger.get_all_blocks()).is_ok());

        let mut tampered = ledger.get_all_blocks().to_vec();
        tampered[0] = next_block(&Block::genesis(), vec![]);
        assert!(matches!(
            Blockchain::check_chain(&tampered),
            Err(BlockchainValidationError::GenesisMismatch)
        ));

        let mut broken = ledger.get_all_blocks().to_vec();
        broken[2].nonce += 1;
        assert!(matches!(
            Blockchain::check_chain(&broken),
            Err(BlockchainValidationError::InvalidBlockSequence { index: 2, .. })
        ));
    }

    #[test]
    fn replace_chain_requires_strictly_longer() {
        let (mut ledger, _dir) = open_ledger();
        fund(&mut ledger);

        let same_length = ledger.get_all_blocks().to_vec();
        let err = ledger.replace_chain(same_length).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Blockchain(BlockchainValidationError::NotLonger {
                current: 2,
                received: 2
            })
        ));
    }

    #[test]
    fn replace_chain_swaps_to_longer_chain_and_prunes_pool() {
        // Build a longer chain on a second ledger sharing the same genesis.
        let (mut remote, _remote_dir) = open_ledger();
        let funded = fund(&mut remote);
        let confirmed = spend(&funded, "shop", 100);
        let block = next_block(remote.get_last_block(), vec![confirmed.clone()]);
        remote.add_block(block).unwrap();
        let candidate = remote.get_all_blocks().to_vec();

        let (mut local, _local_dir) = open_ledger();
        // The same transaction sits unconfirmed here; replacement confirms it.
        local.add_transaction(confirmed.clone()).unwrap();

        let mut events = local.subscribe();
        let tail = local.replace_chain(candidate.clone()).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(local.get_last_block().hash, candidate.last().unwrap().hash);
        assert!(local.get_transaction_by_id(&confirmed.id).is_none());

        // Two appended blocks, then the replacement notification.
        assert!(matches!(
            events.try_recv().unwrap(),
            LedgerEvent::BlockAdded(_)
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            LedgerEvent::BlockAdded(_)
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            LedgerEvent::BlockchainReplaced(blocks) if blocks.len() == 2
        ));
    }

    #[test]
    fn replace_chain_rejects_invalid_candidate_without_mutation() {
        let (mut remote, _remote_dir) = open_ledger();
        fund(&mut remote);
        fund(&mut remote);
        let mut candidate = remote.get_all_blocks().to_vec();
        candidate[1].timestamp += 1; // breaks the stored hash

        let (mut local, _local_dir) = open_ledger();
        assert!(local.replace_chain(candidate).is_err());
        assert_eq!(local.get_all_blocks().len(), 1);
    }

    #[test]
    fn events_fire_after_mutations() {
        let (mut ledger, _dir) = open_ledger();
        let mut events = ledger.subscribe();

        let funded = fund(&mut ledger);
        assert!(matches!(
            events.try_recv().unwrap(),
            LedgerEvent::BlockAdded(_)
        ));

        let tx = spend(&funded, "shop", 100);
        ledger.add_transaction(tx.clone()).unwrap();
        assert!(matches!(
            events.try_recv().unwrap(),
            LedgerEvent::TransactionAdded(t) if t.id == tx.id
        ));
    }
}
