use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::client::PeerClient;
use crate::blockchain::{Block, Blockchain, LedgerEvent};
use crate::transaction::Transaction;

/// A known peer node, identified by its base URL. Peers are added on first
/// contact and never evicted; a peer that stops answering just keeps costing
/// one logged warning per broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub url: String,
}

/// Outcome of the fork-resolution state machine for a batch of received
/// blocks (sorted by index, tip last).
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Local chain is not behind; nothing to do.
    Ignore,
    /// The received tip extends the local tip directly; append it.
    Append(Block),
    /// A single foreign block with an unknown parent: ask peers for the full
    /// chain and resolve later.
    QueryAll,
    /// A longer forked chain: hand it to chain replacement wholesale.
    Replace(Vec<Block>),
}

/// The peer layer: maintains the peer set, relays ledger changes, and runs
/// fork resolution over incoming chain data.
pub struct Node {
    url: String,
    peers: Mutex<Vec<Peer>>,
    ledger: Arc<Mutex<Blockchain>>,
    client: PeerClient,
}

impl Node {
    pub fn new(host: &str, port: u16, ledger: Arc<Mutex<Blockchain>>) -> Arc<Self> {
        Arc::new(Self {
            url: format!("http://{host}:{port}"),
            peers: Mutex::new(Vec::new()),
            ledger,
            client: PeerClient::new(),
        })
    }

    pub fn peers(&self) -> Vec<Peer> {
        self.peers.lock().expect("mutex poisoned").clone()
    }

    /// Subscribe to the ledger and relay every change to the peer set:
    /// new blocks and transactions are broadcast as they land, a chain
    /// replacement broadcasts only the new tail block.
    pub fn spawn_event_loop(self: &Arc<Self>) {
        let mut events = self.ledger.lock().expect("mutex poisoned").subscribe();
        let node = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(LedgerEvent::BlockAdded(block)) => node.broadcast_latest_block(&block),
                    Ok(LedgerEvent::TransactionAdded(tx)) => node.broadcast_transaction(&tx),
                    Ok(LedgerEvent::BlockchainReplaced(blocks)) => {
                        if let Some(tip) = blocks.last() {
                            node.broadcast_latest_block(tip);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("event loop lagged, skipped {skipped} ledger events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /* ---------- Peer membership ---------- */

    pub async fn connect_to_peer(&self, peer: Peer) {
        self.connect_to_peers(vec![peer]).await;
    }

    /// Admit every not-yet-known peer: announce ourselves to it, pull its tip
    /// and pending transactions, and gossip its existence onward.
    pub async fn connect_to_peers(&self, new_peers: Vec<Peer>) {
        for peer in new_peers {
            if peer.url == self.url {
                debug!("peer {} is self, ignoring", peer.url);
                continue;
            }
            let already_known = {
                let peers = self.peers.lock().expect("mutex poisoned");
                peers.contains(&peer)
            };
            if already_known {
                info!("peer {} not added to connections, already known", peer.url);
                continue;
            }

            if let Err(err) = self
                .client
                .post_peer(
                    &peer,
                    &Peer {
                        url: self.url.clone(),
                    },
                )
                .await
            {
                warn!("unable to announce self to peer {}: {}", peer.url, err);
            }

            info!("peer {} added to connections", peer.url);
            self.peers.lock().expect("mutex poisoned").push(peer.clone());
            self.init_connection(&peer).await;
            self.broadcast_peer(&peer);
        }
    }

    /// Bootstrap sync against a fresh peer: its latest block and its pool.
    async fn init_connection(&self, peer: &Peer) {
        match self.client.get_latest_block(peer).await {
            Ok(block) => self.on_received_blocks(vec![block]).await,
            Err(err) => warn!("unable to get latest block from {}: {}", peer.url, err),
        }
        match self.client.get_transactions(peer).await {
            Ok(transactions) => self.sync_transactions(transactions),
            Err(err) => warn!("unable to get transactions from {}: {}", peer.url, err),
        }
    }

    /* ---------- Inbound ---------- */

    /// Adopt every received transaction we do not already hold; rejections
    /// are logged, never fatal.
    pub fn sync_transactions(&self, transactions: Vec<Transaction>) {
        let mut ledger = self.ledger.lock().expect("mutex poisoned");
        for tx in transactions {
            if ledger.get_transaction_by_id(&tx.id).is_some() {
                continue;
            }
            let id = tx.id.clone();
            match ledger.add_transaction(tx) {
                Ok(_) => info!("synced transaction '{id}'"),
                Err(err) => warn!("rejected synced transaction '{id}': {err}"),
            }
        }
    }

    /// The fork-resolution state machine, pure over its inputs. `received`
    /// must be sorted by index ascending and non-empty.
    pub fn decide(received: &[Block], local_tip: &Block) -> SyncAction {
        let latest_received = &received[received.len() - 1];

        if latest_received.index <= local_tip.index {
            return SyncAction::Ignore;
        }
        if local_tip.hash == latest_received.previous_hash {
            return SyncAction::Append(latest_received.clone());
        }
        if received.len() == 1 {
            return SyncAction::QueryAll;
        }
        SyncAction::Replace(received.to_vec())
    }

    /// React to blocks pushed by a peer (or pulled during bootstrap).
    pub async fn on_received_blocks(&self, mut blocks: Vec<Block>) {
        if blocks.is_empty() {
            return;
        }
        blocks.sort_by_key(|b| b.index);

        let action = {
            let ledger = self.ledger.lock().expect("mutex poisoned");
            Self::decide(&blocks, ledger.get_last_block())
        };

        if action == SyncAction::QueryAll {
            info!("querying full chain from peers");
            for peer in self.peers() {
                match self.client.get_blocks(&peer).await {
                    Ok(mut chain) => {
                        chain.sort_by_key(|b| b.index);
                        let follow_up = {
                            let ledger = self.ledger.lock().expect("mutex poisoned");
                            if chain.is_empty() {
                                SyncAction::Ignore
                            } else {
                                Self::decide(&chain, ledger.get_last_block())
                            }
                        };
                        // A full chain never needs another query round.
                        if follow_up != SyncAction::QueryAll {
                            self.apply(follow_up);
                        }
                    }
                    Err(err) => warn!("unable to get blocks from {}: {}", peer.url, err),
                }
            }
        } else {
            self.apply(action);
        }
    }

    fn apply(&self, action: SyncAction) {
        match action {
            SyncAction::Ignore => {
                info!("received blockchain is not ahead of ours, doing nothing");
            }
            SyncAction::Append(block) => {
                info!("appending received block {} to our chain", block.index);
                let mut ledger = self.ledger.lock().expect("mutex poisoned");
                if let Err(err) = ledger.add_block(block) {
                    error!("received block rejected: {err}");
                }
            }
            SyncAction::Replace(blocks) => {
                info!("received blockchain is longer than current blockchain");
                let mut ledger = self.ledger.lock().expect("mutex poisoned");
                if let Err(err) = ledger.replace_chain(blocks) {
                    error!("chain replacement failed: {err}");
                }
            }
            SyncAction::QueryAll => {
                debug!("nested chain query suppressed");
            }
        }
    }

    /* ---------- Outbound ---------- */

    /// Count how many nodes (self included) hold the transaction confirmed
    /// in a block.
    pub async fn get_confirmations(&self, transaction_id: &str) -> usize {
        let found_locally = {
            let ledger = self.ledger.lock().expect("mutex poisoned");
            ledger.get_transaction_from_blocks(transaction_id).is_some()
        };
        let mut confirmations = usize::from(found_locally);
        for peer in self.peers() {
            if self
                .client
                .has_confirmed_transaction(&peer, transaction_id)
                .await
            {
                confirmations += 1;
            }
        }
        confirmations
    }

    /// Fan a block out to every peer. Each send runs on its own task so one
    /// slow or dead peer cannot delay the others, and failures stay per-peer.
    fn broadcast_latest_block(&self, block: &Block) {
        for peer in self.peers() {
            let client = self.client.clone();
            let block = block.clone();
            tokio::spawn(async move {
                info!("posting latest block to {}", peer.url);
                if let Err(err) = client.put_latest_block(&peer, &block).await {
                    warn!("unable to post latest block to {}: {}", peer.url, err);
                }
            });
        }
    }

    fn broadcast_transaction(&self, tx: &Transaction) {
        for peer in self.peers() {
            let client = self.client.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                info!("sending transaction '{}' to {}", tx.id, peer.url);
                if let Err(err) = client.post_transaction(&peer, &tx).await {
                    warn!("unable to send transaction to {}: {}", peer.url, err);
                }
            });
        }
    }

    fn broadcast_peer(&self, new_peer: &Peer) {
        for peer in self.peers() {
            let client = self.client.clone();
            let new_peer = new_peer.clone();
            tokio::spawn(async move {
                info!("sending peer {} to {}", new_peer.url, peer.url);
                if let Err(err) = client.post_peer(&peer, &new_peer).await {
                    warn!("unable to send peer to {}: {}", peer.url, err);
                }
            });
        }
    }
}
