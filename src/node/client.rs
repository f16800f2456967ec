use reqwest::Client;

use super::model::Peer;
use crate::blockchain::Block;
use crate::error::NodeError;
use crate::transaction::Transaction;

/// HTTP client for the peer protocol. Cheap to clone; every request targets
/// one peer and maps transport failures into `NodeError::Network` so callers
/// can log and move on.
#[derive(Debug, Clone, Default)]
pub struct PeerClient {
    client: Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub async fn get_latest_block(&self, peer: &Peer) -> Result<Block, NodeError> {
        let url = format!("{}/blockchain/blocks/latest", peer.url);
        let resp = self.checked_get(&url).await?;
        resp.json().await.map_err(|e| NodeError::Network(e.to_string()))
    }

    pub async fn put_latest_block(&self, peer: &Peer, block: &Block) -> Result<(), NodeError> {
        let url = format!("{}/blockchain/blocks/latest", peer.url);
        let resp = self
            .client
            .put(&url)
            .json(block)
            .send()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;
        Self::ok_or_status(&url, resp.status())
    }

    pub async fn get_blocks(&self, peer: &Peer) -> Result<Vec<Block>, NodeError> {
        let url = format!("{}/blockchain/blocks", peer.url);
        let resp = self.checked_get(&url).await?;
        resp.json().await.map_err(|e| NodeError::Network(e.to_string()))
    }

    pub async fn get_transactions(&self, peer: &Peer) -> Result<Vec<Transaction>, NodeError> {
        let url = format!("{}/blockchain/transactions", peer.url);
        let resp = self.checked_get(&url).await?;
        resp.json().await.map_err(|e| NodeError::Network(e.to_string()))
    }

    pub async fn post_transaction(&self, peer: &Peer, tx: &Transaction) -> Result<(), NodeError> {
        let url = format!("{}/blockchain/transactions", peer.url);
        let resp = self
            .client
            .post(&url)
            .json(tx)
            .send()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;
        Self::ok_or_status(&url, resp.status())
    }

    /// Announce `announced` to `peer`.
    pub async fn post_peer(&self, peer: &Peer, announced: &Peer) -> Result<(), NodeError> {
        let url = format!("{}/node/peers", peer.url);
        let resp = self
            .client
            .post(&url)
            .json(announced)
            .send()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;
        Self::ok_or_status(&url, resp.status())
    }

    /// Whether `peer` has the transaction confirmed in a block. Any transport
    /// failure counts as unconfirmed.
    pub async fn has_confirmed_transaction(&self, peer: &Peer, transaction_id: &str) -> bool {
        let url = format!("{}/blockchain/blocks/transactions/{transaction_id}", peer.url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn checked_get(&self, url: &str) -> Result<reqwest::Response, NodeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;
        Self::ok_or_status(url, resp.status())?;
        Ok(resp)
    }

    fn ok_or_status(url: &str, status: reqwest::StatusCode) -> Result<(), NodeError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(NodeError::Network(format!(
                "request to {url} failed: {status}"
            )))
        }
    }
}
