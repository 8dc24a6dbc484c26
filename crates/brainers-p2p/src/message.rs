use serde::{Deserialize, Serialize};
use serde_json::Value;

use brainers_core::block::Block;
use brainers_core::error::LedgerError;
use brainers_core::transaction::Transaction;

/// One peer-protocol frame. The wire form is JSON with a `type` tag, e.g.
/// `{"type":"sync_request","last_block":41}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Establishes a peer; no payload, no response.
    Hello,
    /// Gossip of a pending transaction.
    NewTransaction { transaction: Transaction },
    /// Answer to `new_transaction`.
    TransactionResponse { success: bool },
    /// Gossip of a committed block; re-broadcast on acceptance.
    NewBlock { block: Block },
    /// Ask for the node's chain summary.
    GetBlockchainState,
    BlockchainState { state: Value },
    /// Ask for every block strictly after `last_block` (−1 = everything).
    SyncRequest { last_block: i64 },
    SyncResponse { blocks: Vec<Block> },
}

impl PeerMessage {
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).expect("peer message serialization is infallible")
    }

    pub fn from_text(text: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(text).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
