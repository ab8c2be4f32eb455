use serde::{Deserialize, Serialize};

use crate::ids::{BlockId, EventId};
use crate::temporal::Timestamp;

/// `prev_hash` sentinel carried by the block at index 0.
pub const GENESIS_PREV_HASH: &str = "GENESIS";

/// An immutable, hash-linked unit of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Storage identifier referenced by committed events.
    pub id: BlockId,
    /// Zero-based position in the chain.
    pub index: u64,
    pub timestamp: Timestamp,
    /// `hash` of the previous block, or [`GENESIS_PREV_HASH`].
    pub prev_hash: String,
    /// Commitment over this block's events.
    pub merkle_root: String,
    /// Digest of `index ‖ timestamp ‖ prev_hash ‖ merkle_root`.
    pub hash: String,
    /// Authority that produced the block.
    pub signer: String,
    /// Committed events, in commitment order. Never empty.
    pub event_ids: Vec<EventId>,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Short hash (first 8 hex characters) for display.
    pub fn short_hash(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }
}

/// Lightweight reference to a block, used in audit views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    pub id: BlockId,
    pub index: u64,
    pub hash: String,
    pub timestamp: Timestamp,
}

impl From<&Block> for BlockRef {
    fn from(block: &Block) -> Self {
        Self {
            id: block.id,
            index: block.index,
            hash: block.hash.clone(),
            timestamp: block.timestamp,
        }
    }
}
