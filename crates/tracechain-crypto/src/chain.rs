use tracechain_types::{Block, Timestamp, GENESIS_PREV_HASH};

use crate::hasher::digest_concat;

/// Block hash: `digest(index ‖ timestampISO ‖ prev_hash ‖ merkle_root)`.
///
/// Fields are concatenated as strings, in that order, with no separators.
/// `index` is rendered in decimal.
pub fn block_hash(index: u64, timestamp: &Timestamp, prev_hash: &str, merkle_root: &str) -> String {
    digest_concat(&[
        index.to_string().as_bytes(),
        timestamp.to_iso().as_bytes(),
        prev_hash.as_bytes(),
        merkle_root.as_bytes(),
    ])
}

/// Recompute a stored block's hash from its own header fields.
pub fn recompute_block_hash(block: &Block) -> String {
    block_hash(block.index, &block.timestamp, &block.prev_hash, &block.merkle_root)
}

/// The `prev_hash` a block must carry given its predecessor.
pub fn expected_prev_hash(previous: Option<&Block>) -> &str {
    previous.map_or(GENESIS_PREV_HASH, |b| b.hash.as_str())
}
