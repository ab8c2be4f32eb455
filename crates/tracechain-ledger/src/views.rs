use serde::{Deserialize, Serialize};
use tracechain_crypto::{canonical_event, event_leaves, MerkleProof, MerkleTree};
use tracechain_store::{BlockStore, EventStore};
use tracechain_types::{BatchId, BatchStatus, Block, BlockRef, EventId};

use crate::error::{LedgerError, LedgerResult};
use crate::history::TimelineEntry;

/// Page size used when the caller does not give one.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// Blocks listed newest-first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPage {
    pub blocks: Vec<Block>,
    pub pagination: Pagination,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u64,
    pub limit: u64,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    /// Normalize `page` and `limit` (zero means first page / default size).
    pub fn new(page: u64, limit: u64, total_count: u64) -> Self {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit };
        let total_pages = total_count.div_ceil(limit);
        Self {
            page,
            limit,
            total_count,
            total_pages,
            has_more: page < total_pages,
        }
    }

    fn offset(&self) -> usize {
        usize::try_from((self.page - 1).saturating_mul(self.limit)).unwrap_or(usize::MAX)
    }
}

/// One page of blocks, highest index first.
pub fn blocks_page<S: BlockStore + ?Sized>(store: &S, page: u64, limit: u64) -> LedgerResult<BlockPage> {
    let all = store.blocks()?;
    let pagination = Pagination::new(page, limit, all.len() as u64);
    let take = usize::try_from(pagination.limit).unwrap_or(usize::MAX);
    let blocks = all
        .into_iter()
        .rev()
        .skip(pagination.offset())
        .take(take)
        .collect();
    Ok(BlockPage { blocks, pagination })
}

/// Evidence that one event is committed by one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProof {
    pub event_id: EventId,
    pub block: BlockRef,
    /// The block's stored Merkle root.
    pub merkle_root: String,
    /// Position of the event within the block.
    pub leaf_index: usize,
    /// Canonical serialization hashed into the leaf.
    pub leaf_input: String,
    pub proof: MerkleProof,
    /// The proof checks out and its root equals the stored root.
    pub verified: bool,
}

/// Build the Merkle inclusion proof for a committed event.
pub fn prove_event<S: EventStore + BlockStore + ?Sized>(
    store: &S,
    event_id: &EventId,
) -> LedgerResult<EventProof> {
    let event = store
        .get_event(event_id)?
        .ok_or(LedgerError::EventNotFound(*event_id))?;
    let block_id = event
        .block_id
        .ok_or(LedgerError::EventNotCommitted(*event_id))?;
    let block = store
        .get_block(&block_id)?
        .ok_or(LedgerError::BlockNotFound(block_id))?;
    let leaf_index = block
        .event_ids
        .iter()
        .position(|id| id == event_id)
        .ok_or(LedgerError::EventNotInBlock {
            event: *event_id,
            block: block_id,
        })?;

    let siblings = block
        .event_ids
        .iter()
        .zip(store.get_events(&block.event_ids)?)
        .map(|(id, e)| e.ok_or(LedgerError::EventNotFound(*id)))
        .collect::<LedgerResult<Vec<_>>>()?;
    let tree = MerkleTree::from_inputs(&event_leaves(&siblings)?);
    let proof = tree.proof(leaf_index).ok_or(LedgerError::EventNotInBlock {
        event: *event_id,
        block: block_id,
    })?;

    let leaf_input = canonical_event(&event)?;
    let verified = proof.verify_input(&leaf_input) && proof.root == block.merkle_root;

    Ok(EventProof {
        event_id: *event_id,
        block: BlockRef::from(&block),
        merkle_root: block.merkle_root,
        leaf_index,
        leaf_input,
        proof,
        verified,
    })
}

/// Chain integrity summary shown alongside a public trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrity {
    pub verified: bool,
    /// Number of blocks in the chain.
    pub blocks: u64,
    /// Issue message lines; omitted when the chain is intact.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Public view of one batch: its timeline plus whole-chain integrity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceView {
    pub batch_id: BatchId,
    /// Latest status implied by the timeline, if any event implies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BatchStatus>,
    pub timeline: Vec<TimelineEntry>,
    pub integrity: Integrity,
}

impl TraceView {
    pub fn new(batch_id: BatchId, timeline: Vec<TimelineEntry>, integrity: Integrity) -> Self {
        let status = timeline
            .iter()
            .rev()
            .find_map(|entry| BatchStatus::implied_by(entry.event_type));
        Self {
            batch_id,
            status,
            timeline,
            integrity,
        }
    }
}
