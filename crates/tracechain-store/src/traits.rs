use tracechain_types::{Actor, ActorId, BatchId, Block, BlockId, Event, EventId};

use crate::error::StoreResult;

/// Durable store of event records.
///
/// Implementations must satisfy:
/// - An event id is inserted at most once.
/// - An event's block id is set only by [`BlockStore::commit_block`] and
///   never changes afterwards.
pub trait EventStore: Send + Sync {
    /// Persist a new event. Fails with `DuplicateEvent` if the id exists.
    fn insert_event(&self, event: &Event) -> StoreResult<()>;

    /// Read an event by id. Returns `Ok(None)` if it does not exist.
    fn get_event(&self, id: &EventId) -> StoreResult<Option<Event>>;

    /// Read several events, preserving the order of `ids`.
    ///
    /// Default implementation calls `get_event()` for each id.
    fn get_events(&self, ids: &[EventId]) -> StoreResult<Vec<Option<Event>>> {
        ids.iter().map(|id| self.get_event(id)).collect()
    }

    /// All events for a batch, in no particular order.
    fn events_for_batch(&self, batch: &BatchId) -> StoreResult<Vec<Event>>;
}

/// Durable store of ledger blocks.
pub trait BlockStore: Send + Sync {
    /// The block with the highest index, or `None` for an empty chain.
    fn tip(&self) -> StoreResult<Option<Block>>;

    /// Atomically insert a block and annotate every event it lists.
    ///
    /// Fails with `IndexConflict` if a block with the same index exists,
    /// `EventNotFound` for an unknown event, and `AlreadyCommitted` if any
    /// listed event already belongs to a block. On failure nothing changes.
    fn commit_block(&self, block: &Block) -> StoreResult<()>;

    /// Every block, ordered by index ascending.
    fn blocks(&self) -> StoreResult<Vec<Block>>;

    /// Read a block by storage id.
    fn get_block(&self, id: &BlockId) -> StoreResult<Option<Block>>;

    /// Number of stored blocks.
    fn block_count(&self) -> StoreResult<u64> {
        Ok(self.blocks()?.len() as u64)
    }
}

/// Directory resolving actor ids to display names.
pub trait ActorDirectory: Send + Sync {
    /// Register or rename an actor.
    fn register_actor(&self, actor: &Actor) -> StoreResult<()>;

    fn get_actor(&self, id: &ActorId) -> StoreResult<Option<Actor>>;
}

/// Everything the ledger needs from storage.
pub trait LedgerStore: EventStore + BlockStore + ActorDirectory {}

impl<T: EventStore + BlockStore + ActorDirectory> LedgerStore for T {}
