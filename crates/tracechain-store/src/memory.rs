use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracechain_types::{Actor, ActorId, BatchId, Block, BlockId, Event, EventId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ActorDirectory, BlockStore, EventStore};

/// Indexed ledger records shared by the in-memory and journal backends.
///
/// Every mutation is split into `check_*` (may fail, changes nothing) and
/// `apply_*` (cannot fail). Backends that need to persist a record do so
/// between the two steps while holding the write lock.
#[derive(Default)]
pub(crate) struct StoreState {
    events: HashMap<EventId, Event>,
    batch_index: HashMap<BatchId, Vec<EventId>>,
    /// Insertion order; sorted by index on read.
    blocks: Vec<Block>,
    block_positions: HashMap<BlockId, usize>,
    actors: HashMap<ActorId, Actor>,
}

impl StoreState {
    pub(crate) fn check_insert_event(&self, event: &Event) -> StoreResult<()> {
        if self.events.contains_key(&event.id) {
            return Err(StoreError::DuplicateEvent(event.id));
        }
        Ok(())
    }

    pub(crate) fn apply_insert_event(&mut self, event: Event) {
        self.batch_index
            .entry(event.batch_id.clone())
            .or_default()
            .push(event.id);
        self.events.insert(event.id, event);
    }

    /// A block may only take a free index and commit known, pending events.
    pub(crate) fn check_commit_block(&self, block: &Block) -> StoreResult<()> {
        if self.blocks.iter().any(|b| b.index == block.index) {
            return Err(StoreError::IndexConflict { index: block.index });
        }
        if self.block_positions.contains_key(&block.id) {
            return Err(StoreError::DuplicateBlock(block.id));
        }
        for id in &block.event_ids {
            let event = self.events.get(id).ok_or(StoreError::EventNotFound(*id))?;
            if let Some(committed) = event.block_id {
                return Err(StoreError::AlreadyCommitted {
                    event: *id,
                    block: committed,
                });
            }
        }
        Ok(())
    }

    /// Insert the block and point each of its events at it.
    ///
    /// Unknown event ids are skipped so a replayed journal loads as written.
    pub(crate) fn apply_commit_block(&mut self, block: Block) {
        for id in &block.event_ids {
            if let Some(event) = self.events.get_mut(id) {
                event.block_id = Some(block.id);
            }
        }
        self.block_positions.insert(block.id, self.blocks.len());
        self.blocks.push(block);
    }

    pub(crate) fn apply_register_actor(&mut self, actor: Actor) {
        self.actors.insert(actor.id, actor);
    }

    pub(crate) fn tip(&self) -> Option<&Block> {
        self.blocks.iter().max_by_key(|b| b.index)
    }

    pub(crate) fn sorted_blocks(&self) -> Vec<Block> {
        let mut blocks = self.blocks.clone();
        blocks.sort_by_key(|b| b.index);
        blocks
    }

    pub(crate) fn get_block(&self, id: &BlockId) -> Option<Block> {
        self.block_positions
            .get(id)
            .and_then(|pos| self.blocks.get(*pos))
            .cloned()
    }

    pub(crate) fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub(crate) fn get_events(&self, ids: &[EventId]) -> Vec<Option<Event>> {
        ids.iter().map(|id| self.events.get(id).cloned()).collect()
    }

    pub(crate) fn get_actor(&self, id: &ActorId) -> Option<Actor> {
        self.actors.get(id).cloned()
    }

    pub(crate) fn events_for_batch(&self, batch: &BatchId) -> Vec<Event> {
        self.batch_index
            .get(batch)
            .map(|ids| ids.iter().filter_map(|id| self.events.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

/// Shared read/write helpers for backends built on [`StoreState`].
pub(crate) trait StateLock {
    fn state(&self) -> &RwLock<StoreState>;

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state().read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state().write().map_err(|_| StoreError::LockPoisoned)
    }
}

/// In-memory ledger store.
///
/// Intended for tests and embedding. All records are held behind a single
/// `RwLock`, so every operation observes a consistent snapshot.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreState>,
}

impl StateLock for InMemoryStore {
    fn state(&self) -> &RwLock<StoreState> {
        &self.inner
    }
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub fn event_count(&self) -> StoreResult<usize> {
        Ok(self.read_state()?.events.len())
    }

    /// Overwrite a stored block in place, bypassing every check.
    ///
    /// Exists to simulate after-the-fact tampering in audit drills and tests.
    /// Returns `false` if no block has the given index.
    pub fn rewrite_block(&self, index: u64, edit: impl FnOnce(&mut Block)) -> StoreResult<bool> {
        let mut state = self.write_state()?;
        match state.blocks.iter_mut().find(|b| b.index == index) {
            Some(block) => {
                edit(block);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Overwrite a stored event in place, bypassing every check.
    ///
    /// The batch index is not rebuilt, so a rewritten `batch_id` keeps the
    /// event listed under its original batch.
    pub fn rewrite_event(&self, id: &EventId, edit: impl FnOnce(&mut Event)) -> StoreResult<bool> {
        let mut state = self.write_state()?;
        match state.events.get_mut(id) {
            Some(event) => {
                edit(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove an event record outright, bypassing every check.
    pub fn purge_event(&self, id: &EventId) -> StoreResult<bool> {
        Ok(self.write_state()?.events.remove(id).is_some())
    }
}

impl EventStore for InMemoryStore {
    fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.check_insert_event(event)?;
        state.apply_insert_event(event.clone());
        Ok(())
    }

    fn get_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
        Ok(self.read_state()?.events.get(id).cloned())
    }

    fn get_events(&self, ids: &[EventId]) -> StoreResult<Vec<Option<Event>>> {
        Ok(self.read_state()?.get_events(ids))
    }

    fn events_for_batch(&self, batch: &BatchId) -> StoreResult<Vec<Event>> {
        Ok(self.read_state()?.events_for_batch(batch))
    }

}

impl BlockStore for InMemoryStore {
    fn tip(&self) -> StoreResult<Option<Block>> {
        Ok(self.read_state()?.tip().cloned())
    }

    fn commit_block(&self, block: &Block) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.check_commit_block(block)?;
        state.apply_commit_block(block.clone());
        Ok(())
    }

    fn blocks(&self) -> StoreResult<Vec<Block>> {
        Ok(self.read_state()?.sorted_blocks())
    }

    fn get_block(&self, id: &BlockId) -> StoreResult<Option<Block>> {
        Ok(self.read_state()?.get_block(id))
    }

    fn block_count(&self) -> StoreResult<u64> {
        Ok(self.read_state()?.block_count())
    }
}

impl ActorDirectory for InMemoryStore {
    fn register_actor(&self, actor: &Actor) -> StoreResult<()> {
        self.write_state()?.apply_register_actor(actor.clone());
        Ok(())
    }

    fn get_actor(&self, id: &ActorId) -> StoreResult<Option<Actor>> {
        Ok(self.read_state()?.get_actor(id))
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (events, blocks) = self
            .read_state()
            .map(|s| (s.events.len(), s.blocks.len()))
            .unwrap_or_default();
        f.debug_struct("InMemoryStore")
            .field("event_count", &events)
            .field("block_count", &blocks)
            .finish()
    }
}
