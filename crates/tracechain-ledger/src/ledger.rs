use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracechain_store::{ActorDirectory, BlockStore, EventStore, LedgerStore};
use tracechain_types::{Actor, BatchId, Block, Clock, Event, EventId, NewEvent, SystemClock};
use tracing::debug;

use crate::builder::append_block;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::history::{self, AuditEntry, TimelineEntry};
use crate::verifier::{ChainVerifier, VerificationReport};
use crate::views::{self, BlockPage, EventProof, Integrity, TraceView};

/// Events created by one domain action and the block that committed them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub events: Vec<Event>,
    pub block: Block,
}

/// The block authority over a [`LedgerStore`].
///
/// Appends are serialized through an in-process lock; the store's
/// unique-index insert arbitrates between ledgers that share a store.
/// Reads take no ledger lock.
pub struct Ledger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    append_lock: Mutex<()>,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
            append_lock: Mutex::new(()),
        }
    }

    /// Replace the time source used for event and block timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Commit already-persisted pending events into the next block.
    pub fn append(&self, event_ids: &[EventId]) -> LedgerResult<Block> {
        // The guard protects no data, so a poisoned lock is still usable.
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);
        append_block(self.store.as_ref(), self.clock.as_ref(), &self.config, event_ids)
    }

    /// Persist the events of one domain action and commit them in one block.
    ///
    /// If the append fails, the events stay stored as pending.
    pub fn record(&self, new_events: Vec<NewEvent>) -> LedgerResult<RecordOutcome> {
        if new_events.is_empty() {
            return Err(LedgerError::EmptyBlock);
        }

        let mut events = Vec::with_capacity(new_events.len());
        for input in new_events {
            let event = Event::new(input, self.clock.now());
            self.store.insert_event(&event)?;
            debug!(event = %event.id, batch = %event.batch_id, kind = %event.event_type, "event recorded");
            events.push(event);
        }

        let ids: Vec<EventId> = events.iter().map(|e| e.id).collect();
        let block = self.append(&ids)?;
        for event in &mut events {
            event.block_id = Some(block.id);
        }
        Ok(RecordOutcome { events, block })
    }

    /// Re-derive every stored hash and report all integrity issues.
    pub fn verify(&self) -> LedgerResult<VerificationReport> {
        ChainVerifier::verify(self.store.as_ref())
    }

    pub fn history(&self, batch: &BatchId) -> LedgerResult<Vec<TimelineEntry>> {
        history::history(self.store.as_ref(), batch)
    }

    pub fn audit(&self, batch: &BatchId) -> LedgerResult<Vec<AuditEntry>> {
        history::audit(self.store.as_ref(), batch)
    }

    pub fn blocks_page(&self, page: u64, limit: u64) -> LedgerResult<BlockPage> {
        views::blocks_page(self.store.as_ref(), page, limit)
    }

    pub fn prove_event(&self, event_id: &EventId) -> LedgerResult<EventProof> {
        views::prove_event(self.store.as_ref(), event_id)
    }

    /// Public trace of a batch. Fails with `BatchNotFound` if it has no events.
    pub fn trace(&self, batch: &BatchId) -> LedgerResult<TraceView> {
        let timeline = self.history(batch)?;
        if timeline.is_empty() {
            return Err(LedgerError::BatchNotFound(batch.clone()));
        }
        let report = self.verify()?;
        let integrity = Integrity {
            verified: report.ok,
            blocks: report.blocks_checked,
            issues: report.messages(),
        };
        Ok(TraceView::new(batch.clone(), timeline, integrity))
    }

    /// Add a named actor to the directory.
    pub fn register_actor(&self, name: &str) -> LedgerResult<Actor> {
        let actor = Actor::new(name.trim());
        self.store.register_actor(&actor)?;
        debug!(actor = %actor.id, name = %actor.name, "actor registered");
        Ok(actor)
    }

    pub fn block_count(&self) -> LedgerResult<u64> {
        Ok(self.store.block_count()?)
    }

    pub fn tip(&self) -> LedgerResult<Option<Block>> {
        Ok(self.store.tip()?)
    }

    /// The stored block carrying `index`, if any.
    pub fn block_at(&self, index: u64) -> LedgerResult<Option<Block>> {
        Ok(self.store.blocks()?.into_iter().find(|b| b.index == index))
    }
}

impl<S> std::fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use tracechain_store::InMemoryStore;
    use tracechain_types::{ActorId, EventType, ManualClock, Payload, Timestamp};

    use super::*;

    fn ledger() -> Ledger<InMemoryStore> {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000).unwrap()));
        Ledger::new(Arc::new(InMemoryStore::new()), LedgerConfig::default()).with_clock(clock)
    }

    fn new_event(batch: &str, event_type: EventType, actor_id: ActorId) -> NewEvent {
        NewEvent {
            batch_id: BatchId::new(batch).unwrap(),
            event_type,
            payload: Payload::new(),
            actor_id,
        }
    }

    #[test]
    fn record_commits_events() {
        let ledger = ledger();
        let actor = ledger.register_actor("Green Farm").unwrap();

        let outcome = ledger
            .record(vec![new_event("B1", EventType::BatchCreated, actor.id)])
            .unwrap();

        assert_eq!(outcome.block.index, 0);
        assert_eq!(outcome.events[0].block_id, Some(outcome.block.id));
        let stored = ledger.store().get_event(&outcome.events[0].id).unwrap().unwrap();
        assert_eq!(stored, outcome.events[0]);
        assert!(ledger.verify().unwrap().ok);
    }

    #[test]
    fn record_rejects_empty_action() {
        assert!(matches!(ledger().record(vec![]), Err(LedgerError::EmptyBlock)));
    }

    #[test]
    fn trace_of_known_batch() {
        let ledger = ledger();
        let actor = ledger.register_actor("Green Farm").unwrap();
        ledger
            .record(vec![new_event("B1", EventType::BatchCreated, actor.id)])
            .unwrap();
        ledger
            .record(vec![new_event("B1", EventType::Transfer, actor.id)])
            .unwrap();

        let view = ledger.trace(&BatchId::new("B1").unwrap()).unwrap();
        assert_eq!(view.timeline.len(), 2);
        assert_eq!(view.timeline[0].actor_name, "Green Farm");
        assert_eq!(view.integrity.blocks, 2);
        assert!(view.integrity.verified);
    }

    #[test]
    fn trace_of_unknown_batch_is_not_found() {
        let err = ledger().trace(&BatchId::new("missing").unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::BatchNotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn block_at_finds_by_index() {
        let ledger = ledger();
        let actor = ActorId::new();
        let first = ledger
            .record(vec![new_event("B1", EventType::BatchCreated, actor)])
            .unwrap();
        ledger
            .record(vec![new_event("B2", EventType::BatchCreated, actor)])
            .unwrap();

        assert_eq!(ledger.block_at(0).unwrap(), Some(first.block));
        assert_eq!(ledger.block_at(1).unwrap().map(|b| b.index), Some(1));
        assert!(ledger.block_at(2).unwrap().is_none());
    }

    #[test]
    fn register_actor_trims_name() {
        let actor = ledger().register_actor("  Corner Shop ").unwrap();
        assert_eq!(actor.name, "Corner Shop");
    }
}
