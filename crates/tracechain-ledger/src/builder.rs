use std::collections::HashSet;

use tracechain_crypto::{block_hash, events_merkle_root, expected_prev_hash};
use tracechain_store::{EventStore, LedgerStore, StoreError};
use tracechain_types::{Block, BlockId, Clock, Event, EventId, Timestamp};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

/// Load the events a new block will commit, in the order given.
///
/// Rejects an empty list, repeated ids, unknown ids, and events that are
/// already committed. Nothing is written.
pub fn load_pending<S: EventStore + ?Sized>(store: &S, ids: &[EventId]) -> LedgerResult<Vec<Event>> {
    if ids.is_empty() {
        return Err(LedgerError::EmptyBlock);
    }

    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(LedgerError::DuplicateEvent(*dup));
    }

    ids.iter()
        .zip(store.get_events(ids)?)
        .map(|(id, event)| -> LedgerResult<Event> {
            let event = event.ok_or(LedgerError::EventNotFound(*id))?;
            match event.block_id {
                Some(block) => Err(LedgerError::EventAlreadyCommitted { event: *id, block }),
                None => Ok(event),
            }
        })
        .collect()
}

/// Build the block that would follow `tip`.
///
/// The block time is `now`, raised to the tip's time if the clock is behind
/// it, so block timestamps never decrease along the chain.
pub fn next_block(
    tip: Option<&Block>,
    now: Timestamp,
    merkle_root: &str,
    signer: &str,
    event_ids: Vec<EventId>,
) -> Block {
    let index = tip.map_or(0, |b| b.index + 1);
    let prev_hash = expected_prev_hash(tip).to_string();
    let timestamp = match tip {
        Some(t) if t.timestamp > now => t.timestamp,
        _ => now,
    };
    let hash = block_hash(index, &timestamp, &prev_hash, merkle_root);

    Block {
        id: BlockId::new(),
        index,
        timestamp,
        prev_hash,
        merkle_root: merkle_root.to_string(),
        hash,
        signer: signer.to_string(),
        event_ids,
    }
}

/// Commit `ids` into a new block on top of the current tip.
///
/// The store's atomic commit decides races: on an index conflict the tip is
/// re-read and the block rebuilt, up to `config.max_attempts()` times. If
/// another writer commits one of the events first, the append fails with
/// [`LedgerError::EventAlreadyCommitted`] and nothing is written.
///
/// Callers serialize appends within a process; see [`Ledger::append`](crate::Ledger::append).
pub fn append_block<S: LedgerStore + ?Sized>(
    store: &S,
    clock: &dyn Clock,
    config: &LedgerConfig,
    ids: &[EventId],
) -> LedgerResult<Block> {
    let events = load_pending(store, ids)?;
    let merkle_root = events_merkle_root(&events)?;
    let attempts = config.max_attempts();

    for attempt in 1..=attempts {
        let tip = store.tip()?;
        let block = next_block(
            tip.as_ref(),
            clock.now(),
            &merkle_root,
            &config.signer,
            ids.to_vec(),
        );

        match store.commit_block(&block) {
            Ok(()) => {
                info!(
                    index = block.index,
                    hash = block.short_hash(),
                    events = ids.len(),
                    "block appended"
                );
                return Ok(block);
            }
            Err(e) if e.is_conflict() => {
                warn!(attempt, index = block.index, "block index taken, rebuilding on new tip");
            }
            Err(StoreError::AlreadyCommitted { event, block: other }) => {
                warn!(%event, block = %other, "event committed by another writer");
                return Err(LedgerError::EventAlreadyCommitted { event, block: other });
            }
            Err(e) => return Err(e.into()),
        }
    }

    debug!(attempts, "giving up on append");
    Err(LedgerError::AppendConflict { attempts })
}

#[cfg(test)]
pub(crate) mod tests {
    use tracechain_crypto::{canonical_event, digest, recompute_block_hash};
    use tracechain_store::{BlockStore, InMemoryStore};
    use tracechain_types::{
        ActorId, BatchId, EventType, ManualClock, NewEvent, Payload, GENESIS_PREV_HASH,
    };

    use super::*;

    pub(crate) fn stored_event<S: EventStore>(
        store: &S,
        batch: &str,
        event_type: EventType,
        millis: i64,
    ) -> Event {
        let event = Event::new(
            NewEvent {
                batch_id: BatchId::new(batch).unwrap(),
                event_type,
                payload: Payload::new(),
                actor_id: ActorId::new(),
            },
            Timestamp::from_millis(millis).unwrap(),
        );
        store.insert_event(&event).unwrap();
        event
    }

    fn clock(millis: i64) -> ManualClock {
        ManualClock::new(Timestamp::from_millis(millis).unwrap())
    }

    #[test]
    fn first_block_is_genesis() {
        let store = InMemoryStore::new();
        let e1 = stored_event(&store, "B1", EventType::BatchCreated, 1_000);
        let clock = clock(2_000);

        let block = append_block(&store, &clock, &LedgerConfig::default(), &[e1.id]).unwrap();

        assert_eq!(block.index, 0);
        assert_eq!(block.prev_hash, GENESIS_PREV_HASH);
        assert_eq!(block.merkle_root, digest(canonical_event(&e1).unwrap()));
        assert_eq!(block.signer, "PoA");
        assert_eq!(recompute_block_hash(&block), block.hash);
        assert_eq!(store.get_event(&e1.id).unwrap().unwrap().block_id, Some(block.id));
    }

    #[test]
    fn second_block_links_to_first() {
        let store = InMemoryStore::new();
        let clock = clock(10_000);
        let config = LedgerConfig::default();
        let e1 = stored_event(&store, "B1", EventType::BatchCreated, 1);
        let e2 = stored_event(&store, "B1", EventType::HarvestUpdated, 2);
        let e3 = stored_event(&store, "B1", EventType::CertUpload, 3);

        let b0 = append_block(&store, &clock, &config, &[e1.id]).unwrap();
        clock.advance(5);
        let b1 = append_block(&store, &clock, &config, &[e2.id, e3.id]).unwrap();

        assert_eq!(b1.index, 1);
        assert_eq!(b1.prev_hash, b0.hash);
        assert_eq!(b1.event_ids, vec![e2.id, e3.id]);
    }

    #[test]
    fn block_time_never_goes_backwards() {
        let store = InMemoryStore::new();
        let clock = clock(50_000);
        let config = LedgerConfig::default();
        let e1 = stored_event(&store, "B1", EventType::BatchCreated, 1);
        let e2 = stored_event(&store, "B1", EventType::Transfer, 2);

        let b0 = append_block(&store, &clock, &config, &[e1.id]).unwrap();
        clock.set(Timestamp::from_millis(10).unwrap());
        let b1 = append_block(&store, &clock, &config, &[e2.id]).unwrap();

        assert_eq!(b1.timestamp, b0.timestamp);
        assert_eq!(recompute_block_hash(&b1), b1.hash);
    }

    #[test]
    fn rejects_bad_inputs_without_writing() {
        let store = InMemoryStore::new();
        let clock = clock(0);
        let config = LedgerConfig::default();
        let e1 = stored_event(&store, "B1", EventType::BatchCreated, 1);

        assert!(matches!(
            append_block(&store, &clock, &config, &[]),
            Err(LedgerError::EmptyBlock)
        ));
        assert!(matches!(
            append_block(&store, &clock, &config, &[e1.id, e1.id]),
            Err(LedgerError::DuplicateEvent(id)) if id == e1.id
        ));
        let ghost = EventId::new();
        assert!(matches!(
            append_block(&store, &clock, &config, &[e1.id, ghost]),
            Err(LedgerError::EventNotFound(id)) if id == ghost
        ));
        assert_eq!(store.block_count().unwrap(), 0);
        assert_eq!(store.get_event(&e1.id).unwrap().unwrap().block_id, None);
    }

    #[test]
    fn committed_event_cannot_be_committed_again() {
        let store = InMemoryStore::new();
        let clock = clock(0);
        let config = LedgerConfig::default();
        let e1 = stored_event(&store, "B1", EventType::BatchCreated, 1);
        let b0 = append_block(&store, &clock, &config, &[e1.id]).unwrap();

        let err = append_block(&store, &clock, &config, &[e1.id]).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::EventAlreadyCommitted { event, block } if event == e1.id && block == b0.id
        ));
        assert_eq!(store.block_count().unwrap(), 1);
    }

    #[test]
    fn next_block_on_empty_chain() {
        let now = Timestamp::from_millis(0).unwrap();
        let block = next_block(None, now, &digest("empty"), "PoA", vec![]);
        assert_eq!(block.index, 0);
        assert_eq!(block.prev_hash, GENESIS_PREV_HASH);
        assert_eq!(
            block.hash,
            digest(format!("01970-01-01T00:00:00.000ZGENESIS{}", digest("empty")))
        );
    }
}
