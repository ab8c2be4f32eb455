use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracechain_store::{ActorDirectory, BlockStore, EventStore};
use tracechain_types::{
    ActorId, BatchId, BlockId, BlockRef, Event, EventType, Payload, Timestamp, UNKNOWN_ACTOR_NAME,
};

use crate::error::{LedgerError, LedgerResult};

/// One row of a batch's human-readable history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub event_type: EventType,
    pub occurred_at: Timestamp,
    /// Resolved display name, or `"Unknown"`.
    pub actor_name: String,
    pub payload: Payload,
}

/// One event of a batch together with the block that committed it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub event: Event,
    /// Absent while the event is still pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockRef>,
}

/// A batch's events ordered by timestamp, ties broken by event id.
pub fn batch_events<S: EventStore + ?Sized>(store: &S, batch: &BatchId) -> LedgerResult<Vec<Event>> {
    let mut events = store.events_for_batch(batch)?;
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    Ok(events)
}

/// Assemble the timeline of a batch. Unknown batches yield an empty list.
///
/// Reads the store as-is; nothing here is verified against the chain.
pub fn history<S: EventStore + ActorDirectory + ?Sized>(
    store: &S,
    batch: &BatchId,
) -> LedgerResult<Vec<TimelineEntry>> {
    let events = batch_events(store, batch)?;
    let mut names: HashMap<ActorId, String> = HashMap::new();

    events
        .into_iter()
        .map(|event| -> LedgerResult<TimelineEntry> {
            let actor_name = match names.get(&event.actor_id) {
                Some(name) => name.clone(),
                None => {
                    let name = store
                        .get_actor(&event.actor_id)?
                        .map_or_else(|| UNKNOWN_ACTOR_NAME.to_string(), |a| a.name);
                    names.insert(event.actor_id, name.clone());
                    name
                }
            };
            Ok(TimelineEntry {
                event_type: event.event_type,
                occurred_at: event.timestamp,
                actor_name,
                payload: event.payload,
            })
        })
        .collect()
}

/// Every event of a batch with its committing block resolved.
pub fn audit<S: EventStore + BlockStore + ?Sized>(
    store: &S,
    batch: &BatchId,
) -> LedgerResult<Vec<AuditEntry>> {
    let events = batch_events(store, batch)?;
    let mut refs: HashMap<BlockId, BlockRef> = HashMap::new();

    events
        .into_iter()
        .map(|event| -> LedgerResult<AuditEntry> {
            let block = match event.block_id {
                None => None,
                Some(id) => match refs.get(&id) {
                    Some(r) => Some(r.clone()),
                    None => {
                        let block = store.get_block(&id)?.ok_or(LedgerError::BlockNotFound(id))?;
                        let r = BlockRef::from(&block);
                        refs.insert(id, r.clone());
                        Some(r)
                    }
                },
            };
            Ok(AuditEntry { event, block })
        })
        .collect()
}
