use serde::Serialize;
use tracechain_types::{Event, EventType};

use crate::merkle::merkle_root;

/// Fields of an event that enter its Merkle leaf, in leaf order.
///
/// Changing the field set, their order, or the timestamp format breaks
/// verification of every block already written.
#[derive(Serialize)]
struct CanonicalEvent<'a> {
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(rename = "batchId")]
    batch_id: &'a str,
    timestamp: String,
}

/// Canonical Merkle-leaf serialization of an event:
/// `{"type":"…","batchId":"…","timestamp":"…Z"}`.
pub fn canonical_event(event: &Event) -> Result<String, HashError> {
    let canonical = CanonicalEvent {
        event_type: event.event_type,
        batch_id: event.batch_id.as_str(),
        timestamp: event.timestamp.to_iso(),
    };
    serde_json::to_string(&canonical).map_err(|e| HashError::Serialization(e.to_string()))
}

/// Canonical leaf inputs for `events`, preserving order.
pub fn event_leaves(events: &[Event]) -> Result<Vec<String>, HashError> {
    events.iter().map(canonical_event).collect()
}

/// Merkle root committing to `events` in the given order.
pub fn events_merkle_root(events: &[Event]) -> Result<String, HashError> {
    Ok(merkle_root(&event_leaves(events)?))
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HashError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
