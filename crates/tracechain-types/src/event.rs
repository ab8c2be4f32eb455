use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{ActorId, BatchId, BlockId, EventId};
use crate::temporal::Timestamp;

/// Free-form, type-specific event data. Never interpreted by the ledger.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Kind of supply-chain fact an [`Event`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A producer registered a new batch.
    BatchCreated,
    /// Harvest details of the batch changed.
    HarvestUpdated,
    /// A certification document was attached.
    CertUpload,
    /// Custody handed to another party.
    Transfer,
    /// The receiving party took delivery.
    Receive,
    /// The batch was placed in storage.
    Store,
    /// The batch was sold to a consumer.
    Sell,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        Self::BatchCreated,
        Self::HarvestUpdated,
        Self::CertUpload,
        Self::Transfer,
        Self::Receive,
        Self::Store,
        Self::Sell,
    ];

    /// Wire name (`BATCH_CREATED`, `TRANSFER`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BatchCreated => "BATCH_CREATED",
            Self::HarvestUpdated => "HARVEST_UPDATED",
            Self::CertUpload => "CERT_UPLOAD",
            Self::Transfer => "TRANSFER",
            Self::Receive => "RECEIVE",
            Self::Store => "STORE",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| TypeError::UnknownEventType(s.to_string()))
    }
}

/// Lifecycle status of a batch as tracked by the batch service.
///
/// The ledger never enforces transitions between statuses; this vocabulary
/// exists so collaborators and read views agree on names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Created,
    Processing,
    Certified,
    InTransit,
    Received,
    Stored,
    Sold,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 7] = [
        Self::Created,
        Self::Processing,
        Self::Certified,
        Self::InTransit,
        Self::Received,
        Self::Stored,
        Self::Sold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Processing => "PROCESSING",
            Self::Certified => "CERTIFIED",
            Self::InTransit => "IN_TRANSIT",
            Self::Received => "RECEIVED",
            Self::Stored => "STORED",
            Self::Sold => "SOLD",
        }
    }

    /// Status a batch is in right after an event of the given type.
    ///
    /// Returns `None` for events that leave the status unchanged or whose
    /// effect depends on payload contents (certification approval).
    pub fn implied_by(event_type: EventType) -> Option<Self> {
        match event_type {
            EventType::BatchCreated => Some(Self::Created),
            EventType::Transfer => Some(Self::InTransit),
            EventType::Receive => Some(Self::Received),
            EventType::Store => Some(Self::Stored),
            EventType::Sell => Some(Self::Sold),
            EventType::HarvestUpdated | EventType::CertUpload => None,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == wanted)
            .ok_or_else(|| TypeError::UnknownBatchStatus(s.to_string()))
    }
}

/// Event fields supplied by a domain service before the ledger assigns
/// an identifier and timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub batch_id: BatchId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub payload: Payload,
    pub actor_id: ActorId,
}

/// An immutable fact about one batch.
///
/// `block_id` is the only field that ever changes, and only once: from
/// `None` to the block that committed the event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub batch_id: BatchId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: Payload,
    pub actor_id: ActorId,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
}

impl Event {
    /// Materialize a new, uncommitted event.
    pub fn new(input: NewEvent, timestamp: Timestamp) -> Self {
        Self {
            id: EventId::new(),
            batch_id: input.batch_id,
            event_type: input.event_type,
            payload: input.payload,
            actor_id: input.actor_id,
            timestamp,
            block_id: None,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.block_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_event() -> NewEvent {
        NewEvent {
            batch_id: BatchId::new("B1").unwrap(),
            event_type: EventType::BatchCreated,
            payload: Payload::new(),
            actor_id: ActorId::new(),
        }
    }

    #[test]
    fn event_type_wire_names() {
        let json = serde_json::to_string(&EventType::CertUpload).unwrap();
        assert_eq!(json, "\"CERT_UPLOAD\"");
        for t in EventType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn event_type_parse_is_lenient_about_case() {
        assert_eq!("transfer".parse::<EventType>().unwrap(), EventType::Transfer);
        assert_eq!(
            "harvest-updated".parse::<EventType>().unwrap(),
            EventType::HarvestUpdated
        );
        assert!("MINT".parse::<EventType>().is_err());
    }

    #[test]
    fn batch_status_parse_and_display() {
        assert_eq!("in_transit".parse::<BatchStatus>().unwrap(), BatchStatus::InTransit);
        assert_eq!(BatchStatus::Sold.to_string(), "SOLD");
        assert!("LOST".parse::<BatchStatus>().is_err());
    }

    #[test]
    fn implied_status() {
        assert_eq!(
            BatchStatus::implied_by(EventType::Transfer),
            Some(BatchStatus::InTransit)
        );
        assert_eq!(BatchStatus::implied_by(EventType::CertUpload), None);
    }

    #[test]
    fn new_event_is_uncommitted() {
        let event = Event::new(new_event(), Timestamp::epoch());
        assert!(!event.is_committed());
        assert_eq!(event.event_type, EventType::BatchCreated);
    }

    #[test]
    fn event_json_uses_camel_case_and_type_key() {
        let mut event = Event::new(new_event(), Timestamp::epoch());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BATCH_CREATED");
        assert_eq!(json["batchId"], "B1");
        assert!(json.get("blockId").is_none());

        event.block_id = Some(BlockId::new());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("blockId").is_some());
        let parsed: Event = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn new_event_payload_defaults_to_empty() {
        let actor = ActorId::new();
        let raw = format!(r#"{{"batchId":"B9","type":"SELL","actorId":"{actor}"}}"#);
        let parsed: NewEvent = serde_json::from_str(&raw).unwrap();
        assert!(parsed.payload.is_empty());
        assert_eq!(parsed.event_type, EventType::Sell);
    }
}
