use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidId { value: String, reason: String },

    #[error("batch id must not be empty")]
    EmptyBatchId,

    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("unknown batch status: {0}")]
    UnknownBatchStatus(String),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}
