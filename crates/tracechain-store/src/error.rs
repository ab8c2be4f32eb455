use std::path::PathBuf;

use tracechain_types::{BlockId, EventId};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An event with this id was already stored.
    #[error("event already exists: {0}")]
    DuplicateEvent(EventId),

    /// The referenced event does not exist.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// A block already occupies this index (lost a concurrent append).
    #[error("block index {index} is already taken")]
    IndexConflict { index: u64 },

    /// A block with this id was already stored.
    #[error("block already exists: {0}")]
    DuplicateBlock(BlockId),

    /// The event already carries a block reference.
    #[error("event {event} is already committed to block {block}")]
    AlreadyCommitted { event: EventId, block: BlockId },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A journal line in the middle of the file could not be decoded.
    #[error("corrupt journal {path:?} at line {line}: {reason}")]
    CorruptJournal {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` for the error that signals a lost append race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::IndexConflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
