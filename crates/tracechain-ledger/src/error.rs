use tracechain_crypto::HashError;
use tracechain_store::StoreError;
use tracechain_types::{BatchId, BlockId, EventId};

/// Errors produced by ledger operations.
///
/// Integrity problems found by the verifier are never errors; they are
/// reported as [`Issue`](crate::Issue)s.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("event {0} has not been committed to a block")]
    EventNotCommitted(EventId),

    #[error("event {event} is not listed in block {block}")]
    EventNotInBlock { event: EventId, block: BlockId },

    #[error("a block must commit at least one event")]
    EmptyBlock,

    #[error("event {0} listed more than once")]
    DuplicateEvent(EventId),

    #[error("event {event} is already committed to block {block}")]
    EventAlreadyCommitted { event: EventId, block: BlockId },

    #[error("block append lost the index race {attempts} times")]
    AppendConflict { attempts: u32 },

    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// The referenced record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EventNotFound(_)
                | Self::BatchNotFound(_)
                | Self::BlockNotFound(_)
                | Self::Store(StoreError::EventNotFound(_))
        )
    }

    /// The caller supplied a request the ledger refuses.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyBlock
                | Self::DuplicateEvent(_)
                | Self::EventAlreadyCommitted { .. }
                | Self::EventNotCommitted(_)
        )
    }

    /// Concurrent writers raced for the chain tip.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::AppendConflict { .. } => true,
            Self::Store(e) => e.is_conflict() || matches!(e, StoreError::AlreadyCommitted { .. }),
            _ => false,
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
