//! Storage backends for Tracechain.
//!
//! The ledger core consumes three narrow abstractions:
//!
//! - [`EventStore`] -- events keyed by id, queryable by batch and by id set
//! - [`BlockStore`] -- blocks queryable by chain tip and enumerable by index
//! - [`ActorDirectory`] -- display names for the parties that cause events
//!
//! [`LedgerStore`] is the blanket combination of all three.
//!
//! # Storage Backends
//!
//! - [`InMemoryStore`] -- `RwLock`-guarded maps for tests and embedding
//! - [`JournalStore`] -- append-only JSON-lines journal, replayed on open
//!
//! # Design Rules
//!
//! 1. Events and blocks are immutable once written. The single permitted
//!    mutation is annotating an uncommitted event with its block id, and it
//!    happens together with the insert of that block.
//! 2. `commit_block` is a conditional insert: a second block with an
//!    existing `index` is refused with [`StoreError::IndexConflict`], and a
//!    block listing an already committed event with
//!    [`StoreError::AlreadyCommitted`]. This is the authoritative arbiter
//!    between concurrent appenders.
//! 3. Reads never interpret payloads.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod journal;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use journal::{JournalOptions, JournalStore, JOURNAL_FILE_NAME};
pub use memory::InMemoryStore;
pub use traits::{ActorDirectory, BlockStore, EventStore, LedgerStore};
