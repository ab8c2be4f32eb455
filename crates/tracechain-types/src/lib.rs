//! Foundation types for Tracechain.
//!
//! This crate provides the record shapes shared by every other Tracechain
//! crate: the immutable [`Event`] facts about a product batch, the hash-linked
//! [`Block`]s that commit them, and the identifiers and timestamps both carry.
//!
//! # Key Types
//!
//! - [`EventId`], [`BlockId`], [`ActorId`] -- UUID v7 identifiers
//! - [`BatchId`] -- logical batch identifier supplied by collaborators
//! - [`Timestamp`] -- millisecond-precision UTC instant with a canonical ISO form
//! - [`Clock`] -- time source used when assigning timestamps
//! - [`EventType`] / [`BatchStatus`] -- closed vocabularies for the supply chain
//! - [`Event`] / [`Block`] -- the ledger's stored records

pub mod actor;
pub mod block;
pub mod error;
pub mod event;
pub mod ids;
pub mod temporal;

pub use actor::{Actor, UNKNOWN_ACTOR_NAME};
pub use block::{Block, BlockRef, GENESIS_PREV_HASH};
pub use error::TypeError;
pub use event::{BatchStatus, Event, EventType, NewEvent, Payload};
pub use ids::{ActorId, BatchId, BlockId, EventId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
