//! Append-only block ledger for Tracechain.
//!
//! This crate is the heart of Tracechain. It provides:
//! - The block builder that commits pending events into hash-linked blocks
//! - The chain verifier that re-derives every stored hash and reports issues
//! - Batch history, audit trail, and public trace views
//! - Block listing and per-event Merkle inclusion proofs
//! - The [`Ledger`] facade tying these to a [`LedgerStore`](tracechain_store::LedgerStore)

pub mod builder;
pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod verifier;
pub mod views;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use history::{AuditEntry, TimelineEntry};
pub use ledger::{Ledger, RecordOutcome};
pub use verifier::{ChainVerifier, Issue, IssueKind, VerificationReport};
pub use views::{BlockPage, EventProof, Integrity, Pagination, TraceView, DEFAULT_PAGE_LIMIT};
