use std::fmt;

use serde::{Deserialize, Serialize};
use tracechain_crypto::{events_merkle_root, expected_prev_hash, recompute_block_hash};
use tracechain_store::{BlockStore, EventStore};
use tracechain_types::{Block, Event};
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// Outcome of a full chain verification.
///
/// Serialized as `{ok, issues, details, blocksChecked}`: `issues` holds the
/// message lines and `details` the typed [`Issue`] records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ReportWire", from = "ReportWire")]
pub struct VerificationReport {
    /// `true` iff `issues` is empty.
    pub ok: bool,
    pub issues: Vec<Issue>,
    pub blocks_checked: u64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportWire {
    ok: bool,
    issues: Vec<String>,
    #[serde(default)]
    details: Vec<Issue>,
    blocks_checked: u64,
}

impl From<VerificationReport> for ReportWire {
    fn from(report: VerificationReport) -> Self {
        Self {
            ok: report.ok,
            issues: report.messages(),
            details: report.issues,
            blocks_checked: report.blocks_checked,
        }
    }
}

impl From<ReportWire> for VerificationReport {
    fn from(wire: ReportWire) -> Self {
        Self {
            ok: wire.ok,
            issues: wire.details,
            blocks_checked: wire.blocks_checked,
        }
    }
}

impl VerificationReport {
    fn from_issues(issues: Vec<Issue>, blocks_checked: u64) -> Self {
        Self {
            ok: issues.is_empty(),
            issues,
            blocks_checked,
        }
    }

    /// Human-readable issue lines, one per issue.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// A single integrity violation found at one chain position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Zero-based position of the block in ascending index order.
    pub position: u64,
    pub kind: IssueKind,
    pub expected: String,
    pub actual: String,
    /// `Block <i>: <problem>. Expected <x>, got <y>`
    pub message: String,
}

impl Issue {
    pub fn new(position: u64, kind: IssueKind, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        let message = format!(
            "Block {position}: {}. Expected {expected}, got {actual}",
            kind.problem()
        );
        Self {
            position,
            kind,
            expected,
            actual,
            message,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Stored `index` differs from the block's position.
    IndexMismatch,
    /// `prev_hash` does not match the predecessor (or the genesis sentinel).
    PrevHashMismatch,
    /// Stored `hash` differs from the recomputed header digest.
    HashMismatch,
    /// Stored `merkle_root` differs from the root over the reloaded events.
    MerkleRootMismatch,
}

impl IssueKind {
    pub fn problem(&self) -> &'static str {
        match self {
            Self::IndexMismatch => "Invalid index",
            Self::PrevHashMismatch => "Invalid prevHash",
            Self::HashMismatch => "Invalid hash",
            Self::MerkleRootMismatch => "Invalid merkle root",
        }
    }
}

/// Chain integrity verifier.
///
/// Re-derives every block's linkage, header hash, and Merkle root from
/// stored data. Detection only: nothing is repaired, and every issue is
/// collected rather than stopping at the first.
pub struct ChainVerifier;

impl ChainVerifier {
    /// Verify the whole chain as currently stored.
    ///
    /// An empty chain is valid. A block that references a missing event is
    /// a [`LedgerError::EventNotFound`], not an issue.
    pub fn verify<S: EventStore + BlockStore + ?Sized>(store: &S) -> LedgerResult<VerificationReport> {
        let blocks = store.blocks()?;
        let mut issues = Vec::new();

        for (position, block) in blocks.iter().enumerate() {
            let previous = position.checked_sub(1).map(|p| &blocks[p]);
            let events = load_committed(store, block)?;
            issues.extend(Self::check_block(position as u64, block, previous, &events)?);
        }

        let report = VerificationReport::from_issues(issues, blocks.len() as u64);
        if report.ok {
            debug!(blocks = report.blocks_checked, "chain verified");
        } else {
            warn!(
                blocks = report.blocks_checked,
                issues = report.issues.len(),
                "chain verification found issues"
            );
        }
        Ok(report)
    }

    /// Check one block against its predecessor and its reloaded events.
    pub fn check_block(
        position: u64,
        block: &Block,
        previous: Option<&Block>,
        events: &[Event],
    ) -> LedgerResult<Vec<Issue>> {
        let mut issues = Vec::new();

        if block.index != position {
            issues.push(Issue::new(
                position,
                IssueKind::IndexMismatch,
                position.to_string(),
                block.index.to_string(),
            ));
        }

        let expected_prev = expected_prev_hash(previous);
        if block.prev_hash != expected_prev {
            issues.push(Issue::new(
                position,
                IssueKind::PrevHashMismatch,
                expected_prev,
                block.prev_hash.as_str(),
            ));
        }

        let expected_hash = recompute_block_hash(block);
        if block.hash != expected_hash {
            issues.push(Issue::new(
                position,
                IssueKind::HashMismatch,
                expected_hash,
                block.hash.as_str(),
            ));
        }

        let expected_root = events_merkle_root(events)?;
        if block.merkle_root != expected_root {
            issues.push(Issue::new(
                position,
                IssueKind::MerkleRootMismatch,
                expected_root,
                block.merkle_root.as_str(),
            ));
        }

        Ok(issues)
    }
}

/// Reload a block's events in the order the block lists them.
fn load_committed<S: EventStore + ?Sized>(store: &S, block: &Block) -> LedgerResult<Vec<Event>> {
    block
        .event_ids
        .iter()
        .zip(store.get_events(&block.event_ids)?)
        .map(|(id, event)| event.ok_or(LedgerError::EventNotFound(*id)))
        .collect()
}
