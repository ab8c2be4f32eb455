//! The ledger over the durable journal store.

use std::fs;
use std::sync::Arc;

use tracechain_crypto::digest;
use tracechain_ledger::{IssueKind, Ledger, LedgerConfig};
use tracechain_store::{JournalOptions, JournalStore};
use tracechain_types::{ActorId, BatchId, EventType, NewEvent, Payload};

fn open(dir: &std::path::Path) -> Ledger<JournalStore> {
    let store = JournalStore::open_dir(dir, JournalOptions::default()).unwrap();
    Ledger::new(Arc::new(store), LedgerConfig::default())
}

fn new_event(event_type: EventType) -> NewEvent {
    NewEvent {
        batch_id: BatchId::new("B1").unwrap(),
        event_type,
        payload: Payload::new(),
        actor_id: ActorId::new(),
    }
}

#[test]
fn reopened_chain_verifies_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let first_hash = {
        let ledger = open(dir.path());
        let outcome = ledger.record(vec![new_event(EventType::BatchCreated)]).unwrap();
        ledger.record(vec![new_event(EventType::Transfer)]).unwrap();
        outcome.block.hash
    };

    let ledger = open(dir.path());
    assert_eq!(ledger.block_count().unwrap(), 2);
    assert!(ledger.verify().unwrap().ok);

    let block = ledger.record(vec![new_event(EventType::Receive)]).unwrap().block;
    assert_eq!(block.index, 2);

    let page = ledger.blocks_page(1, 10).unwrap();
    assert_eq!(page.blocks.last().unwrap().hash, first_hash);
    assert_eq!(ledger.history(&BatchId::new("B1").unwrap()).unwrap().len(), 3);
}

#[test]
fn hand_edited_journal_is_caught_by_verify() {
    let dir = tempfile::tempdir().unwrap();
    let path = {
        let ledger = open(dir.path());
        ledger.record(vec![new_event(EventType::BatchCreated)]).unwrap();
        ledger.store().path().to_path_buf()
    };

    let forged = digest("forged");
    let contents = fs::read_to_string(&path).unwrap();
    let edited: Vec<String> = contents
        .lines()
        .map(|line| {
            let mut value: serde_json::Value = serde_json::from_str(line).unwrap();
            if value["record"] == "block" {
                value["merkleRoot"] = serde_json::Value::String(forged.clone());
            }
            value.to_string()
        })
        .collect();
    fs::write(&path, edited.join("\n") + "\n").unwrap();

    let report = open(dir.path()).verify().unwrap();
    assert!(!report.ok);
    assert!(report
        .issues
        .iter()
        .any(|i| i.position == 0 && i.kind == IssueKind::MerkleRootMismatch));
}
