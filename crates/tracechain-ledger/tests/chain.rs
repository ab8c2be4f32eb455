//! End-to-end behaviour of the block builder and chain verifier.

use std::sync::Arc;

use proptest::prelude::*;
use tracechain_crypto::{canonical_event, digest};
use tracechain_ledger::{IssueKind, Ledger, LedgerConfig};
use tracechain_store::{EventStore, InMemoryStore};
use tracechain_types::{
    ActorId, BatchId, Event, EventId, EventType, ManualClock, NewEvent, Payload, Timestamp,
    GENESIS_PREV_HASH,
};

const T0: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00.000Z

struct Fixture {
    ledger: Ledger<InMemoryStore>,
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(T0).unwrap()));
    let ledger = Ledger::new(Arc::clone(&store), LedgerConfig::default()).with_clock(clock.clone());
    Fixture {
        ledger,
        store,
        clock,
    }
}

fn pending(store: &InMemoryStore, batch: &str, event_type: EventType, millis: i64) -> Event {
    let event = Event::new(
        NewEvent {
            batch_id: BatchId::new(batch).unwrap(),
            event_type,
            payload: Payload::new(),
            actor_id: ActorId::new(),
        },
        Timestamp::from_millis(millis).unwrap(),
    );
    store.insert_event(&event).unwrap();
    event
}

#[test]
fn genesis_and_second_block_hashes() {
    let f = fixture();
    let e1 = pending(&f.store, "B1", EventType::BatchCreated, T0);
    let e2 = pending(&f.store, "B1", EventType::HarvestUpdated, T0 + 1);
    let e3 = pending(&f.store, "B1", EventType::CertUpload, T0 + 2);

    let b0 = f.ledger.append(&[e1.id]).unwrap();
    let root0 = digest(canonical_event(&e1).unwrap());
    assert_eq!(b0.index, 0);
    assert_eq!(b0.prev_hash, GENESIS_PREV_HASH);
    assert_eq!(b0.merkle_root, root0);
    assert_eq!(
        b0.hash,
        digest(format!("0{}GENESIS{root0}", b0.timestamp.to_iso()))
    );
    assert_eq!(b0.timestamp.to_iso(), "2024-01-01T00:00:00.000Z");

    f.clock.advance(1_000);
    let b1 = f.ledger.append(&[e2.id, e3.id]).unwrap();
    let root1 = digest(format!(
        "{}{}",
        digest(canonical_event(&e2).unwrap()),
        digest(canonical_event(&e3).unwrap())
    ));
    assert_eq!(b1.index, 1);
    assert_eq!(b1.prev_hash, b0.hash);
    assert_eq!(b1.merkle_root, root1);
    assert_eq!(
        b1.hash,
        digest(format!("1{}{}{root1}", b1.timestamp.to_iso(), b0.hash))
    );

    assert!(f.ledger.verify().unwrap().ok);
}

#[test]
fn canonical_leaf_matches_wire_format() {
    let f = fixture();
    let e = pending(&f.store, "B1", EventType::BatchCreated, T0);
    assert_eq!(
        canonical_event(&e).unwrap(),
        r#"{"type":"BATCH_CREATED","batchId":"B1","timestamp":"2024-01-01T00:00:00.000Z"}"#
    );
}

fn three_block_chain(f: &Fixture) -> Vec<EventId> {
    (0..3)
        .map(|i| {
            let e = pending(&f.store, "B1", EventType::Transfer, T0 + i);
            f.ledger.append(&[e.id]).unwrap();
            f.clock.advance(10);
            e.id
        })
        .collect()
}

fn issue_kinds_at(f: &Fixture, position: u64) -> Vec<IssueKind> {
    let report = f.ledger.verify().unwrap();
    assert!(!report.ok);
    report
        .issues
        .iter()
        .filter(|i| i.position == position)
        .map(|i| i.kind)
        .collect()
}

#[test]
fn tampered_block_hash_is_detected() {
    let f = fixture();
    three_block_chain(&f);
    f.store.rewrite_block(1, |b| b.hash = digest("forged")).unwrap();
    let kinds = issue_kinds_at(&f, 1);
    assert!(kinds.contains(&IssueKind::HashMismatch));
    // The successor's link now points at a hash that no longer exists.
    assert!(issue_kinds_at(&f, 2).contains(&IssueKind::PrevHashMismatch));
}

#[test]
fn tampered_prev_hash_is_detected() {
    let f = fixture();
    three_block_chain(&f);
    f.store.rewrite_block(2, |b| b.prev_hash = digest("x")).unwrap();
    let kinds = issue_kinds_at(&f, 2);
    assert!(kinds.contains(&IssueKind::PrevHashMismatch));
    assert!(kinds.contains(&IssueKind::HashMismatch));
}

#[test]
fn tampered_merkle_root_is_detected() {
    let f = fixture();
    three_block_chain(&f);
    f.store.rewrite_block(0, |b| b.merkle_root = digest("x")).unwrap();
    let kinds = issue_kinds_at(&f, 0);
    assert!(kinds.contains(&IssueKind::MerkleRootMismatch));
}

#[test]
fn tampered_index_is_detected() {
    let f = fixture();
    three_block_chain(&f);
    f.store.rewrite_block(2, |b| b.index = 7).unwrap();
    let kinds = issue_kinds_at(&f, 2);
    assert!(kinds.contains(&IssueKind::IndexMismatch));
}

#[test]
fn tampered_event_fields_are_detected() {
    let edits: [fn(&mut Event); 3] = [
        |e| e.event_type = EventType::Sell,
        |e| e.batch_id = BatchId::new("B-forged").unwrap(),
        |e| e.timestamp = Timestamp::from_millis(0).unwrap(),
    ];
    for edit in edits {
        let f = fixture();
        let ids = three_block_chain(&f);
        f.store.rewrite_event(&ids[1], edit).unwrap();
        let kinds = issue_kinds_at(&f, 1);
        assert_eq!(kinds, vec![IssueKind::MerkleRootMismatch]);
    }
}

#[test]
fn payload_edits_are_not_committed() {
    let f = fixture();
    let ids = three_block_chain(&f);
    f.store
        .rewrite_event(&ids[0], |e| {
            e.payload.insert("note".into(), "edited".into());
        })
        .unwrap();
    assert!(f.ledger.verify().unwrap().ok);
}

#[test]
fn every_issue_names_its_block() {
    let f = fixture();
    three_block_chain(&f);
    f.store.rewrite_block(0, |b| b.hash = digest("a")).unwrap();
    f.store.rewrite_block(2, |b| b.merkle_root = digest("b")).unwrap();

    let report = f.ledger.verify().unwrap();
    for issue in &report.issues {
        assert!(issue
            .message
            .starts_with(&format!("Block {}: ", issue.position)));
    }
    let positions: Vec<u64> = report.issues.iter().map(|i| i.position).collect();
    assert!(positions.contains(&0));
    assert!(positions.contains(&1));
    assert!(positions.contains(&2));
}

#[test]
fn history_is_time_ordered_regardless_of_insertion() {
    let f = fixture();
    let farm = f.ledger.register_actor("Green Farm").unwrap();
    let mk = |event_type, millis| {
        let event = Event::new(
            NewEvent {
                batch_id: BatchId::new("B7").unwrap(),
                event_type,
                payload: Payload::new(),
                actor_id: farm.id,
            },
            Timestamp::from_millis(millis).unwrap(),
        );
        f.store.insert_event(&event).unwrap();
        event
    };
    let third = mk(EventType::Receive, T0 + 3);
    let first = mk(EventType::BatchCreated, T0 + 1);
    let second = mk(EventType::Transfer, T0 + 2);
    f.ledger.append(&[third.id, first.id, second.id]).unwrap();

    let timeline = f.ledger.history(&BatchId::new("B7").unwrap()).unwrap();
    let at: Vec<i64> = timeline.iter().map(|t| t.occurred_at.as_millis()).collect();
    assert_eq!(at, vec![T0 + 1, T0 + 2, T0 + 3]);
    assert!(timeline.iter().all(|t| t.actor_name == "Green Farm"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn appended_chains_always_verify(sizes in proptest::collection::vec(1usize..4, 1..8)) {
        let f = fixture();
        for (n, size) in sizes.iter().enumerate() {
            let ids: Vec<EventId> = (0..*size)
                .map(|i| pending(&f.store, "B1", EventType::Store, T0 + (n * 10 + i) as i64).id)
                .collect();
            let block = f.ledger.append(&ids).unwrap();
            prop_assert_eq!(block.index, n as u64);
            prop_assert!(f.ledger.verify().unwrap().ok);
        }
    }
}
