use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use todo_core::ack::endpoint::{CREATED_MESSAGE, DELETED_MESSAGE, UPDATED_MESSAGE};
use todo_core::{
    AckClient, AckError, AckMethod, AckPayload, AckRequest, AckResponse, AckResult, Change,
    ItemCollectionEngine, ItemId, ItemValidationError, LocalAckClient, ManualClock, MemoryStore,
    PersistentStore, Receipt,
};

/// Records every request and answers with the local endpoint contract.
#[derive(Default)]
struct RecordingAck {
    requests: Mutex<Vec<AckRequest>>,
}

impl RecordingAck {
    fn requests(&self) -> Vec<AckRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl AckClient for RecordingAck {
    fn acknowledge(&self, request: &AckRequest) -> AckResult<AckResponse> {
        self.requests.lock().unwrap().push(request.clone());
        LocalAckClient.acknowledge(request)
    }
}

struct FailingAck;

impl AckClient for FailingAck {
    fn acknowledge(&self, _request: &AckRequest) -> AckResult<AckResponse> {
        Err(AckError::Transport("connection refused".to_string()))
    }
}

struct Harness {
    engine: ItemCollectionEngine<MemoryStore>,
    store: MemoryStore,
    ack: Arc<RecordingAck>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = MemoryStore::new();
    let ack = Arc::new(RecordingAck::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
    ));
    let engine = ItemCollectionEngine::open(store.clone(), ack.clone(), clock.clone());
    Harness {
        engine,
        store,
        ack,
        clock,
    }
}

/// Waits for the acknowledgement and returns its message.
fn settle(receipt: Receipt) -> String {
    receipt
        .into_ack()
        .expect("operation should dispatch an acknowledgement")
        .wait()
        .expect("acknowledgement should succeed")
        .message
}

fn created_id(receipt: &Receipt) -> ItemId {
    receipt.item_id().expect("create should dispatch").clone()
}

#[test]
fn creates_are_newest_first_with_unique_ids() {
    let mut h = harness();
    for title in ["A", "B", "C", "D"] {
        settle(h.engine.create(title, ""));
    }

    let titles: Vec<_> = h.engine.items().iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["D", "C", "B", "A"]);
    let ids: HashSet<_> = h.engine.items().iter().map(|item| item.id.clone()).collect();
    assert_eq!(ids.len(), 4);
    assert!(h.engine.items().iter().all(|item| !item.completed));
}

#[test]
fn two_creates_yield_b_then_a() {
    let mut h = harness();
    settle(h.engine.create("A", ""));
    settle(h.engine.create("B", ""));

    let titles: Vec<_> = h.engine.items().iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["B", "A"]);
}

#[test]
fn blank_title_create_is_rejected_without_acknowledgement() {
    let mut h = harness();
    for title in ["", "   ", "\t\n"] {
        let receipt = h.engine.create(title, "content");
        assert!(matches!(
            receipt,
            Receipt::Rejected(ItemValidationError::EmptyTitle)
        ));
    }

    assert!(h.engine.items().is_empty());
    assert!(h.ack.requests().is_empty());
    assert_eq!(h.store.save_count(), 0);
}

#[test]
fn toggle_flips_completed_and_keeps_updated_at() {
    let mut h = harness();
    let id = created_id(&h.engine.create("Buy milk", "2%"));
    let original = h.engine.get(&id).unwrap().clone();

    h.clock.advance_millis(5_000);
    let receipt = h.engine.toggle(&id);
    assert_eq!(receipt.change(), Some(Change::Changed));
    let toggled = h.engine.get(&id).unwrap().clone();
    assert!(toggled.completed);
    assert_eq!(toggled.updated_at, original.updated_at);

    h.engine.toggle(&id);
    assert_eq!(h.engine.get(&id).unwrap(), &original);
}

#[test]
fn update_replaces_fields_and_advances_updated_at() {
    let mut h = harness();
    let id = created_id(&h.engine.create("Buy milk", "2%"));
    let before = h.engine.get(&id).unwrap().clone();

    h.clock.advance_millis(1_000);
    let receipt = h.engine.update(&id, "Buy oat milk", "barista");
    assert_eq!(receipt.change(), Some(Change::Changed));

    let after = h.engine.get(&id).unwrap();
    assert_eq!(after.title, "Buy oat milk");
    assert_eq!(after.content, "barista");
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.id, before.id);
}

#[test]
fn blank_title_update_leaves_item_unchanged() {
    let mut h = harness();
    let receipt = h.engine.create("Buy milk", "2%");
    let id = created_id(&receipt);
    settle(receipt);
    let before = h.engine.get(&id).unwrap().clone();
    let requests_before = h.ack.requests().len();

    let receipt = h.engine.update(&id, "  ", "new content");
    assert!(receipt.is_rejected());
    assert_eq!(h.engine.get(&id).unwrap(), &before);
    settle(h.engine.toggle(&ItemId::parse("unknown").unwrap()));
    assert_eq!(h.ack.requests().len(), requests_before + 1);
}

#[test]
fn delete_removes_only_target() {
    let mut h = harness();
    let a = created_id(&h.engine.create("A", ""));
    let b = created_id(&h.engine.create("B", ""));
    let c = created_id(&h.engine.create("C", ""));

    h.engine.delete(&b);
    let ids: Vec<_> = h.engine.items().iter().map(|item| item.id.clone()).collect();
    assert_eq!(ids, vec![c, a]);
}

#[test]
fn unmatched_ids_are_noops_but_still_acknowledged() {
    let mut h = harness();
    settle(h.engine.create("A", ""));
    let snapshot = h.engine.collection().clone();
    let saves = h.store.save_count();
    let missing = ItemId::parse("does-not-exist").unwrap();

    for receipt in [
        h.engine.toggle(&missing),
        h.engine.update(&missing, "title", "content"),
        h.engine.delete(&missing),
    ] {
        assert_eq!(receipt.change(), Some(Change::Unchanged));
        assert!(matches!(
            receipt,
            Receipt::Dispatched {
                persisted: false,
                ..
            }
        ));
        settle(receipt);
    }

    assert_eq!(h.engine.collection(), &snapshot);
    assert_eq!(h.store.save_count(), saves);

    let mut methods: Vec<_> = h
        .ack
        .requests()
        .into_iter()
        .map(|request| request.method.as_str().to_string())
        .collect();
    methods.sort();
    assert_eq!(methods, vec!["DELETE", "POST", "PUT", "PUT"]);
}

#[test]
fn stored_item_with_blank_id_stays_addressable() {
    let raw = r#"[
        {"id":"","title":"legacy","content":"","completed":false,
         "createdAt":"2023-01-01T00:00:00.000Z","updatedAt":"2023-01-01T00:00:00.000Z"},
        {"id":"7","title":"kept","content":"","completed":false,
         "createdAt":"2023-01-01T00:00:00.000Z","updatedAt":"2023-01-01T00:00:00.000Z"}
    ]"#;
    let store = MemoryStore::with_raw(raw);
    let ack = Arc::new(RecordingAck::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
    ));
    let mut engine = ItemCollectionEngine::open(store.clone(), ack.clone(), clock);
    let blank = ItemId::lookup("");

    let toggled = engine.toggle(&blank);
    assert_eq!(toggled.change(), Some(Change::Changed));
    settle(toggled);
    assert!(engine.get(&blank).unwrap().completed);

    let deleted = engine.delete(&blank);
    assert_eq!(deleted.change(), Some(Change::Changed));
    settle(deleted);

    let titles: Vec<_> = engine.items().iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["kept"]);
    assert_eq!(store.save_count(), 2);
    assert_eq!(ack.requests().len(), 2);
}

#[test]
fn every_committed_mutation_is_saved_once_and_matches_memory() {
    let mut h = harness();
    let id = created_id(&h.engine.create("A", "x"));
    assert_eq!(h.store.save_count(), 1);
    h.engine.toggle(&id);
    assert_eq!(h.store.save_count(), 2);
    h.engine.update(&id, "A2", "y");
    assert_eq!(h.store.save_count(), 3);

    let raw = h.store.raw().unwrap();
    let persisted: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let in_memory = serde_json::to_value(h.engine.collection()).unwrap();
    assert_eq!(persisted, in_memory);

    h.engine.delete(&id);
    assert_eq!(h.store.save_count(), 4);
    assert_eq!(h.store.raw().as_deref(), Some("[]"));
}

#[test]
fn acknowledgement_payloads_describe_intent() {
    let mut h = harness();
    let create = h.engine.create("Buy milk", "2%");
    let id = created_id(&create);
    let receipts = vec![
        create,
        h.engine.toggle(&id),
        h.engine.update(&id, "Buy oat milk", "2%"),
        h.engine.delete(&id),
        h.engine.toggle(&ItemId::parse("gone").unwrap()),
    ];
    for receipt in receipts {
        settle(receipt);
    }

    let mut requests = h.ack.requests();
    // Workers finish in any order; compare by content.
    requests.sort_by_key(|request| format!("{request:?}"));
    let mut expected = vec![
        AckRequest {
            method: AckMethod::Post,
            payload: Some(AckPayload::Create {
                title: "Buy milk".to_string(),
                content: "2%".to_string(),
            }),
        },
        AckRequest::toggled(true),
        AckRequest {
            method: AckMethod::Put,
            payload: Some(AckPayload::Update {
                title: "Buy oat milk".to_string(),
                content: "2%".to_string(),
            }),
        },
        AckRequest::deleted(),
        AckRequest::toggled(true),
    ];
    expected.sort_by_key(|request| format!("{request:?}"));
    assert_eq!(requests, expected);
}

#[test]
fn failed_acknowledgement_does_not_roll_back() {
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
    let mut engine = ItemCollectionEngine::open(store.clone(), Arc::new(FailingAck), clock);

    let receipt = engine.create("offline", "");
    let id = created_id(&receipt);
    let outcome = receipt.into_ack().unwrap().wait();
    assert!(matches!(outcome, Err(AckError::Transport(_))));

    assert!(engine.get(&id).is_some());
    let stored: Vec<_> = store.load().iter().map(|item| item.title.clone()).collect();
    assert_eq!(stored, vec!["offline".to_string()]);
}

#[test]
fn end_to_end_buy_milk_scenario() {
    let mut h = harness();

    let receipt = h.engine.create("Buy milk", "2%");
    let id = created_id(&receipt);
    assert_eq!(settle(receipt), CREATED_MESSAGE);
    let created = h.engine.get(&id).unwrap().clone();
    assert_eq!(h.engine.items().len(), 1);
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.content, "2%");
    assert!(!created.completed);

    h.clock.advance_millis(100);
    assert_eq!(settle(h.engine.toggle(&id)), UPDATED_MESSAGE);
    let toggled = h.engine.get(&id).unwrap().clone();
    assert!(toggled.completed);
    assert_eq!(toggled.updated_at, created.updated_at);

    h.clock.advance_millis(100);
    assert_eq!(settle(h.engine.update(&id, "Buy oat milk", "2%")), UPDATED_MESSAGE);
    let updated = h.engine.get(&id).unwrap().clone();
    assert_eq!(updated.title, "Buy oat milk");
    assert!(updated.updated_at > toggled.updated_at);

    assert_eq!(settle(h.engine.delete(&id)), DELETED_MESSAGE);
    assert!(h.engine.items().is_empty());
    assert_eq!(h.engine.remaining_count(), 0);
}
