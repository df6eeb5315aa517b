//! Integration tests for the registry.

use scent_registry::{
    BlobStore, Classification, Format, FsBlobStore, ManualClock, MemoryBlobStore, Owner,
    RecordDraft, RecordStats, SharedIdentity, SyncConfig, SyncEngine, SyncError, Timestamp,
};
use std::sync::Arc;
use tempfile::TempDir;

const START: u64 = 1_700_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn client(store: Arc<dyn BlobStore>, owner: &str, clock: Arc<ManualClock>) -> SyncEngine {
    SyncEngine::builder(store)
        .owner(Owner::new(owner))
        .clock(clock)
        .build()
        .unwrap()
}

fn draft(emotion: &str, intensity: u8, bio: &str) -> RecordDraft {
    RecordDraft::new(bio.as_bytes().to_vec(), Classification::new(emotion, intensity).unwrap())
}

// --- Reload Ordering ---

#[test]
fn test_empty_store_reloads_empty() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let engine = client(store, "0xabc", Arc::new(ManualClock::at_secs(START)));

    assert!(engine.reload().unwrap().is_empty());
}

#[test]
fn test_newer_record_comes_first() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::at_secs(START));
    let engine = client(store, "0xabc", clock.clone());

    let calm = engine.submit(draft("calm", 5, "hr=60")).unwrap().into_result().unwrap();
    clock.advance_secs(10);
    let happy = engine.submit(draft("happy", 8, "hr=90")).unwrap().into_result().unwrap();

    let records = engine.reload().unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].id, happy);
    assert_eq!(records[0].classification.emotion, "happy");
    assert_eq!(records[0].classification.intensity.get(), 8);
    assert_eq!(records[0].timestamp, Timestamp(START + 10));

    assert_eq!(records[1].id, calm);
    assert_eq!(records[1].classification.emotion, "calm");
    assert_eq!(records[1].timestamp, Timestamp(START));
}

#[test]
fn test_reload_returns_exactly_submitted_records() {
    init_tracing();
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let engine = client(Arc::clone(&store), "0xabc", Arc::new(ManualClock::at_secs(START)));

    // Timestamps deliberately not monotonic in submission order.
    let offsets = [30u64, 10, 50, 20, 40];
    let mut submitted = Vec::new();
    for (i, offset) in offsets.iter().enumerate() {
        let producer = client(
            Arc::clone(&store),
            "0xabc",
            Arc::new(ManualClock::at_secs(START + offset)),
        );
        let id = producer
            .submit(draft("relaxed", (i + 1) as u8, "breath=12"))
            .unwrap()
            .into_result()
            .unwrap();
        submitted.push((START + offset, id));
    }

    submitted.sort_by(|a, b| b.0.cmp(&a.0));
    let expected: Vec<_> = submitted.into_iter().map(|(_, id)| id).collect();
    let got: Vec<_> = engine.reload().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(got, expected);
}

#[test]
fn test_equal_timestamps_keep_submission_order() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let engine = client(store, "0xabc", Arc::new(ManualClock::at_secs(START)));

    let mut ids = Vec::new();
    for emotion in ["sad", "anxious", "excited", "calm"] {
        ids.push(engine.submit(draft(emotion, 3, "x")).unwrap().into_result().unwrap());
    }

    let got: Vec<_> = engine.reload().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(got, ids);
}

// --- Multiple Clients ---

#[test]
fn test_clients_see_each_others_records() {
    init_tracing();
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::at_secs(START));
    let alice = client(Arc::clone(&store), "0xA11CE", clock.clone());
    let bob = client(Arc::clone(&store), "0xb0b", clock.clone());

    alice.submit(draft("happy", 7, "a")).unwrap().into_result().unwrap();
    clock.advance_secs(1);
    bob.submit(draft("sad", 2, "b")).unwrap().into_result().unwrap();

    let seen_by_alice = alice.reload().unwrap();
    let seen_by_bob = bob.reload().unwrap();
    assert_eq!(seen_by_alice, seen_by_bob);
    assert_eq!(seen_by_alice.len(), 2);

    let mine: Vec<_> = seen_by_alice.iter().filter(|r| alice.is_mine(r)).collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].owner, Owner::new("0xA11CE"));
}

#[test]
fn test_identity_can_change_between_submits() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let identity = Arc::new(SharedIdentity::new());
    let engine = SyncEngine::builder(store)
        .identity(identity.clone())
        .clock(Arc::new(ManualClock::at_secs(START)))
        .build()
        .unwrap();

    assert!(matches!(
        engine.submit(draft("calm", 5, "x")),
        Err(SyncError::NoIdentity)
    ));

    identity.connect(Owner::new("0xfirst"));
    let first = engine.submit(draft("calm", 5, "x")).unwrap().into_result().unwrap();
    identity.connect(Owner::new("0xsecond"));
    let second = engine.submit(draft("calm", 5, "y")).unwrap().into_result().unwrap();

    assert_eq!(engine.lookup(&first).unwrap().owner, Owner::new("0xfirst"));
    assert_eq!(engine.lookup(&second).unwrap().owner, Owner::new("0xsecond"));

    let second_record = engine.lookup(&second).unwrap();
    assert!(engine.is_mine(&second_record));
    identity.disconnect();
    assert!(!engine.is_mine(&second_record));
}

// --- Storage Backends ---

#[test]
fn test_filesystem_store_survives_reopen() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::at_secs(START));

    let id = {
        let store = Arc::new(FsBlobStore::new(dir.path().join("registry")).unwrap());
        let engine = client(store, "0xabc", clock.clone());
        engine.submit(draft("excited", 9, "gsr=4.2")).unwrap().into_result().unwrap()
    };

    let store = Arc::new(FsBlobStore::new(dir.path().join("registry")).unwrap());
    let engine = client(store, "0xabc", clock);
    let records = engine.reload().unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].classification.intensity.get(), 9);
}

#[test]
fn test_messagepack_format_end_to_end() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let engine = SyncEngine::builder(store.clone())
        .config(SyncConfig::default().with_format(Format::MessagePack))
        .owner(Owner::new("0xabc"))
        .build()
        .unwrap();

    let id = engine.submit(draft("calm", 5, "x")).unwrap().into_result().unwrap();
    assert_eq!(engine.reload().unwrap()[0].id, id);

    // Index is not JSON text.
    let raw_index = store.get("scent_keys").unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&raw_index).is_err());
}

#[test]
fn test_namespaces_are_isolated() {
    init_tracing();
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let scent = client(Arc::clone(&store), "0xabc", Arc::new(ManualClock::at_secs(START)));
    let other = SyncEngine::builder(Arc::clone(&store))
        .config(SyncConfig::default().with_namespace("mood"))
        .owner(Owner::new("0xabc"))
        .build()
        .unwrap();

    scent.submit(draft("calm", 5, "x")).unwrap().into_result().unwrap();

    assert_eq!(scent.reload().unwrap().len(), 1);
    assert!(other.reload().unwrap().is_empty());
}

// --- Statistics ---

#[test]
fn test_stats_over_reloaded_records() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let engine = client(store, "0xabc", Arc::new(ManualClock::at_secs(START)));

    for (emotion, intensity) in [("calm", 4), ("calm", 6), ("happy", 8)] {
        engine.submit(draft(emotion, intensity, "x")).unwrap().into_result().unwrap();
    }

    let stats = RecordStats::from_records(&engine.reload().unwrap());
    assert_eq!(stats.total, 3);
    assert_eq!(stats.average_intensity, Some(6.0));
    assert_eq!(stats.emotion_counts["calm"], 2);
    assert_eq!(stats.emotion_counts["happy"], 1);
}
