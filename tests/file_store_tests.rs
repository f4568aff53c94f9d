// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directory-backed queue store, including restart behaviour.

mod common;

use common::{network_error, sample_report, MockSubmitter};
use eravat_sync::models::QueuedReport;
use eravat_sync::services::{
    FlushOutcome, NetworkMonitor, RetryPolicy, SyncEngine, SyncTrigger,
};
use eravat_sync::store::{FileStore, QueueError, QueueStore};

#[tokio::test]
async fn test_set_get_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), None).await.unwrap();
    let record = QueuedReport::new(1, sample_report("A"));

    store.set(&record).await.unwrap();
    assert_eq!(store.get(record.id).await.unwrap(), Some(record.clone()));

    assert!(store.remove(record.id).await.unwrap());
    assert!(!store.remove(record.id).await.unwrap());
    assert_eq!(store.get(record.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let submitter = MockSubmitter::new();
    submitter.fail("A", network_error());

    let (a, b) = {
        let store = FileStore::open(dir.path(), None).await.unwrap();
        let engine = SyncEngine::open(
            store,
            submitter.clone(),
            NetworkMonitor::new(true, None),
            RetryPolicy::default(),
        )
        .await
        .unwrap();
        let a = engine.enqueue(sample_report("A")).await.unwrap();
        let b = engine.enqueue(sample_report("B")).await.unwrap();
        engine.attempt_flush(SyncTrigger::Manual).await.unwrap();
        (a, b)
    };

    // Reopen: records, retry state, and ordering are intact
    let store = FileStore::open(dir.path(), None).await.unwrap();
    let engine = SyncEngine::open(
        store,
        submitter.clone(),
        NetworkMonitor::new(true, None),
        RetryPolicy::default(),
    )
    .await
    .unwrap();

    let pending = engine.list_pending().await.unwrap();
    assert_eq!(
        pending.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![a, b]
    );
    assert_eq!(pending[0].retry_count, 1);

    // New records sort after the ones already on disk
    let c = engine.enqueue(sample_report("C")).await.unwrap();
    let pending = engine.list_pending().await.unwrap();
    assert_eq!(pending.last().map(|r| r.id), Some(c));
    assert!(pending[2].sequence > pending[1].sequence);

    submitter.recover("A");
    match engine.attempt_flush(SyncTrigger::Reconnected).await.unwrap() {
        FlushOutcome::Completed(report) => assert_eq!(report.synced, vec![a, b, c]),
        other => panic!("Expected completed flush, got {:?}", other),
    }
    assert!(engine.list_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_record_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), None).await.unwrap();
    store
        .set(&QueuedReport::new(1, sample_report("A")))
        .await
        .unwrap();

    let id = uuid::Uuid::new_v4();
    tokio::fs::write(dir.path().join(format!("{}.json", id)), b"{not json")
        .await
        .unwrap();

    assert!(matches!(
        store.iterate().await,
        Err(QueueError::Corrupt { .. })
    ));
    assert!(matches!(
        store.get(id).await,
        Err(QueueError::Corrupt { .. })
    ));
}

#[tokio::test]
async fn test_stray_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), None).await.unwrap();
    let record = QueuedReport::new(1, sample_report("A"));
    store.set(&record).await.unwrap();

    // Leftover from an interrupted write
    tokio::fs::write(dir.path().join("leftover.json.tmp"), b"{")
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("README"), b"queue")
        .await
        .unwrap();

    let records = store.iterate().await.unwrap();
    assert_eq!(records, vec![record]);
}

#[tokio::test]
async fn test_capacity_limit() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), Some(2)).await.unwrap();

    let mut first = QueuedReport::new(1, sample_report("A"));
    store.set(&first).await.unwrap();
    store
        .set(&QueuedReport::new(2, sample_report("B")))
        .await
        .unwrap();

    assert!(matches!(
        store.set(&QueuedReport::new(3, sample_report("C"))).await,
        Err(QueueError::StorageFull)
    ));

    // Updating an existing record still works when full
    first.retry_count = 1;
    store.set(&first).await.unwrap();
    assert_eq!(store.get(first.id).await.unwrap().unwrap().retry_count, 1);
}

#[tokio::test]
async fn test_open_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("agent").join("queue");
    let store = FileStore::open(&nested, None).await.unwrap();
    assert!(nested.is_dir());
    assert_eq!(store.dir(), nested.as_path());
    assert!(store.iterate().await.unwrap().is_empty());
}
