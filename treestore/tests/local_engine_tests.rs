// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! End-to-end transaction scenarios on the local engine

use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use treestore::{
    ConsistencyLevel, EngineError, LocalEngine, SessionEngine, StoreConfig, StoreError,
    StoreManager, TransactionHandle,
};

const VOLUME: &str = "treestore";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn memory_store() -> StoreManager<LocalEngine> {
    StoreManager::open(StoreConfig::default()).expect("Failed to open store")
}

fn begin(store: &StoreManager<LocalEngine>) -> TransactionHandle<LocalEngine> {
    store
        .begin_transaction(ConsistencyLevel::Default)
        .expect("Failed to begin transaction")
}

#[test]
fn test_commit_makes_write_visible() {
    init_logging();
    let store = memory_store();

    let tx = begin(&store);
    let cursor = tx.get_cursor("edgestore").expect("Failed to get cursor");
    cursor.put(b"v1:e1", b"knows").expect("Failed to put");
    tx.commit().expect("Failed to commit");

    let engine = store.engine();
    assert_eq!(engine.stats().commit_attempts, 1);
    assert_eq!(engine.active_transactions(), 0);
    assert_eq!(
        engine
            .read_committed(VOLUME, "edgestore", b"v1:e1")
            .expect("Failed to read"),
        Some(b"knows".to_vec())
    );

    // A later transaction sees the write through its own cursor
    let reader = begin(&store);
    let cursor = reader.get_cursor("edgestore").expect("Failed to get cursor");
    assert_eq!(
        cursor.get(b"v1:e1").expect("Failed to get"),
        Some(b"knows".to_vec())
    );
    reader.abort().expect("Failed to abort");
}

#[test]
fn test_abort_leaves_tree_unchanged() {
    init_logging();
    let store = memory_store();

    let tx = begin(&store);
    let cursor = tx.get_cursor("edgestore").expect("Failed to get cursor");
    cursor.put(b"v1:e1", b"knows").expect("Failed to put");
    tx.abort().expect("Failed to abort");

    assert!(!tx.is_active());
    assert_eq!(store.engine().active_transactions(), 0);
    assert_eq!(
        store
            .engine()
            .read_committed(VOLUME, "edgestore", b"v1:e1")
            .expect("Failed to read"),
        None
    );

    // The cursor a caller kept is dead with the transaction
    assert!(matches!(
        cursor.get(b"v1:e1"),
        Err(EngineError::InactiveTransaction(_))
    ));
    assert!(matches!(
        tx.get_cursor("edgestore"),
        Err(StoreError::TransactionFinished)
    ));
}

#[test]
fn test_losing_writer_gets_transaction_conflict() {
    init_logging();
    let store = memory_store();

    let winner = begin(&store);
    let loser = begin(&store);

    winner
        .get_cursor("edgestore")
        .expect("Failed to get cursor")
        .put(b"k", b"winner")
        .expect("Failed to put");
    loser
        .get_cursor("edgestore")
        .expect("Failed to get cursor")
        .put(b"k", b"loser")
        .expect("Failed to put");

    winner.commit().expect("Winner should commit");
    let err = loser.commit().expect_err("Loser should conflict");

    assert!(matches!(err, StoreError::TransactionConflict { attempts: 4, .. }));
    assert!(err.is_retryable());

    let stats = store.engine().stats();
    assert_eq!(stats.commit_attempts, 5);
    assert_eq!(stats.conflicts, 4);
    assert_eq!(store.engine().active_transactions(), 0);
    assert_eq!(
        store
            .engine()
            .read_committed(VOLUME, "edgestore", b"k")
            .expect("Failed to read"),
        Some(b"winner".to_vec())
    );

    // Rerunning the logical transaction succeeds
    let retry = begin(&store);
    retry
        .get_cursor("edgestore")
        .expect("Failed to get cursor")
        .put(b"k", b"loser")
        .expect("Failed to put");
    retry.commit().expect("Retry should commit");
}

#[test]
fn test_handle_moves_between_threads() {
    init_logging();
    let store = memory_store();
    let engine = Arc::clone(store.engine());

    let tx = begin(&store);
    let session = tx.session_id();

    // Write on one worker, commit on another
    let tx = thread::spawn(move || {
        let cursor = tx.get_cursor("edgestore").expect("Failed to get cursor");
        cursor.put(b"a", b"1").expect("Failed to put");
        tx
    })
    .join()
    .expect("Writer panicked");

    let commit_engine = Arc::clone(&engine);
    thread::spawn(move || {
        tx.commit().expect("Failed to commit");
        assert_eq!(commit_engine.current_session(), Some(session));
    })
    .join()
    .expect("Committer panicked");

    assert_eq!(
        engine
            .read_committed(VOLUME, "edgestore", b"a")
            .expect("Failed to read"),
        Some(b"1".to_vec())
    );
}

#[test]
fn test_concurrent_use_of_one_handle_stays_on_its_session() {
    init_logging();
    let store = memory_store();
    let shared = Arc::new(begin(&store));
    let bystander = Arc::new(begin(&store));

    let mut workers = Vec::new();
    for i in 0..8 {
        let handle = if i % 2 == 0 {
            Arc::clone(&shared)
        } else {
            Arc::clone(&bystander)
        };
        workers.push(thread::spawn(move || {
            let tree = format!("tree{}", i % 3);
            let cursor = handle.get_cursor(&tree).expect("Failed to get cursor");
            handle.rebind();
            cursor
                .put(format!("key{}", i).as_bytes(), b"x")
                .expect("Failed to put");
            (handle.session_id(), cursor.session_id())
        }));
    }

    for worker in workers {
        let (handle_session, cursor_session) = worker.join().expect("Worker panicked");
        assert_eq!(handle_session, cursor_session);
    }

    shared.commit().expect("Failed to commit shared");
    bystander.commit().expect("Failed to commit bystander");

    let engine = store.engine();
    for i in 0..8 {
        let tree = format!("tree{}", i % 3);
        assert_eq!(
            engine
                .read_committed(VOLUME, &tree, format!("key{}", i).as_bytes())
                .expect("Failed to read"),
            Some(b"x".to_vec())
        );
    }
}

#[test]
fn test_redb_store_survives_reopen() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = StoreConfig::new().redb(temp_dir.path());

    {
        let store = StoreManager::open(config.clone()).expect("Failed to open store");

        let tx = begin(&store);
        let cursor = tx.get_cursor("edgestore").expect("Failed to get cursor");
        cursor.put(b"persistent_key", b"persistent_value").expect("Failed to put");
        tx.commit().expect("Failed to commit");

        // Aborted work never reaches the file
        let aborted = begin(&store);
        aborted
            .get_cursor("edgestore")
            .expect("Failed to get cursor")
            .put(b"aborted_key", b"lost")
            .expect("Failed to put");
        aborted
            .get_cursor("vertexindex")
            .expect("Failed to get cursor");
        aborted.abort().expect("Failed to abort");
    }

    let store = StoreManager::open(config).expect("Failed to reopen store");
    assert_eq!(
        store.engine().tree_names(VOLUME).expect("Failed to list trees"),
        vec!["edgestore".to_string(), "vertexindex".to_string()]
    );

    let tx = begin(&store);
    let cursor = tx
        .get_cursor_with("edgestore", false)
        .expect("Tree should exist after reopen");
    assert_eq!(
        cursor.get(b"persistent_key").expect("Failed to get"),
        Some(b"persistent_value".to_vec())
    );
    assert_eq!(cursor.get(b"aborted_key").expect("Failed to get"), None);
    tx.commit().expect("Failed to commit");
}

#[test]
fn test_redb_removal_is_persisted() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = StoreConfig::new().redb(temp_dir.path());

    {
        let store = StoreManager::open(config.clone()).expect("Failed to open store");

        let tx = begin(&store);
        let cursor = tx.get_cursor("edgestore").expect("Failed to get cursor");
        cursor.put(b"a", b"1").expect("Failed to put");
        cursor.put(b"b", b"2").expect("Failed to put");
        tx.commit().expect("Failed to commit");

        let tx = begin(&store);
        let cursor = tx.get_cursor("edgestore").expect("Failed to get cursor");
        assert!(cursor.remove(b"a").expect("Failed to remove"));
        tx.commit().expect("Failed to commit");
    }

    let engine = LocalEngine::open(temp_dir.path()).expect("Failed to reopen engine");
    assert_eq!(
        engine.read_committed(VOLUME, "edgestore", b"a").expect("Failed to read"),
        None
    );
    assert_eq!(
        engine.read_committed(VOLUME, "edgestore", b"b").expect("Failed to read"),
        Some(b"2".to_vec())
    );
}
