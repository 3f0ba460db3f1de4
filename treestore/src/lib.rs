// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! TreeStore - session-bound transactions over an embedded tree store
//!
//! A [`TransactionHandle`] owns one engine session and the transaction bound
//! to it, caches cursors on named trees of one volume, and retries its commit
//! a bounded number of times when the engine reports a write conflict. The
//! handle can be driven from any thread; it binds its session to the calling
//! thread before each engine call.
//!
//! ```ignore
//! use treestore::{ConsistencyLevel, StoreConfig, StoreManager};
//!
//! let store = StoreManager::open(StoreConfig::default())?;
//! let tx = store.begin_transaction(ConsistencyLevel::Default)?;
//! tx.get_cursor("edgestore")?.put(b"key", b"value")?;
//! tx.commit()?;
//! ```

pub mod config;
pub mod error;
pub mod storage;
pub mod txn;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use storage::{
    EngineError, EngineStats, EngineTransaction, LocalCursor, LocalEngine, SessionEngine,
    SessionId, StorageType, StoreManager,
};
pub use txn::{ConsistencyLevel, StoreTransaction, TransactionHandle};
