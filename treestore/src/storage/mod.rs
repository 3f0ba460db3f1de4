// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage engines for store transactions
//!
//! This module provides:
//! - The session engine traits the transaction layer runs against
//! - A local engine with in-memory trees grouped into volumes
//! - Optional redb journaling of committed trees
//! - The store manager that opens engines and begins transactions

pub mod engine;
pub mod persistent;
pub mod store_manager;

pub use engine::{
    EngineStats, EngineTransaction, LocalCursor, LocalEngine, LocalTransaction, SessionEngine,
    SessionId,
};
pub use persistent::types::{EngineError, EngineResult, StorageType};
pub use persistent::CommitJournal;
#[cfg(feature = "redb-backend")]
pub use persistent::redb::RedbJournal;
pub use store_manager::StoreManager;
