// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Durable storage behind the local engine
//!
//! A journal receives every tree creation and every successful commit of a
//! [`crate::LocalEngine`]; on open the engine reloads its trees from it.

pub mod types;
#[cfg(feature = "redb-backend")]
pub mod redb;

use std::collections::BTreeMap;
use types::EngineResult;

/// Buffered writes of one transaction against one tree.
/// `None` values are removals.
pub struct TreeWrites<'a> {
    pub volume: &'a str,
    pub tree: &'a str,
    pub writes: &'a BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

/// A tree as found in the journal when the engine starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTree {
    pub volume: String,
    pub tree: String,
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

/// Durable sink for committed engine state
pub trait CommitJournal: Send + Sync {
    /// Record that a tree exists, even while empty
    fn create_tree(&self, volume: &str, tree: &str) -> EngineResult<()>;

    /// Persist one commit atomically
    fn apply(&self, batch: &[TreeWrites<'_>]) -> EngineResult<()>;

    /// Every tree currently stored
    fn load(&self) -> EngineResult<Vec<PersistedTree>>;
}
