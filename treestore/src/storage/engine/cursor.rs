// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cursor over one tree of a local engine volume

use super::local::Shared;
use super::SessionId;
use crate::storage::persistent::types::EngineResult;
use std::sync::Arc;

/// Handle for reading and mutating one tree inside the transaction of the
/// session that opened it
///
/// The cursor keeps that session for its whole life, so it can be used from
/// any thread. Every operation fails once the session's transaction ended.
pub struct LocalCursor {
    shared: Arc<Shared>,
    session: SessionId,
    volume: String,
    tree: String,
}

impl LocalCursor {
    pub(super) fn new(shared: Arc<Shared>, session: SessionId, volume: String, tree: String) -> Self {
        Self {
            shared,
            session,
            volume,
            tree,
        }
    }

    pub fn volume(&self) -> &str {
        &self.volume
    }

    pub fn tree(&self) -> &str {
        &self.tree
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.shared
            .state
            .lock()
            .read(self.session, &self.volume, &self.tree, key)
    }

    pub fn contains_key(&self, key: &[u8]) -> EngineResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.shared.state.lock().write(
            self.session,
            &self.volume,
            &self.tree,
            key,
            Some(value.to_vec()),
        )
    }

    /// Remove `key`, returning whether it was visible before
    pub fn remove(&self, key: &[u8]) -> EngineResult<bool> {
        let mut state = self.shared.state.lock();
        let existed = state
            .read(self.session, &self.volume, &self.tree, key)?
            .is_some();
        state.write(self.session, &self.volume, &self.tree, key, None)?;
        Ok(existed)
    }

    /// Entries whose key starts with `prefix`, in key order
    pub fn scan_prefix(&self, prefix: &[u8]) -> EngineResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.shared
            .state
            .lock()
            .scan(self.session, &self.volume, &self.tree, prefix)
    }

    /// All entries in key order
    pub fn entries(&self) -> EngineResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.scan_prefix(&[])
    }
}

impl std::fmt::Debug for LocalCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCursor")
            .field("session", &self.session)
            .field("volume", &self.volume)
            .field("tree", &self.tree)
            .finish()
    }
}
