// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction handle bound to an engine session
//!
//! A handle owns one session identity and the single engine transaction that
//! belongs to it. The handle may be passed between threads, while the engine
//! resolves transactions through the session bound to the *calling* thread,
//! so every engine-touching operation first binds the handle's session to the
//! current thread. All operations take the handle lock, which keeps the bind
//! and the engine call that follows it together.

use super::consistency::{ConsistencyLevel, StoreTransaction};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::storage::engine::{EngineTransaction, SessionEngine, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One logical transaction against a [`SessionEngine`]
pub struct TransactionHandle<E: SessionEngine> {
    engine: Arc<E>,
    session: SessionId,
    level: ConsistencyLevel,
    volume: String,
    max_commit_attempts: u32,
    state: Mutex<HandleState<E>>,
}

struct HandleState<E: SessionEngine> {
    tx: E::Transaction,
    cursors: HashMap<String, Arc<E::Cursor>>,
    finished: bool,
}

impl<E: SessionEngine> HandleState<E> {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.finished {
            return Err(StoreError::TransactionFinished);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.cursors.clear();
        self.finished = true;
    }
}

/// Ends the engine transaction and closes the handle when dropped
struct Finalizer<'a, E: SessionEngine> {
    state: &'a mut HandleState<E>,
}

impl<E: SessionEngine> Drop for Finalizer<'_, E> {
    fn drop(&mut self) {
        self.state.tx.end();
        self.state.close();
    }
}

impl<E: SessionEngine> TransactionHandle<E> {
    /// Open a new session on `engine` and begin its transaction
    pub fn new(engine: Arc<E>, level: ConsistencyLevel, config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let session = SessionId::new();
        engine.bind_session(session);

        let mut tx = engine.transaction()?;
        debug_assert_eq!(tx.session_id(), session);
        tx.begin()?;

        log::debug!(
            "Began transaction for {} on volume '{}' ({})",
            session,
            config.volume_name,
            level
        );

        Ok(Self {
            engine,
            session,
            level,
            volume: config.volume_name.clone(),
            max_commit_attempts: config.max_commit_attempts(),
            state: Mutex::new(HandleState {
                tx,
                cursors: HashMap::new(),
                finished: false,
            }),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn volume(&self) -> &str {
        &self.volume
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Assign this handle's session to the calling thread
    pub fn rebind(&self) {
        let _state = self.state.lock();
        self.bind();
    }

    // Callers hold the state lock
    fn bind(&self) {
        self.engine.bind_session(self.session);
        debug_assert_eq!(self.engine.current_session(), Some(self.session));
    }

    /// Begin the engine transaction again if it is not active
    pub fn resume_if_inactive(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        self.bind();

        if !state.tx.is_active() {
            state.tx.begin()?;
            log::debug!("Resumed transaction for {}", self.session);
        }
        Ok(())
    }

    /// Cursor on `tree`, creating the tree when it does not exist
    pub fn get_cursor(&self, tree: &str) -> StoreResult<Arc<E::Cursor>> {
        self.get_cursor_with(tree, true)
    }

    /// Cursor on `tree`, opened once per transaction and cached by name
    pub fn get_cursor_with(
        &self,
        tree: &str,
        create_if_missing: bool,
    ) -> StoreResult<Arc<E::Cursor>> {
        if tree.is_empty() {
            return Err(StoreError::InvalidArgument(
                "tree name must not be empty".to_string(),
            ));
        }

        let mut state = self.state.lock();
        state.ensure_open()?;

        if let Some(cursor) = state.cursors.get(tree) {
            return Ok(Arc::clone(cursor));
        }

        self.bind();
        let cursor = Arc::new(
            self.engine
                .open_cursor(&self.volume, tree, create_if_missing)?,
        );
        state.cursors.insert(tree.to_string(), Arc::clone(&cursor));

        log::debug!("Opened cursor on '{}/{}' for {}", self.volume, tree, self.session);
        Ok(cursor)
    }

    /// Cursors stay cached until the transaction ends.
    pub fn release_cursor(&self, _cursor: &Arc<E::Cursor>) {
        // Sessions are never reused, so an engine-side pool keyed by session
        // would never hand these back out.
    }

    pub fn cached_cursor_count(&self) -> usize {
        self.state.lock().cursors.len()
    }

    /// Whether the engine transaction is begun and not yet ended
    pub fn is_active(&self) -> bool {
        self.state.lock().tx.is_active()
    }

    /// Whether commit or abort already completed
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// Run `f` against the raw engine transaction with the session bound
    pub fn with_engine_transaction<R>(&self, f: impl FnOnce(&mut E::Transaction) -> R) -> R {
        let mut state = self.state.lock();
        self.bind();
        f(&mut state.tx)
    }

    /// Commit, re-issuing the engine commit while it reports conflicts and
    /// attempts remain. The engine transaction is ended on every path.
    pub fn commit(&self) -> StoreResult<()> {
        self.commit_inner()
    }

    /// Roll back and end the engine transaction. No-op when it is not active.
    pub fn abort(&self) -> StoreResult<()> {
        self.abort_inner()
    }

    fn commit_inner(&self) -> StoreResult<()> {
        let mut guard = self.state.lock();
        guard.ensure_open()?;
        self.bind();

        let finalizer = Finalizer { state: &mut *guard };
        self.commit_with_retry(&mut finalizer.state.tx)
    }

    fn commit_with_retry(&self, tx: &mut E::Transaction) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match tx.commit() {
                Ok(()) => {
                    log::debug!("Committed {} on attempt {}", self.session, attempt);
                    return Ok(());
                }
                Err(e) if e.is_conflict() && attempt < self.max_commit_attempts => {
                    log::debug!(
                        "Commit attempt {}/{} for {} conflicted: {}",
                        attempt,
                        self.max_commit_attempts,
                        self.session,
                        e
                    );
                }
                Err(e) if e.is_conflict() => {
                    log::warn!(
                        "Giving up commit of {} after {} attempts: {}",
                        self.session,
                        attempt,
                        e
                    );
                    return Err(StoreError::TransactionConflict {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    log::warn!("Commit of {} failed: {}", self.session, e);
                    return Err(StoreError::StorageUnavailable(e));
                }
            }
        }
    }

    fn abort_inner(&self) -> StoreResult<()> {
        let mut guard = self.state.lock();
        if guard.finished {
            return Ok(());
        }
        if !guard.tx.is_active() {
            guard.close();
            return Ok(());
        }

        self.bind();
        let finalizer = Finalizer { state: &mut *guard };
        finalizer.state.tx.rollback().map_err(|e| {
            log::warn!("Rollback of {} failed: {}", self.session, e);
            StoreError::StorageUnavailable(e)
        })?;

        log::debug!("Aborted transaction for {}", self.session);
        Ok(())
    }
}

impl<E: SessionEngine> StoreTransaction for TransactionHandle<E> {
    fn consistency_level(&self) -> ConsistencyLevel {
        self.level
    }

    fn commit(&self) -> StoreResult<()> {
        self.commit_inner()
    }

    fn abort(&self) -> StoreResult<()> {
        self.abort_inner()
    }
}

impl<E: SessionEngine> Drop for TransactionHandle<E> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.finished || !state.tx.is_active() {
            return;
        }

        log::warn!("Transaction {} dropped while active, rolling back", self.session);
        self.engine.bind_session(self.session);
        if let Err(e) = state.tx.rollback() {
            log::warn!("Rollback of dropped transaction {} failed: {}", self.session, e);
        }
        state.tx.end();
    }
}

impl<E: SessionEngine> std::fmt::Debug for TransactionHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("session", &self.session)
            .field("level", &self.level)
            .field("volume", &self.volume)
            .field("max_commit_attempts", &self.max_commit_attempts)
            .finish()
    }
}
