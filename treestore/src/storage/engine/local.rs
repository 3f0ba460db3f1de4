// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Local session engine
//!
//! Trees are ordered in-memory maps grouped into volumes. Every committed
//! entry carries the version of the commit that wrote it; a transaction
//! remembers the version it started at and fails its commit with a conflict
//! when a key it wrote was committed by someone else in the meantime
//! (first committer wins). Writes are buffered per session until commit.
//!
//! Sessions are bound to threads per engine instance, so two engines in one
//! process never see each other's bindings.

use super::cursor::LocalCursor;
use super::{EngineTransaction, SessionEngine, SessionId};
use crate::storage::persistent::types::{EngineError, EngineResult};
use crate::storage::persistent::{CommitJournal, TreeWrites};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static BOUND_SESSIONS: RefCell<HashMap<u64, SessionId>> = RefCell::new(HashMap::new());
}

/// Commit counters of a [`LocalEngine`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Calls to `commit` on any transaction
    pub commit_attempts: u64,
    /// Commits that succeeded
    pub commits: u64,
    /// Commits rejected with a write conflict
    pub conflicts: u64,
}

/// In-process engine with per-thread session binding and optimistic commits
#[derive(Clone)]
pub struct LocalEngine {
    shared: Arc<Shared>,
}

pub(super) struct Shared {
    id: u64,
    pub(super) state: Mutex<EngineState>,
    journal: Option<Box<dyn CommitJournal>>,
}

type Buffer = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

pub(super) struct EngineState {
    clock: u64,
    volumes: HashMap<String, Volume>,
    txns: HashMap<SessionId, TxnState>,
    stats: EngineStats,
}

#[derive(Default)]
struct Volume {
    trees: HashMap<String, Tree>,
}

#[derive(Default)]
struct Tree {
    entries: BTreeMap<Vec<u8>, Versioned>,
}

struct Versioned {
    // None is a committed removal, kept for conflict detection
    value: Option<Vec<u8>>,
    version: u64,
}

struct TxnState {
    start_version: u64,
    writes: BTreeMap<(String, String), Buffer>,
}

impl EngineState {
    fn tree(&self, volume: &str, tree: &str) -> EngineResult<&Tree> {
        self.volumes
            .get(volume)
            .ok_or_else(|| EngineError::NoSuchVolume(volume.to_string()))?
            .trees
            .get(tree)
            .ok_or_else(|| EngineError::NoSuchTree {
                volume: volume.to_string(),
                tree: tree.to_string(),
            })
    }

    fn txn(&self, session: SessionId) -> EngineResult<&TxnState> {
        self.txns
            .get(&session)
            .ok_or(EngineError::InactiveTransaction(session))
    }

    /// Value of `key` as seen by `session`: its own writes over committed state
    pub(super) fn read(
        &self,
        session: SessionId,
        volume: &str,
        tree: &str,
        key: &[u8],
    ) -> EngineResult<Option<Vec<u8>>> {
        let txn = self.txn(session)?;
        let committed = self.tree(volume, tree)?;

        if let Some(buffered) = txn
            .writes
            .get(&(volume.to_string(), tree.to_string()))
            .and_then(|writes| writes.get(key))
        {
            return Ok(buffered.clone());
        }

        Ok(committed
            .entries
            .get(key)
            .and_then(|versioned| versioned.value.clone()))
    }

    /// Buffer a write (`Some`) or removal (`None`) for `session`
    pub(super) fn write(
        &mut self,
        session: SessionId,
        volume: &str,
        tree: &str,
        key: &[u8],
        value: Option<Vec<u8>>,
    ) -> EngineResult<()> {
        self.tree(volume, tree)?;
        let txn = self
            .txns
            .get_mut(&session)
            .ok_or(EngineError::InactiveTransaction(session))?;

        txn.writes
            .entry((volume.to_string(), tree.to_string()))
            .or_default()
            .insert(key.to_vec(), value);
        Ok(())
    }

    /// Entries with `prefix` in key order, as seen by `session`
    pub(super) fn scan(
        &self,
        session: SessionId,
        volume: &str,
        tree: &str,
        prefix: &[u8],
    ) -> EngineResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let txn = self.txn(session)?;
        let committed = self.tree(volume, tree)?;

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = committed
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, versioned)| {
                versioned
                    .value
                    .as_ref()
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect();

        if let Some(writes) = txn.writes.get(&(volume.to_string(), tree.to_string())) {
            for (key, value) in writes.range(prefix.to_vec()..) {
                if !key.starts_with(prefix) {
                    break;
                }
                match value {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

impl LocalEngine {
    /// Engine without durability
    pub fn in_memory() -> Self {
        Self::build(None, BTreeMap::new())
    }

    /// Engine whose commits are journaled, reloading the trees already stored
    pub fn with_journal(journal: Box<dyn CommitJournal>) -> EngineResult<Self> {
        let mut trees = BTreeMap::new();
        for persisted in journal.load()? {
            let entries = persisted
                .entries
                .into_iter()
                .map(|(key, value)| {
                    (
                        key,
                        Versioned {
                            value: Some(value),
                            version: 0,
                        },
                    )
                })
                .collect();
            trees.insert((persisted.volume, persisted.tree), Tree { entries });
        }

        log::debug!("Loaded {} trees from journal", trees.len());
        Ok(Self::build(Some(journal), trees))
    }

    /// Engine backed by a redb database at `path`
    /// A directory path gets a database file inside it.
    #[cfg(feature = "redb-backend")]
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> EngineResult<Self> {
        let journal = crate::storage::persistent::redb::RedbJournal::open(path)?;
        Self::with_journal(Box::new(journal))
    }

    fn build(
        journal: Option<Box<dyn CommitJournal>>,
        trees: BTreeMap<(String, String), Tree>,
    ) -> Self {
        let mut volumes: HashMap<String, Volume> = HashMap::new();
        for ((volume, name), tree) in trees {
            volumes.entry(volume).or_default().trees.insert(name, tree);
        }

        LocalEngine {
            shared: Arc::new(Shared {
                id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(EngineState {
                    clock: 0,
                    volumes,
                    txns: HashMap::new(),
                    stats: EngineStats::default(),
                }),
                journal,
            }),
        }
    }

    /// Create a volume if it does not exist yet
    pub fn create_volume(&self, name: &str) -> EngineResult<()> {
        let mut state = self.shared.state.lock();
        if !state.volumes.contains_key(name) {
            log::debug!("Creating volume '{}'", name);
            state.volumes.insert(name.to_string(), Volume::default());
        }
        Ok(())
    }

    pub fn volume_names(&self) -> Vec<String> {
        let state = self.shared.state.lock();
        let mut names: Vec<String> = state.volumes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Trees of `volume`, sorted by name
    pub fn tree_names(&self, volume: &str) -> EngineResult<Vec<String>> {
        let state = self.shared.state.lock();
        let volume_state = state
            .volumes
            .get(volume)
            .ok_or_else(|| EngineError::NoSuchVolume(volume.to_string()))?;

        let mut names: Vec<String> = volume_state.trees.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Latest committed value of `key`, outside of any transaction
    pub fn read_committed(
        &self,
        volume: &str,
        tree: &str,
        key: &[u8],
    ) -> EngineResult<Option<Vec<u8>>> {
        let state = self.shared.state.lock();
        Ok(state
            .tree(volume, tree)?
            .entries
            .get(key)
            .and_then(|versioned| versioned.value.clone()))
    }

    /// Number of sessions with a begun, not yet ended transaction
    pub fn active_transactions(&self) -> usize {
        self.shared.state.lock().txns.len()
    }

    pub fn stats(&self) -> EngineStats {
        self.shared.state.lock().stats
    }

    fn bound_session(&self) -> EngineResult<SessionId> {
        self.current_session().ok_or(EngineError::SessionNotBound)
    }
}

impl SessionEngine for LocalEngine {
    type Transaction = LocalTransaction;
    type Cursor = LocalCursor;

    fn bind_session(&self, session: SessionId) {
        BOUND_SESSIONS.with(|bound| {
            bound.borrow_mut().insert(self.shared.id, session);
        });
    }

    fn current_session(&self) -> Option<SessionId> {
        BOUND_SESSIONS.with(|bound| bound.borrow().get(&self.shared.id).copied())
    }

    fn transaction(&self) -> EngineResult<LocalTransaction> {
        let session = self.bound_session()?;
        Ok(LocalTransaction {
            shared: Arc::clone(&self.shared),
            session,
        })
    }

    fn open_cursor(
        &self,
        volume: &str,
        tree: &str,
        create_if_missing: bool,
    ) -> EngineResult<LocalCursor> {
        let session = self.bound_session()?;
        let mut state = self.shared.state.lock();

        let volume_state = state
            .volumes
            .get_mut(volume)
            .ok_or_else(|| EngineError::NoSuchVolume(volume.to_string()))?;

        if !volume_state.trees.contains_key(tree) {
            if !create_if_missing {
                return Err(EngineError::NoSuchTree {
                    volume: volume.to_string(),
                    tree: tree.to_string(),
                });
            }
            if let Some(journal) = &self.shared.journal {
                journal.create_tree(volume, tree)?;
            }
            log::debug!("Created tree '{}' in volume '{}'", tree, volume);
            volume_state.trees.insert(tree.to_string(), Tree::default());
        }

        Ok(LocalCursor::new(
            Arc::clone(&self.shared),
            session,
            volume.to_string(),
            tree.to_string(),
        ))
    }
}

/// Transaction object of one session on a [`LocalEngine`]
pub struct LocalTransaction {
    shared: Arc<Shared>,
    session: SessionId,
}

impl EngineTransaction for LocalTransaction {
    fn session_id(&self) -> SessionId {
        self.session
    }

    fn is_active(&self) -> bool {
        self.shared.state.lock().txns.contains_key(&self.session)
    }

    fn begin(&mut self) -> EngineResult<()> {
        let mut state = self.shared.state.lock();
        if state.txns.contains_key(&self.session) {
            return Err(EngineError::AlreadyActive(self.session));
        }

        let start_version = state.clock;
        state.txns.insert(
            self.session,
            TxnState {
                start_version,
                writes: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        state.stats.commit_attempts += 1;

        let txn = state
            .txns
            .get_mut(&self.session)
            .ok_or(EngineError::InactiveTransaction(self.session))?;

        for ((volume, tree), writes) in &txn.writes {
            let committed = state
                .volumes
                .get(volume)
                .and_then(|v| v.trees.get(tree))
                .ok_or_else(|| EngineError::NoSuchTree {
                    volume: volume.clone(),
                    tree: tree.clone(),
                })?;

            let conflicting = writes.keys().any(|key| {
                committed
                    .entries
                    .get(key)
                    .is_some_and(|versioned| versioned.version > txn.start_version)
            });
            if conflicting {
                state.stats.conflicts += 1;
                return Err(EngineError::Conflict {
                    volume: volume.clone(),
                    tree: tree.clone(),
                });
            }
        }

        if !txn.writes.is_empty() {
            // Journal first: a failed write leaves memory untouched
            if let Some(journal) = &self.shared.journal {
                let batch: Vec<TreeWrites<'_>> = txn
                    .writes
                    .iter()
                    .map(|((volume, tree), writes)| TreeWrites {
                        volume,
                        tree,
                        writes,
                    })
                    .collect();
                journal.apply(&batch)?;
            }

            state.clock += 1;
            let version = state.clock;
            for ((volume, tree), writes) in std::mem::take(&mut txn.writes) {
                let Some(committed) = state
                    .volumes
                    .get_mut(&volume)
                    .and_then(|v| v.trees.get_mut(&tree))
                else {
                    continue;
                };
                for (key, value) in writes {
                    committed.entries.insert(key, Versioned { value, version });
                }
            }
        }

        txn.start_version = state.clock;
        state.stats.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> EngineResult<()> {
        let mut state = self.shared.state.lock();
        let txn = state
            .txns
            .get_mut(&self.session)
            .ok_or(EngineError::InactiveTransaction(self.session))?;
        txn.writes.clear();
        Ok(())
    }

    fn end(&mut self) {
        self.shared.state.lock().txns.remove(&self.session);
    }
}
