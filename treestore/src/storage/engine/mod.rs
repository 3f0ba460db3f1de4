// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session engine abstraction
//!
//! This module provides:
//! - Opaque session identities
//! - The engine trait consumed by the transaction layer
//! - The engine transaction trait (begin, commit, rollback, end)
//! - A local reference engine with per-thread session binding
//!
//! Engines bind transaction state to a session, and sessions to threads.
//! A caller that moves work between threads must bind its session on the
//! new thread before touching the engine again.

pub mod cursor;
pub mod local;

pub use cursor::LocalCursor;
pub use local::{EngineStats, LocalEngine, LocalTransaction};

use crate::storage::persistent::types::EngineResult;
use uuid::Uuid;

/// Opaque token identifying one logical session to an engine
///
/// Every call to [`SessionId::new`] yields an identity that has never been
/// handed out before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// An embedded transactional engine with thread-bound sessions
pub trait SessionEngine: Send + Sync {
    /// The engine's transaction object
    type Transaction: EngineTransaction;

    /// Handle for navigating and mutating one tree
    type Cursor: Send + Sync;

    /// Assign `session` to the calling thread
    fn bind_session(&self, session: SessionId);

    /// Session currently assigned to the calling thread, if any
    fn current_session(&self) -> Option<SessionId>;

    /// Transaction object of the session bound to the calling thread
    fn transaction(&self) -> EngineResult<Self::Transaction>;

    /// Open a cursor on `tree` in `volume` for the session bound to the
    /// calling thread, creating the tree if requested
    fn open_cursor(
        &self,
        volume: &str,
        tree: &str,
        create_if_missing: bool,
    ) -> EngineResult<Self::Cursor>;
}

/// Transaction object of a [`SessionEngine`]
pub trait EngineTransaction: Send {
    /// Session this transaction belongs to
    fn session_id(&self) -> SessionId;

    /// Begun and not yet ended
    fn is_active(&self) -> bool;

    fn begin(&mut self) -> EngineResult<()>;

    /// Commit buffered work. Returns [`crate::EngineError::Conflict`] when a
    /// concurrent writer won; re-issuing the commit is allowed.
    fn commit(&mut self) -> EngineResult<()>;

    /// Discard buffered work
    fn rollback(&mut self) -> EngineResult<()>;

    /// Release engine-side transaction state. Idempotent.
    fn end(&mut self);
}
