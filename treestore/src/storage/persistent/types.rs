// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine types and error handling
//!
//! This module defines the storage type selector and the error type reported
//! by session engines. Engine errors are low level; the transaction layer maps
//! them onto [`crate::StoreError`].

use crate::storage::engine::SessionId;
use serde::{Deserialize, Serialize};

/// Storage type configuration
///
/// Specifies where a [`crate::LocalEngine`] keeps committed trees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Memory - trees live only as long as the engine
    /// Best for: Unit testing, caches, development
    #[default]
    Memory,

    /// Redb - committed writes are journaled to a redb database file
    /// Best for: Durability across restarts
    Redb,
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "redb" => Ok(StorageType::Redb),
            _ => Err(format!(
                "Unknown storage type: {}. Valid options: memory, redb",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Memory => "memory",
            StorageType::Redb => "redb",
        };
        write!(f, "{}", name)
    }
}

/// Error type for session engine operations
///
/// `Conflict` is the only variant a caller may resolve by re-issuing the same
/// call; everything else is permanent from the engine's point of view.
#[derive(Debug)]
pub enum EngineError {
    /// Optimistic conflict detected at commit: another transaction committed
    /// a write to the same key after this transaction started
    Conflict { volume: String, tree: String },

    /// The transaction bound to this session is not active
    InactiveTransaction(SessionId),

    /// `begin` was called on a transaction that is already active
    AlreadyActive(SessionId),

    /// The calling thread has no session bound for this engine
    SessionNotBound,

    /// Requested volume does not exist
    NoSuchVolume(String),

    /// Requested tree does not exist and creation was not requested
    NoSuchTree { volume: String, tree: String },

    /// I/O related errors (file system)
    IoError(std::io::Error),

    /// Backend-specific error (redb, ...)
    BackendSpecific(String),
}

impl EngineError {
    /// Whether this is an optimistic-conflict signal
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict { .. })
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Conflict { volume, tree } => {
                write!(f, "Write conflict on tree {}/{}", volume, tree)
            }
            EngineError::InactiveTransaction(session) => {
                write!(f, "No active transaction for session {}", session)
            }
            EngineError::AlreadyActive(session) => {
                write!(f, "Transaction for session {} is already active", session)
            }
            EngineError::SessionNotBound => write!(f, "No session bound to the current thread"),
            EngineError::NoSuchVolume(name) => write!(f, "Volume not found: {}", name),
            EngineError::NoSuchTree { volume, tree } => {
                write!(f, "Tree not found: {}/{}", volume, tree)
            }
            EngineError::IoError(e) => write!(f, "I/O error: {}", e),
            EngineError::BackendSpecific(e) => write!(f, "Storage engine error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::IoError(e)
    }
}

/// Result type for session engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_parse_and_display() {
        assert_eq!("redb".parse::<StorageType>(), Ok(StorageType::Redb));
        assert_eq!("MEMORY".parse::<StorageType>(), Ok(StorageType::Memory));
        assert!("sled".parse::<StorageType>().is_err());

        assert_eq!(StorageType::Redb.to_string(), "redb");
        assert_eq!(StorageType::default(), StorageType::Memory);
    }

    #[test]
    fn test_only_conflict_is_conflict() {
        let conflict = EngineError::Conflict {
            volume: "v".to_string(),
            tree: "t".to_string(),
        };
        assert!(conflict.is_conflict());
        assert!(!EngineError::SessionNotBound.is_conflict());
        assert!(!EngineError::BackendSpecific("disk full".to_string()).is_conflict());
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error;

        let err: EngineError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "I/O error: boom");
    }
}
