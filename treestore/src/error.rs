// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for store transactions

use crate::storage::persistent::types::EngineError;
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Main error type for store transaction operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Engine or I/O failure; retrying the same call will not help
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] EngineError),

    /// Commit kept losing against concurrent writers; the caller may rerun
    /// the whole logical transaction
    #[error("Transaction conflict: commit failed after {attempts} attempts")]
    TransactionConflict {
        attempts: u32,
        #[source]
        source: EngineError,
    },

    /// The transaction was already committed or aborted
    #[error("Transaction already finished")]
    TransactionFinished,

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether rerunning the logical transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::TransactionConflict { .. })
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}

impl From<EngineError> for StoreError {
    fn from(e: EngineError) -> Self {
        StoreError::StorageUnavailable(e)
    }
}
