// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store manager - entry point for opening engines and beginning transactions

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::storage::engine::{LocalEngine, SessionEngine};
use crate::storage::persistent::types::StorageType;
use crate::txn::{ConsistencyLevel, TransactionHandle};
use std::sync::Arc;

/// Shares one engine and one configuration among all transactions it begins
pub struct StoreManager<E: SessionEngine> {
    engine: Arc<E>,
    config: StoreConfig,
}

impl<E: SessionEngine> StoreManager<E> {
    /// Wrap an engine that already holds the configured volume
    pub fn new(engine: Arc<E>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    /// Begin a new logical transaction with its own engine session
    pub fn begin_transaction(&self, level: ConsistencyLevel) -> StoreResult<TransactionHandle<E>> {
        TransactionHandle::new(Arc::clone(&self.engine), level, &self.config)
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl StoreManager<LocalEngine> {
    /// Build a local engine from `config` and create its volume
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let engine = match config.storage_type {
            StorageType::Memory => LocalEngine::in_memory(),
            StorageType::Redb => Self::open_redb(&config)?,
        };
        engine.create_volume(&config.volume_name)?;

        log::debug!(
            "Opened {} store with volume '{}'",
            config.storage_type,
            config.volume_name
        );
        Self::new(Arc::new(engine), config)
    }

    #[cfg(feature = "redb-backend")]
    fn open_redb(config: &StoreConfig) -> StoreResult<LocalEngine> {
        let path = config
            .path
            .as_ref()
            .ok_or_else(|| StoreError::Config("redb storage requires a path".to_string()))?;
        Ok(LocalEngine::open(path)?)
    }

    #[cfg(not(feature = "redb-backend"))]
    fn open_redb(_config: &StoreConfig) -> StoreResult<LocalEngine> {
        Err(StoreError::Config(
            "redb storage requires the redb-backend feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_store_creates_volume() {
        let store = StoreManager::open(StoreConfig::new().volume_name("titan"))
            .expect("Failed to open store");

        assert_eq!(store.engine().volume_names(), vec!["titan".to_string()]);
        assert_eq!(store.config().volume_name, "titan");

        let tx = store
            .begin_transaction(ConsistencyLevel::KeyConsistent)
            .expect("Failed to begin");
        assert_eq!(tx.volume(), "titan");
        tx.commit().expect("Failed to commit empty transaction");
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let mut config = StoreConfig::new();
        config.storage_type = StorageType::Redb;
        assert!(matches!(
            StoreManager::open(config),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_transactions_get_distinct_sessions() {
        let store = StoreManager::open(StoreConfig::default()).expect("Failed to open store");
        let first = store
            .begin_transaction(ConsistencyLevel::Default)
            .expect("Failed to begin");
        let second = store
            .begin_transaction(ConsistencyLevel::Default)
            .expect("Failed to begin");

        assert_ne!(first.session_id(), second.session_id());
        assert_eq!(store.engine().active_transactions(), 2);
    }
}
