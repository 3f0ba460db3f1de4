// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store configuration

use crate::error::{StoreError, StoreResult};
use crate::storage::StorageType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Volume used when none is configured
pub const DEFAULT_VOLUME_NAME: &str = "treestore";

/// Extra commit attempts after an optimistic conflict
pub const DEFAULT_COMMIT_RETRIES: u32 = 3;

/// Configuration for a store and the transactions it begins
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```ignore
/// let config = StoreConfig::from_json(r#"{"storage_type": "redb", "path": "/var/lib/store"}"#)?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// The single volume all trees of a transaction live in
    pub volume_name: String,

    /// Commit is attempted `commit_retries + 1` times on conflict
    pub commit_retries: u32,

    pub storage_type: StorageType,

    /// Database file or directory, required for redb
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            volume_name: DEFAULT_VOLUME_NAME.to_string(),
            commit_retries: DEFAULT_COMMIT_RETRIES,
            storage_type: StorageType::default(),
            path: None,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = name.into();
        self
    }

    #[must_use]
    pub fn commit_retries(mut self, retries: u32) -> Self {
        self.commit_retries = retries;
        self
    }

    /// Journal commits to a redb database at `path`
    #[must_use]
    pub fn redb(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_type = StorageType::Redb;
        self.path = Some(path.into());
        self
    }

    /// Total commit attempts before a conflict is surfaced
    pub fn max_commit_attempts(&self) -> u32 {
        self.commit_retries.saturating_add(1)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.volume_name.is_empty() {
            return Err(StoreError::Config("volume_name must not be empty".to_string()));
        }
        if self.volume_name.contains('/') {
            return Err(StoreError::Config(format!(
                "volume_name must not contain '/': {}",
                self.volume_name
            )));
        }
        if self.storage_type == StorageType::Redb && self.path.is_none() {
            return Err(StoreError::Config(
                "redb storage requires a path".to_string(),
            ));
        }
        Ok(())
    }
}
