// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Consistency levels and the common store transaction interface

use crate::error::StoreResult;
use serde::{Deserialize, Serialize};

/// Consistency requested by the caller when a transaction is opened
///
/// The transaction layer does not interpret it; it is carried along so the
/// layers above can.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    #[default]
    Default,

    /// Reads and writes on a single key are consistent
    KeyConsistent,
}

impl std::str::FromStr for ConsistencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(ConsistencyLevel::Default),
            "key_consistent" => Ok(ConsistencyLevel::KeyConsistent),
            _ => Err(format!(
                "Unknown consistency level: {}. Valid options: default, key_consistent",
                s
            )),
        }
    }
}

impl std::fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConsistencyLevel::Default => "default",
            ConsistencyLevel::KeyConsistent => "key_consistent",
        };
        write!(f, "{}", name)
    }
}

/// A transaction as seen by the storage layer
pub trait StoreTransaction {
    fn consistency_level(&self) -> ConsistencyLevel;

    fn commit(&self) -> StoreResult<()>;

    fn abort(&self) -> StoreResult<()>;
}
