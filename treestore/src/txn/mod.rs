// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store transactions
//!
//! This module provides:
//! - Consistency levels carried by every transaction
//! - The `StoreTransaction` interface used by the storage layer
//! - `TransactionHandle`, a logical transaction bound to an engine session

pub mod consistency;
pub mod handle;

pub use consistency::{ConsistencyLevel, StoreTransaction};
pub use handle::TransactionHandle;
