// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! REDB commit journal implementation

use super::types::{EngineError, EngineResult};
use super::{CommitJournal, PersistedTree, TreeWrites};
use redb::{Database, ReadableTable, TableDefinition, TableHandle};
use std::path::Path;

/// File name used when the journal is opened on a directory
pub const DEFAULT_FILE_NAME: &str = "treestore.redb";

/// REDB journal
/// Each tree is a separate table named `<volume>/<tree>`
pub struct RedbJournal {
    db: Database,
}

fn table_name(volume: &str, tree: &str) -> String {
    format!("{}/{}", volume, tree)
}

fn backend<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::BackendSpecific(e.to_string())
}

impl RedbJournal {
    /// Open or create the journal database
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        // REDB requires a file path, not a directory
        let db_path = if path.as_ref().is_dir() {
            path.as_ref().join(DEFAULT_FILE_NAME)
        } else {
            path.as_ref().to_path_buf()
        };

        let db = Database::create(&db_path).map_err(backend)?;
        log::debug!("Opened redb journal at {}", db_path.display());

        Ok(RedbJournal { db })
    }
}

impl CommitJournal for RedbJournal {
    fn create_tree(&self, volume: &str, tree: &str) -> EngineResult<()> {
        // Opening a table in a write transaction creates it
        let name = table_name(volume, tree);
        let write_txn = self.db.begin_write().map_err(backend)?;

        {
            let table_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&name);
            let _ = write_txn.open_table(table_def).map_err(backend)?;
        }

        write_txn.commit().map_err(backend)?;
        Ok(())
    }

    fn apply(&self, batch: &[TreeWrites<'_>]) -> EngineResult<()> {
        let write_txn = self.db.begin_write().map_err(backend)?;

        for tree_writes in batch {
            let name = table_name(tree_writes.volume, tree_writes.tree);
            let table_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&name);
            let mut table = write_txn.open_table(table_def).map_err(backend)?;

            for (key, value) in tree_writes.writes {
                match value {
                    Some(value) => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(backend)?;
                    }
                    None => {
                        table.remove(key.as_slice()).map_err(backend)?;
                    }
                }
            }
        }

        write_txn.commit().map_err(backend)?;
        Ok(())
    }

    fn load(&self) -> EngineResult<Vec<PersistedTree>> {
        let read_txn = self.db.begin_read().map_err(backend)?;

        let table_names: Vec<String> = read_txn
            .list_tables()
            .map_err(backend)?
            .map(|handle| handle.name().to_string())
            .collect();

        let mut trees = Vec::with_capacity(table_names.len());
        for name in table_names {
            let Some((volume, tree)) = name.split_once('/') else {
                log::warn!("Skipping foreign table '{}' in redb journal", name);
                continue;
            };

            let table_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&name);
            let table = read_txn.open_table(table_def).map_err(backend)?;

            let entries = table
                .iter()
                .map_err(backend)?
                .map(|result| {
                    result
                        .map(|(k, v)| (k.value().to_vec(), v.value().to_vec()))
                        .map_err(backend)
                })
                .collect::<EngineResult<Vec<_>>>()?;

            trees.push(PersistedTree {
                volume: volume.to_string(),
                tree: tree.to_string(),
                entries,
            });
        }

        Ok(trees)
    }
}
