//! Disk-backed map provider
//!
//! Each table lives in memory and is made durable by an operation log:
//! ```text
//! {data_dir}/
//!   └── {table id}/
//!         └── table.log
//! ```
//! `prepare` replays the log (truncating a torn tail) and opens it for
//! appending; the engine then reports every applied operation through
//! [`DiskMapProvider::append`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{MapProvider, MemoryMapProvider, Partition, SortedMap};
use crate::config::{Config, SyncStrategy};
use crate::engine::MapKeyValue;
use crate::error::{Result, StoreError};
use crate::key::TableId;
use crate::log::{LogRecovery, LogWriter, Operation};

pub struct DiskMapProvider {
    root: PathBuf,
    sync_strategy: SyncStrategy,
    memory: MemoryMapProvider,
    logs: Mutex<HashMap<TableId, LogWriter>>,
}

impl DiskMapProvider {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const LOG_FILENAME: &'static str = "table.log";

    /// Open a provider rooted at `config.data_dir`
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            root: config.data_dir.clone(),
            sync_strategy: config.sync_strategy,
            memory: MemoryMapProvider::new(),
            logs: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a table's log file
    pub fn log_path(&self, table: &TableId) -> PathBuf {
        self.root
            .join(table.as_uuid().hyphenated().to_string())
            .join(Self::LOG_FILENAME)
    }

    /// Record an applied operation in its table's log
    pub fn append(&self, op: &MapKeyValue) -> Result<u64> {
        let mut logs = self.logs.lock();
        let writer = logs.get_mut(&op.table).ok_or_else(|| {
            StoreError::Storage(format!("table {} is not prepared", op.table))
        })?;

        let operation = match &op.value {
            Some(value) => Operation::Put {
                key: op.key.clone(),
                value: value.clone(),
            },
            None => Operation::Remove { key: op.key.clone() },
        };
        writer.append(operation)
    }

    /// Force every table log to disk
    pub fn sync(&self) -> Result<()> {
        for writer in self.logs.lock().values_mut() {
            writer.sync()?;
        }
        Ok(())
    }
}

impl MapProvider for DiskMapProvider {
    fn prepare(&self, table: &TableId) -> Result<()> {
        let mut logs = self.logs.lock();
        if logs.contains_key(table) {
            return Ok(());
        }

        self.memory.prepare(table)?;
        let sorted = self
            .memory
            .table(table)
            .ok_or_else(|| StoreError::Storage(format!("table {} vanished during prepare", table)))?;

        let path = self.log_path(table);
        if path.exists() {
            let (entries, result) = LogRecovery::recover(&path)?;
            for entry in entries {
                match entry.operation {
                    Operation::Put { key, value } => {
                        sorted.put(key, value);
                    }
                    Operation::Remove { key } => {
                        sorted.remove(&key);
                    }
                }
            }
            debug!(%table, records = result.entries_recovered, rows = sorted.len(), "replayed table log");
        }

        logs.insert(*table, LogWriter::open(&path, self.sync_strategy)?);
        Ok(())
    }

    fn get(
        &self,
        table: &TableId,
        key: &[u8],
        partition: Partition<'_>,
    ) -> Result<Option<Arc<dyn SortedMap>>> {
        self.memory.get(table, key, partition)
    }
}
