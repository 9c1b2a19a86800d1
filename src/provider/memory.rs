//! In-memory map provider: one unpartitioned `SortedTable` per table id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{MapProvider, Partition, SortedMap};
use crate::error::Result;
use crate::key::TableId;
use crate::table::SortedTable;

#[derive(Default)]
pub struct MemoryMapProvider {
    tables: RwLock<HashMap<TableId, Arc<SortedTable>>>,
}

impl MemoryMapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete table for an id, if prepared
    pub fn table(&self, table: &TableId) -> Option<Arc<SortedTable>> {
        self.tables.read().get(table).cloned()
    }

    /// Number of prepared tables
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }
}

impl MapProvider for MemoryMapProvider {
    fn prepare(&self, table: &TableId) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.contains_key(table) {
            debug!(%table, "prepared table");
            tables.insert(*table, Arc::new(SortedTable::new()));
        }
        Ok(())
    }

    fn get(
        &self,
        table: &TableId,
        _key: &[u8],
        partition: Partition<'_>,
    ) -> Result<Option<Arc<dyn SortedMap>>> {
        match partition {
            Partition::Current => Ok(self
                .table(table)
                .map(|t| t as Arc<dyn SortedMap>)),
            Partition::Next { .. } => Ok(None),
        }
    }
}
