//! Reference engine
//!
//! Stateless between calls apart from the sorted maps behind its provider.
//! Fan-out writes are applied table by table; a failure part way leaves the
//! earlier tables written.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{Continuation, Entries, MapKeyValue, RangeKeys, StorageEngine};
use crate::blob::{Blob, BlobReader, BlobStore, StreamEncoding};
use crate::config::Config;
use crate::definition::{decode_value, Definition};
use crate::entry::Entry;
use crate::error::{Result, StoreError};
use crate::field::{Column, FieldValue};
use crate::key::{KeyRegistry, TableId};
use crate::provider::{MapProvider, MemoryMapProvider, Partition, SortedMap};

/// Reference storage engine
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Source of the per-table sorted maps
    provider: Arc<dyn MapProvider>,

    /// Every definition, in registration order
    definitions: Vec<Arc<Definition>>,

    /// Definitions sharing each table, in registration order
    by_table: HashMap<TableId, Vec<Arc<Definition>>>,

    /// Table ids of the registered key layouts
    keys: KeyRegistry,

    /// Chunked blob storage
    blobs: BlobStore,
}

impl Engine {
    /// In-memory engine with default configuration
    pub fn new(definitions: Vec<Definition>) -> Result<Self> {
        Self::with_provider(
            Config::default(),
            Arc::new(MemoryMapProvider::new()),
            definitions,
        )
    }

    /// Engine over an arbitrary map provider
    ///
    /// On construction:
    /// 1. Validate the config
    /// 2. Register every definition, in order
    /// 3. Prepare one table per distinct key layout
    pub fn with_provider(
        config: Config,
        provider: Arc<dyn MapProvider>,
        definitions: Vec<Definition>,
    ) -> Result<Self> {
        // Step 1: Validate
        config.validate()?;

        // Step 2: Register definitions
        let mut keys = KeyRegistry::new();
        let mut by_table: HashMap<TableId, Vec<Arc<Definition>>> = HashMap::new();
        let definitions: Vec<Arc<Definition>> = definitions.into_iter().map(Arc::new).collect();
        for definition in &definitions {
            let table = keys.register(definition.key_columns());
            by_table.entry(table).or_default().push(definition.clone());
        }

        // Step 3: Prepare tables
        for table in by_table.keys() {
            provider.prepare(table)?;
        }
        debug!(
            definitions = definitions.len(),
            tables = by_table.len(),
            "engine ready"
        );

        let blobs = BlobStore::new(&config);
        Ok(Self {
            config,
            provider,
            definitions,
            by_table,
            keys,
            blobs,
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn definitions(&self) -> &[Arc<Definition>] {
        &self.definitions
    }

    /// Definitions registered for a table, in registration order
    pub fn definitions_for(&self, table: &TableId) -> Option<&[Arc<Definition>]> {
        self.by_table.get(table).map(Vec::as_slice)
    }

    /// Table id of a column list
    pub fn table_id(&self, columns: &[Column]) -> TableId {
        self.keys.resolve(columns)
    }

    pub fn table_count(&self) -> usize {
        self.by_table.len()
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn map(&self, table: &TableId, key: &[u8]) -> Result<Arc<dyn SortedMap>> {
        self.provider
            .get(table, key, Partition::Current)?
            .ok_or_else(|| StoreError::Storage(format!("table {} is not prepared", table)))
    }
}

impl StorageEngine for Engine {
    fn put(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>> {
        let entry = Entry::new(values);
        let mut applied = Vec::new();

        for definition in &self.definitions {
            if !entry.contains_field_values(definition.key_columns())
                || !entry.contains_field_values(definition.value_columns())
            {
                continue;
            }

            let table = definition.table_id();
            let key = entry.to_bytes(definition.key_columns())?;
            let value = entry.to_bytes(definition.value_columns())?;
            self.map(&table, &key)?.put(key.clone(), value.clone())?;

            trace!(%table, definition = %definition, key_len = key.len(), value_len = value.len(), "put");
            applied.push(MapKeyValue {
                table,
                definition: definition.clone(),
                key,
                value: Some(value),
            });
        }
        Ok(applied)
    }

    fn remove(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>> {
        let entry = Entry::new(values);
        let mut applied = Vec::new();

        for definition in &self.definitions {
            if !entry.contains_fields(definition.key_columns()) {
                continue;
            }

            let table = definition.table_id();
            let key = entry.to_bytes(definition.key_columns())?;
            self.map(&table, &key)?.remove(&key)?;

            trace!(%table, definition = %definition, key_len = key.len(), "remove");
            applied.push(MapKeyValue {
                table,
                definition: definition.clone(),
                key,
                value: None,
            });
        }
        Ok(applied)
    }

    fn get(&self, values: &[FieldValue]) -> Result<Option<Entry>> {
        let columns: Vec<Column> = values.iter().map(Column::from).collect();
        let table = self.keys.resolve(&columns);
        let Some(definitions) = self.by_table.get(&table) else {
            return Ok(None);
        };

        // The result carries the caller's own key fields
        let key_entry = Entry::new(values);
        let key = key_entry.to_bytes(&columns)?;
        match self.map(&table, &key)?.get(&key)? {
            Some(value) => Ok(Some(decode_value(key_entry, &value, definitions)?)),
            None => Ok(None),
        }
    }

    fn iterate(
        &self,
        first: Option<&Entry>,
        last: Option<&Entry>,
        columns: &[Column],
    ) -> Result<Option<Entries>> {
        let table = self.keys.resolve(columns);
        let Some(definitions) = self.by_table.get(&table) else {
            return Ok(None);
        };

        let keys = RangeKeys::resolve(first, last, columns)?;
        let map = self.map(&table, &keys.from)?;
        trace!(%table, from = ?keys.from, to = ?keys.to, "iterate");
        Ok(Some(Entries::new(keys, map, definitions.clone())))
    }

    fn iterate_next(
        &self,
        subsequent: &[u8],
        first: Option<&Entry>,
        last: Option<&Entry>,
        columns: &[Column],
    ) -> Result<Continuation> {
        let table = self.keys.resolve(columns);
        let Some(definitions) = self.by_table.get(&table) else {
            return Ok(Continuation::Done);
        };

        let keys = RangeKeys::resolve(first, last, columns)?;
        let next = self.provider.get(
            &table,
            subsequent,
            Partition::Next {
                until: keys.to.as_deref(),
            },
        )?;
        let Some(map) = next else {
            return Ok(Continuation::Done);
        };

        trace!(%table, region_start = ?map.region_start(), "iterate next partition");
        Ok(Continuation::More(Entries::new(keys, map, definitions.clone())))
    }

    fn read(&self, blob: &Blob) -> Result<BlobReader> {
        self.blobs.read(blob)
    }

    fn write(
        &self,
        input: &mut dyn Read,
        from: StreamEncoding,
        to: StreamEncoding,
    ) -> Result<Blob> {
        self.blobs.write(input, from, to)
    }
}
