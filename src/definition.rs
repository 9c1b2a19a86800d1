//! Definition Module
//!
//! A `Definition` pairs an ordered key layout with an ordered value layout.
//! The key layout fixes the physical table (see [`crate::key`]); several
//! definitions may share a table while describing different value shapes.
//!
//! ## Structural Dispatch
//! Stored values carry no type tag. On read, each definition registered for
//! the table is tried in registration order and the first whose value
//! layout consumes the bytes exactly, with every column decodable and every
//! embedded literal equal to the stored one, decodes the record.

use std::fmt;
use std::sync::Arc;

use crate::entry::Entry;
use crate::error::{Result, StoreError};
use crate::field::layout::span;
use crate::field::Column;
use crate::key::{table_id, TableId};

/// A (key layout, value layout) schema bound to one table
#[derive(Clone)]
pub struct Definition {
    name: Option<String>,
    key: Vec<Column>,
    value: Vec<Column>,
    table: TableId,
}

impl Definition {
    pub fn new(key: Vec<Column>, value: Vec<Column>) -> Self {
        let table = table_id(&key);
        Self {
            name: None,
            key,
            value,
            table,
        }
    }

    pub fn named(name: impl Into<String>, key: Vec<Column>, value: Vec<Column>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(key, value)
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn key_columns(&self) -> &[Column] {
        &self.key
    }

    pub fn value_columns(&self) -> &[Column] {
        &self.value
    }

    pub fn table_id(&self) -> TableId {
        self.table
    }

    /// Whether `bytes` has the shape of this definition's value layout
    pub fn matches_value(&self, bytes: &[u8]) -> bool {
        let mut position = 0;

        for (i, column) in self.value.iter().enumerate() {
            let is_last = i + 1 == self.value.len();
            let Some(located) = span(bytes, position, column.size(), is_last) else {
                return false;
            };

            // Every column must decode, and literals must equal the stored value
            let Ok(stored) = column.field().decode(&bytes[located.start..located.end()]) else {
                return false;
            };
            if column.literal().is_some_and(|literal| *literal != stored) {
                return false;
            }
            position = located.next;
        }

        position == bytes.len()
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("table", &self.table)
            .finish()
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "definition@{}", self.table),
        }
    }
}

/// First definition whose value layout matches `bytes`
pub fn dispatch<'a>(
    bytes: &[u8],
    definitions: &'a [Arc<Definition>],
) -> Option<(usize, &'a Arc<Definition>)> {
    definitions
        .iter()
        .enumerate()
        .find(|(_, definition)| definition.matches_value(bytes))
}

/// Decode a stored key/value pair against the definitions of its table
///
/// Key fields are decoded with the first definition's key layout.
pub fn decode_record(key: &[u8], value: &[u8], definitions: &[Arc<Definition>]) -> Result<Entry> {
    let first = definitions
        .first()
        .ok_or_else(|| StoreError::Storage("table has no definitions".to_string()))?;
    let key_entry = Entry::decode(key, first.key_columns())?;
    decode_value(key_entry, value, definitions)
}

/// Merge an already known key entry with the decoded stored value
///
/// Falls back to the key fields alone when no value layout matches.
pub fn decode_value(key_entry: Entry, value: &[u8], definitions: &[Arc<Definition>]) -> Result<Entry> {
    match dispatch(value, definitions) {
        Some((_, definition)) => {
            let value_entry = Entry::decode(value, definition.value_columns())?;
            Ok(Entry::merge(&key_entry, &value_entry))
        }
        None => {
            tracing::trace!(definitions = definitions.len(), "value matches no definition, returning key fields");
            Ok(key_entry)
        }
    }
}
