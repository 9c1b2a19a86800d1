//! Key identity
//!
//! A table is addressed by the ordered list of its key fields. The table id
//! is a name-based (v5) UUID over the concatenated field UUIDs, so the same
//! fields in the same order always land in the same table, and reordering
//! them names a different one.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::field::{Column, Field};

/// Namespace under which table ids are derived
pub const NS_KEY: Uuid = Uuid::from_u128(0x0328f4af_e43e_41f0_a727_a9fc10c21504);

/// Physical table identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(Uuid);

impl TableId {
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for TableId {
    fn from(uuid: Uuid) -> Self {
        TableId(uuid)
    }
}

/// Derive the table id of an ordered column list
pub fn table_id(columns: &[Column]) -> TableId {
    let mut name = Vec::with_capacity(columns.len() * 16);
    for column in columns {
        name.extend_from_slice(column.field().uuid().as_bytes());
    }
    TableId(Uuid::new_v5(&NS_KEY, &name))
}

/// Table ids of every registered key layout, keyed by field identity
#[derive(Debug, Default)]
pub struct KeyRegistry {
    ids: HashMap<Vec<Field>, TableId>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the id of a key layout and return it
    pub fn register(&mut self, columns: &[Column]) -> TableId {
        let id = table_id(columns);
        self.ids.insert(fields_of(columns), id);
        id
    }

    /// Id of a column list; unregistered lists are hashed without caching
    pub fn resolve(&self, columns: &[Column]) -> TableId {
        self.ids
            .get(&fields_of(columns))
            .copied()
            .unwrap_or_else(|| table_id(columns))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn fields_of(columns: &[Column]) -> Vec<Field> {
    columns.iter().map(|c| c.field().clone()).collect()
}
