//! Sorted table implementation
//!
//! BTreeMap-based sorted byte map with RwLock for concurrency.
//!
//! ## Concurrency
//! - Reads take the read lock (many concurrent readers)
//! - Writes take the write lock for a single insert or remove
//! - Cursors hold no lock between steps: every step re-seeks strictly after
//!   the last key returned, so writes may interleave with a scan

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::provider::{MapCursor, SortedMap};

/// In-memory sorted byte map, ordered by the byte comparator
pub struct SortedTable {
    /// Keys and values (`Ord for Vec<u8>` is the byte comparator)
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,

    /// Approximate size in bytes (keys + values)
    size: AtomicUsize,
}

impl SortedTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair (write lock), returning the previous value
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Option<Vec<u8>> {
        let added = key.len() + value.len();
        let key_len = key.len();
        let previous = self.data.write().insert(key, value);

        self.size.fetch_add(added, Ordering::Relaxed);
        if let Some(old) = &previous {
            self.size.fetch_sub(key_len + old.len(), Ordering::Relaxed);
        }
        previous
    }

    /// Remove a key (write lock), returning the removed value
    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        let removed = self.data.write().remove(key);
        if let Some(old) = &removed {
            self.size.fetch_sub(key.len() + old.len(), Ordering::Relaxed);
        }
        removed
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Cursor over `[from, to)`; `to == None` runs to the end of the table
    pub fn cursor(self: Arc<Self>, from: &[u8], to: Option<&[u8]>) -> TableCursor {
        TableCursor {
            table: self,
            next: Bound::Included(from.to_vec()),
            to: to.map(<[u8]>::to_vec),
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.data.write().clear();
        self.size.store(0, Ordering::Relaxed);
    }
}

impl Default for SortedTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SortedMap for SortedTable {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(SortedTable::get(self, key))
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        SortedTable::put(self, key, value);
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        SortedTable::remove(self, key);
        Ok(())
    }

    fn len(&self) -> usize {
        SortedTable::len(self)
    }

    fn scan(self: Arc<Self>, from: &[u8], to: Option<&[u8]>) -> MapCursor {
        Box::new(self.cursor(from, to))
    }
}

/// Lazy, forward-only cursor over a table range
pub struct TableCursor {
    table: Arc<SortedTable>,
    next: Bound<Vec<u8>>,
    to: Option<Vec<u8>>,
}

impl TableCursor {
    fn is_empty_range(&self) -> bool {
        let Some(to) = &self.to else {
            return false;
        };
        match &self.next {
            Bound::Included(from) => from >= to,
            Bound::Excluded(from) => from >= to,
            Bound::Unbounded => false,
        }
    }
}

impl Iterator for TableCursor {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        // BTreeMap::range panics on an inverted range
        if self.is_empty_range() {
            return None;
        }

        let upper = match &self.to {
            Some(to) => Bound::Excluded(to.as_slice()),
            None => Bound::Unbounded,
        };
        let lower = match &self.next {
            Bound::Included(k) => Bound::Included(k.as_slice()),
            Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };

        let (key, value) = {
            let data = self.table.data.read();
            let mut range = data.range::<[u8], _>((lower, upper));
            let (k, v) = range.next()?;
            (k.clone(), v.clone())
        };

        self.next = Bound::Excluded(key.clone());
        Some((key, value))
    }
}
