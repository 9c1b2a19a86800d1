//! Engine Module
//!
//! The storage-engine contract and its implementations.
//!
//! ## Responsibilities
//! - Route field values to every matching `Definition` (multi-index fan-out)
//! - Apply writes and deletes to per-table sorted maps
//! - Resolve range bounds and decode scanned records
//! - Continue a scan across horizontal partitions
//! - Store and read blobs
//!
//! ## Implementations
//! - [`Engine`]: reference engine over any `MapProvider` (in-memory by default)
//! - [`DiskEngine`]: `Engine` over a `DiskMapProvider`, logging every applied operation

mod disk;
mod reference;

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use crate::blob::{Blob, BlobReader, StreamEncoding};
use crate::definition::{decode_record, Definition};
use crate::entry::Entry;
use crate::error::Result;
use crate::field::{Column, FieldValue};
use crate::key::TableId;
use crate::provider::{MapCursor, SortedMap};

pub use disk::DiskEngine;
pub use reference::Engine;

/// Contract every storage backend implements
pub trait StorageEngine: Send + Sync {
    /// Write the input into every definition it satisfies
    fn put(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>>;

    /// Delete the input's key from every definition whose key fields it carries
    fn remove(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>>;

    /// Look up the record keyed by the input, in input field order
    fn get(&self, values: &[FieldValue]) -> Result<Option<Entry>>;

    /// Scan the table keyed by `columns`
    ///
    /// `None` when no definition is registered for that key layout.
    fn iterate(
        &self,
        first: Option<&Entry>,
        last: Option<&Entry>,
        columns: &[Column],
    ) -> Result<Option<Entries>>;

    /// Scan the partition after the one holding `subsequent`
    fn iterate_next(
        &self,
        subsequent: &[u8],
        first: Option<&Entry>,
        last: Option<&Entry>,
        columns: &[Column],
    ) -> Result<Continuation>;

    /// Stream the stored bytes of a blob
    fn read(&self, blob: &Blob) -> Result<BlobReader>;

    /// Store a byte stream, transcoding from `from` to `to`
    fn write(&self, input: &mut dyn Read, from: StreamEncoding, to: StreamEncoding)
        -> Result<Blob>;
}

/// A write or delete applied to one table
#[derive(Debug, Clone)]
pub struct MapKeyValue {
    pub table: TableId,
    pub definition: Arc<Definition>,
    pub key: Vec<u8>,
    /// `None` for a delete
    pub value: Option<Vec<u8>>,
}

impl MapKeyValue {
    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}

/// Outcome of asking for the next partition of a scan
pub enum Continuation {
    More(Entries),
    Done,
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::More(entries) => f.debug_tuple("More").field(entries).finish(),
            Continuation::Done => f.write_str("Done"),
        }
    }
}

/// Resolved scan bounds: `[from, to)`, `to == None` is unbounded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeKeys {
    pub from: Vec<u8>,
    pub to: Option<Vec<u8>>,
}

impl RangeKeys {
    /// Turn logical bounds into row keys
    ///
    /// - neither bound: the whole range the columns can encode
    /// - both: from `first` (inclusive) through `last` (inclusive)
    /// - only `last`: everything strictly after `last`
    /// - only `first`: everything strictly before `first`
    pub fn resolve(first: Option<&Entry>, last: Option<&Entry>, columns: &[Column]) -> Result<Self> {
        let open = Entry::default();
        let keys = match (first, last) {
            (None, None) => Self {
                from: open.lower_bound(columns)?,
                to: open.upper_bound(columns)?,
            },
            (Some(first), Some(last)) => Self {
                from: first.lower_bound(columns)?,
                to: last.upper_bound(columns)?,
            },
            (None, Some(last)) => match last.upper_bound(columns)? {
                Some(from) => Self {
                    from,
                    to: open.upper_bound(columns)?,
                },
                // Nothing sorts after `last`
                None => Self::empty(),
            },
            (Some(first), None) => Self {
                from: open.lower_bound(columns)?,
                to: Some(first.lower_bound(columns)?),
            },
        };
        Ok(keys)
    }

    /// A range containing no key
    pub fn empty() -> Self {
        Self {
            from: Vec::new(),
            to: Some(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.to, Some(to) if *to <= self.from)
    }
}

/// Lazy, ascending sequence of decoded records from one partition
pub struct Entries {
    from_key: Vec<u8>,
    to_key: Option<Vec<u8>>,
    cursor: MapCursor,
    definitions: Vec<Arc<Definition>>,
    last_key: Option<Vec<u8>>,
    region_start: Option<Vec<u8>>,
}

impl Entries {
    pub(crate) fn new(
        keys: RangeKeys,
        map: Arc<dyn SortedMap>,
        definitions: Vec<Arc<Definition>>,
    ) -> Self {
        let region_start = map.region_start();
        let cursor = map.scan(&keys.from, keys.to.as_deref());
        Self {
            from_key: keys.from,
            to_key: keys.to,
            cursor,
            definitions,
            last_key: None,
            region_start,
        }
    }

    /// Inclusive start row key of the scan
    pub fn from_key(&self) -> &[u8] {
        &self.from_key
    }

    /// Exclusive stop row key of the scan, `None` if unbounded
    pub fn to_key(&self) -> Option<&[u8]> {
        self.to_key.as_deref()
    }

    /// Row key of the last record yielded
    pub fn last_key(&self) -> Option<&[u8]> {
        self.last_key.as_deref()
    }

    /// First key of the partition being scanned, if the provider reports one
    pub fn region_start(&self) -> Option<&[u8]> {
        self.region_start.as_deref()
    }

    /// Key inside this partition from which the next one can be located
    ///
    /// `None` when nothing was yielded and the partition start is unknown.
    pub fn resume_key(&self) -> Option<&[u8]> {
        self.last_key().or(self.region_start())
    }
}

impl Iterator for Entries {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.cursor.next()?;
        let entry = decode_record(&key, &value, &self.definitions);
        self.last_key = Some(key);
        Some(entry)
    }
}

impl fmt::Debug for Entries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entries")
            .field("from_key", &self.from_key)
            .field("to_key", &self.to_key)
            .field("last_key", &self.last_key)
            .field("region_start", &self.region_start)
            .finish()
    }
}
