//! Store client
//!
//! Thin wrapper over any [`StorageEngine`] that hides partitioning: a scan
//! runs `iterate`, then `iterate_next` after each exhausted partition, until
//! the engine reports `Done`. Each continuation starts from the last key
//! yielded, or from the start of a partition that yielded nothing.

use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::blob::{Blob, BlobReader, StreamEncoding};
use crate::engine::{Continuation, Entries, MapKeyValue, StorageEngine};
use crate::entry::Entry;
use crate::error::Result;
use crate::field::{Column, FieldValue};

#[derive(Clone)]
pub struct Store {
    engine: Arc<dyn StorageEngine>,
}

impl Store {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }

    pub fn put(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>> {
        self.engine.put(values)
    }

    pub fn remove(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>> {
        self.engine.remove(values)
    }

    pub fn get(&self, values: &[FieldValue]) -> Result<Option<Entry>> {
        self.engine.get(values)
    }

    /// Scan across every partition
    ///
    /// `None` when no table is registered for `columns`.
    pub fn iterate(
        &self,
        first: Option<Entry>,
        last: Option<Entry>,
        columns: Vec<Column>,
    ) -> Result<Option<EntryIteration>> {
        let Some(current) = self.engine.iterate(first.as_ref(), last.as_ref(), &columns)? else {
            return Ok(None);
        };
        Ok(Some(EntryIteration {
            engine: self.engine.clone(),
            first,
            last,
            columns,
            current: Some(current),
            resumed_from: None,
        }))
    }

    /// Scan the whole range the columns can encode
    pub fn iterate_all(&self, columns: Vec<Column>) -> Result<Option<EntryIteration>> {
        self.iterate(None, None, columns)
    }

    pub fn read(&self, blob: &Blob) -> Result<BlobReader> {
        self.engine.read(blob)
    }

    pub fn write(
        &self,
        input: &mut dyn Read,
        from: StreamEncoding,
        to: StreamEncoding,
    ) -> Result<Blob> {
        self.engine.write(input, from, to)
    }
}

/// One continuous ascending scan over all partitions of a table
pub struct EntryIteration {
    engine: Arc<dyn StorageEngine>,
    first: Option<Entry>,
    last: Option<Entry>,
    columns: Vec<Column>,
    current: Option<Entries>,

    /// Key the last `iterate_next` was asked to continue from
    resumed_from: Option<Vec<u8>>,
}

impl EntryIteration {
    fn advance(&mut self, exhausted: &Entries) -> Result<Option<Entries>> {
        let subsequent = match (exhausted.resume_key(), &self.resumed_from) {
            (Some(key), _) => key.to_vec(),
            // The first partition holds the scan start
            (None, None) => exhausted.from_key().to_vec(),
            (None, Some(_)) => {
                debug!("empty partition without a start key, ending scan");
                return Ok(None);
            }
        };
        if self.resumed_from.as_deref() == Some(subsequent.as_slice()) {
            debug!(key = ?subsequent, "partition lookup made no progress, ending scan");
            return Ok(None);
        }

        let next = self.engine.iterate_next(
            &subsequent,
            self.first.as_ref(),
            self.last.as_ref(),
            &self.columns,
        )?;
        self.resumed_from = Some(subsequent);
        Ok(match next {
            Continuation::More(entries) => Some(entries),
            Continuation::Done => None,
        })
    }
}

impl Iterator for EntryIteration {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self.current.as_mut()?;
            if let Some(item) = current.next() {
                return Some(item);
            }

            let exhausted = self.current.take()?;
            match self.advance(&exhausted) {
                Ok(next) => self.current = next,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
