//! Disk engine
//!
//! Reference engine over a `DiskMapProvider`. Each operation the inner
//! engine applies is appended to its table's log before the call returns.
//! Writes are serialized so log order matches apply order.

use std::io::Read;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Continuation, Engine, Entries, MapKeyValue, StorageEngine};
use crate::blob::{Blob, BlobReader, StreamEncoding};
use crate::config::Config;
use crate::definition::Definition;
use crate::entry::Entry;
use crate::error::Result;
use crate::field::{Column, FieldValue};
use crate::provider::DiskMapProvider;

pub struct DiskEngine {
    inner: Engine,
    disk: Arc<DiskMapProvider>,

    /// Serializes put/remove
    write_lock: Mutex<()>,
}

impl DiskEngine {
    /// Open or create an engine under `config.data_dir`
    ///
    /// Every table named by `definitions` is replayed from its log.
    pub fn open(config: Config, definitions: Vec<Definition>) -> Result<Self> {
        let disk = Arc::new(DiskMapProvider::open(&config)?);
        let inner = Engine::with_provider(config, disk.clone(), definitions)?;
        Ok(Self {
            inner,
            disk,
            write_lock: Mutex::new(()),
        })
    }

    /// The wrapped reference engine
    pub fn engine(&self) -> &Engine {
        &self.inner
    }

    pub fn provider(&self) -> &DiskMapProvider {
        &self.disk
    }

    /// Force every table log to disk
    pub fn sync(&self) -> Result<()> {
        self.disk.sync()
    }

    fn log_all(&self, applied: &[MapKeyValue]) -> Result<()> {
        for op in applied {
            self.disk.append(op)?;
        }
        Ok(())
    }
}

impl StorageEngine for DiskEngine {
    fn put(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>> {
        let _write_guard = self.write_lock.lock();
        let applied = self.inner.put(values)?;
        self.log_all(&applied)?;
        Ok(applied)
    }

    fn remove(&self, values: &[FieldValue]) -> Result<Vec<MapKeyValue>> {
        let _write_guard = self.write_lock.lock();
        let applied = self.inner.remove(values)?;
        self.log_all(&applied)?;
        Ok(applied)
    }

    fn get(&self, values: &[FieldValue]) -> Result<Option<Entry>> {
        self.inner.get(values)
    }

    fn iterate(
        &self,
        first: Option<&Entry>,
        last: Option<&Entry>,
        columns: &[Column],
    ) -> Result<Option<Entries>> {
        self.inner.iterate(first, last, columns)
    }

    fn iterate_next(
        &self,
        subsequent: &[u8],
        first: Option<&Entry>,
        last: Option<&Entry>,
        columns: &[Column],
    ) -> Result<Continuation> {
        self.inner.iterate_next(subsequent, first, last, columns)
    }

    fn read(&self, blob: &Blob) -> Result<BlobReader> {
        self.inner.read(blob)
    }

    fn write(
        &self,
        input: &mut dyn Read,
        from: StreamEncoding,
        to: StreamEncoding,
    ) -> Result<Blob> {
        self.inner.write(input, from, to)
    }
}
