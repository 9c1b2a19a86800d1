//! Map Provider Module
//!
//! The boundary between the engines and whatever holds the sorted bytes.
//!
//! ## Contracts
//! - [`SortedMap`]: one table (or one partition of a table), ordered by the
//!   byte comparator, readable while it is being written
//! - [`MapProvider`]: hands out sorted maps by table id, creating tables on
//!   `prepare` and locating partitions on `get`
//!
//! ## Partitions
//! A provider may split one table into horizontal regions. `Partition::Current`
//! asks for the region holding a key; `Partition::Next { until }` asks for
//! the region after it, up to `until` (or the end of the table). Providers
//! without partitioning return `None` for `Next`. Later regions report their
//! `region_start`, so a scan can move past a region that holds no keys.

mod disk;
mod memory;

use std::sync::Arc;

use crate::error::Result;
use crate::key::TableId;

pub use disk::DiskMapProvider;
pub use memory::MemoryMapProvider;

/// Lazy, forward-only scan over a sorted map
pub type MapCursor = Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + Send>;

/// A sorted byte-key to byte-value map
pub trait SortedMap: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    fn remove(&self, key: &[u8]) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest key this map can hold, when it is one region of a partitioned
    /// table; `None` for a whole table or the first region
    fn region_start(&self) -> Option<Vec<u8>> {
        None
    }

    /// Scan `[from, to)` in ascending key order; `to == None` is unbounded
    fn scan(self: Arc<Self>, from: &[u8], to: Option<&[u8]>) -> MapCursor;
}

/// Which region of a table `MapProvider::get` should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition<'a> {
    /// The region containing the key
    Current,

    /// The region following the one containing the key
    Next { until: Option<&'a [u8]> },
}

/// Source of sorted maps, one per table
pub trait MapProvider: Send + Sync {
    /// Ensure the table exists; repeated calls are no-ops
    fn prepare(&self, table: &TableId) -> Result<()>;

    /// Locate the map for `key` in the requested region, if any
    fn get(
        &self,
        table: &TableId,
        key: &[u8],
        partition: Partition<'_>,
    ) -> Result<Option<Arc<dyn SortedMap>>>;
}
