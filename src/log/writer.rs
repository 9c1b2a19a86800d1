//! Log Writer
//!
//! Appends framed records to a log file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::trace;

use super::{LogEntry, LogReader, Operation};
use crate::config::SyncStrategy;
use crate::error::Result;

/// Writes records to a log file
pub struct LogWriter {
    writer: BufWriter<File>,

    /// LSN the next record will carry
    current_lsn: u64,

    sync_strategy: SyncStrategy,

    /// Records appended since the last sync
    unsynced: usize,
}

impl LogWriter {
    /// Open or create a log file, continuing after its last record
    ///
    /// The file is expected to be intact (see `LogRecovery::recover`).
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut last_lsn = 0;
        if path.exists() {
            let mut reader = LogReader::open(path)?;
            while let Some(entry) = reader.next_entry()? {
                last_lsn = entry.lsn;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            current_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append an operation, returning its LSN
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.current_lsn;
        let framed = LogEntry::new(lsn, operation).encode()?;
        self.writer.write_all(&framed)?;
        self.current_lsn += 1;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }

        trace!(lsn, len = framed.len(), "log append");
        Ok(lsn)
    }

    /// Force buffered records to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the LSN the next record will carry
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.sync();
    }
}
