//! Log Recovery
//!
//! Reads back a log after a crash, keeping the valid prefix.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::{info, warn};

use super::{LogEntry, LogReader};
use crate::error::{Result, StoreError};

/// Handles log recovery after a crash
pub struct LogRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted records found (recovery stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN (0 when the log is empty)
    pub last_lsn: u64,

    /// Byte length of the valid prefix
    pub valid_len: u64,

    /// Whether the file was truncated (torn tail removed)
    pub was_truncated: bool,
}

impl LogRecovery {
    /// Recover records from a log file
    ///
    /// Reads every valid record in order, then truncates the file after the
    /// last one if a partial or corrupted record follows it.
    pub fn recover(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let (entries, mut result) = Self::scan(path)?;

        if result.entries_corrupted > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;
            warn!(
                path = %path.display(),
                valid_len = result.valid_len,
                "truncated corrupted log tail"
            );
        }

        if result.entries_recovered > 0 || result.was_truncated {
            info!(
                path = %path.display(),
                recovered = result.entries_recovered,
                corrupted = result.entries_corrupted,
                last_lsn = result.last_lsn,
                "log recovery"
            );
        }
        Ok((entries, result))
    }

    /// Verify integrity of a log file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Ok(Self::scan(path)?.1)
    }

    fn scan(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let mut reader = LogReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(StoreError::LogCorruption(reason)) | Err(StoreError::Serialization(reason)) => {
                    warn!(path = %path.display(), offset = reader.position(), %reason, "corrupted log record");
                    result.entries_corrupted = 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        result.valid_len = reader.position();
        Ok((entries, result))
    }
}
