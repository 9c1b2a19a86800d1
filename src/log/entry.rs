//! Log entry definitions
//!
//! Defines the structure of individual log records and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Header size: LSN (8) + CRC (4) + LEN (4)
pub const HEADER_SIZE: usize = 16;

/// A single record in the operation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation that was applied
    pub operation: Operation,

    /// Timestamp (unix millis) when the record was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Remove a key
    Remove { key: Vec<u8> },
}

impl Operation {
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Remove { key } => key,
        }
    }
}

impl LogEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Frame this entry: header followed by the bincode payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        let len = u32::try_from(data.len()).map_err(|_| {
            StoreError::Serialization(format!("log record of {} bytes is too large", data.len()))
        })?;

        let mut framed = Vec::with_capacity(HEADER_SIZE + data.len());
        framed.extend_from_slice(&self.lsn.to_le_bytes());
        framed.extend_from_slice(&crc32fast::hash(&data).to_le_bytes());
        framed.extend_from_slice(&len.to_le_bytes());
        framed.extend_from_slice(&data);
        Ok(framed)
    }

    /// Decode and validate a payload against its header fields
    pub fn decode(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(data);
        if actual != crc {
            return Err(StoreError::LogCorruption(format!(
                "CRC mismatch at LSN {}: expected {:08x}, got {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: LogEntry = bincode::deserialize(data)?;
        if entry.lsn != lsn {
            return Err(StoreError::LogCorruption(format!(
                "header LSN {} does not match record LSN {}",
                lsn, entry.lsn
            )));
        }
        Ok(entry)
    }
}
