//! Operation Log Module
//!
//! Per-table append-only record of applied writes and deletes.
//!
//! ## Responsibilities
//! - Append one record per applied operation
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Replay on open, truncating a torn tail
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! All header integers are little-endian; `Data` is the bincode encoding of
//! a [`LogEntry`] and the CRC covers `Data` only.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{LogEntry, Operation, HEADER_SIZE};
pub use reader::{LogIterator, LogReader};
pub use recovery::{LogRecovery, RecoveryResult};
pub use writer::LogWriter;
