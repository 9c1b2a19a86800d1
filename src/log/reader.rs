//! Log Reader
//!
//! Reads framed records from a log file, front to back.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::{LogEntry, HEADER_SIZE};
use crate::error::{Result, StoreError};

/// Reads records from a log file
pub struct LogReader {
    reader: BufReader<File>,

    file_len: u64,

    /// Byte offset just past the last complete record
    position: u64,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            file_len,
            position: 0,
        })
    }

    /// Offset just past the last record returned
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next record
    ///
    /// `Ok(None)` at a clean end of file; `LogCorruption` for a torn or
    /// damaged record.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => {
                return Err(StoreError::LogCorruption(format!(
                    "partial header at offset {} ({} of {} bytes)",
                    self.position, n, HEADER_SIZE
                )))
            }
            _ => {}
        }

        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&header[0..8]);
        crc.copy_from_slice(&header[8..12]);
        len.copy_from_slice(&header[12..16]);
        let lsn = u64::from_le_bytes(lsn);
        let crc = u32::from_le_bytes(crc);
        let len = u32::from_le_bytes(len) as usize;

        let end = self.position + (HEADER_SIZE + len) as u64;
        if end > self.file_len {
            return Err(StoreError::LogCorruption(format!(
                "record at offset {} claims {} bytes, file ends at {}",
                self.position, len, self.file_len
            )));
        }

        let mut data = vec![0u8; len];
        let read = read_full(&mut self.reader, &mut data)?;
        if read < len {
            return Err(StoreError::LogCorruption(format!(
                "partial record at offset {} ({} of {} bytes)",
                self.position, read, len
            )));
        }

        let entry = LogEntry::decode(lsn, crc, &data)?;
        self.position += (HEADER_SIZE + len) as u64;
        Ok(Some(entry))
    }

    /// Iterate over all records, stopping after the first error
    pub fn entries(self) -> LogIterator {
        LogIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over log records
pub struct LogIterator {
    reader: LogReader,
    done: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows, returning the bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
