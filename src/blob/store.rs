//! Blob store
//!
//! ## Concurrency
//! - Writes are serialized by `write_lock`
//! - The volume list is behind an RwLock held only to place or look up
//!   bytes, never across a read of the input stream
//! - Sealed blocks are immutable `Bytes`; a `BlobReader` holds its own
//!   handles to them and needs no lock
//! - A failed write discards its unsealed block, so the next write never
//!   sees stale bytes in a volume tail

use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Read};

use bytes::{Buf, Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::{
    pack_address, unpack_address, Blob, Block, BlockDigest, DigestReader, StreamDigest,
    StreamEncoding, BLOCK_ALIGNMENT,
};
use crate::config::Config;
use crate::error::{Result, StoreError};

/// Room a volume must have beyond its padding to take a new block
const MIN_REMAINING: usize = 1;

struct Volume {
    /// Sealed blocks by starting offset
    blocks: BTreeMap<usize, Bytes>,

    /// Bytes of the block being written
    tail: BytesMut,

    /// Write cursor (padding included)
    position: usize,
}

impl Volume {
    fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            tail: BytesMut::new(),
            position: 0,
        }
    }

    fn padding(&self) -> usize {
        (BLOCK_ALIGNMENT - self.position % BLOCK_ALIGNMENT) % BLOCK_ALIGNMENT
    }
}

/// Block being filled by the current write
struct OpenBlock {
    volume: usize,
    offset: usize,
    digest: BlockDigest,
}

/// Volume-backed store of byte streams
pub struct BlobStore {
    volume_size: usize,
    buffer_size: usize,
    compression_level: i32,

    /// Volumes in index order, append-only
    volumes: RwLock<Vec<Volume>>,

    /// Serializes writes
    write_lock: Mutex<()>,
}

impl BlobStore {
    pub fn new(config: &Config) -> Self {
        Self {
            volume_size: config.volume_size,
            buffer_size: config.stream_buffer_size,
            compression_level: config.compression_level,
            volumes: RwLock::new(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn volume_count(&self) -> usize {
        self.volumes.read().len()
    }

    /// Store a stream
    ///
    /// When `from != to` the input is decoded (unless it is already
    /// unencoded) and re-encoded as `to`. When they match the bytes are
    /// stored as-is. Either way the blob's size and stream digest describe
    /// the unencoded content.
    pub fn write(&self, input: &mut dyn Read, from: StreamEncoding, to: StreamEncoding) -> Result<Blob> {
        let _write_guard = self.write_lock.lock();
        let mut writer = BlockWriter {
            store: self,
            open: None,
            blocks: Vec::new(),
        };
        let mut chunk = vec![0u8; self.buffer_size];

        let digest = if from == to {
            // Pass-through: digest the decoded form on the side
            let mut reader = DigestReader::new(input, from)?;
            loop {
                let n = read_some(&mut reader, &mut chunk)?;
                if n == 0 {
                    break;
                }
                writer.append(&chunk[..n])?;
            }
            reader.finish()?
        } else {
            let mut decoded = from.decoder(Box::new(input))?;
            let mut encoder = to.encoder(self.compression_level)?;
            let mut digest = StreamDigest::new();
            loop {
                let n = read_some(&mut decoded, &mut chunk)?;
                if n == 0 {
                    break;
                }
                digest.update(&chunk[..n]);
                encoder.write(&chunk[..n])?;
                writer.append(&encoder.take())?;
            }
            writer.append(&encoder.finish()?)?;
            digest
        };

        writer.seal()?;
        let size = digest.size();
        let blocks = std::mem::take(&mut writer.blocks);
        let blob = Blob::new(blocks, size, Some(digest.finish()), to);
        debug!(size, blocks = blob.blocks().len(), encoding = ?to, "blob written");
        Ok(blob)
    }

    /// Stored bytes of a blob, block by block
    pub fn read(&self, blob: &Blob) -> Result<BlobReader> {
        let volumes = self.volumes.read();
        let mut views = VecDeque::with_capacity(blob.blocks().len());

        for block in blob.blocks() {
            let (index, offset) = unpack_address(block.address);
            let view = volumes
                .get(index)
                .and_then(|v| v.blocks.get(&offset))
                .ok_or_else(|| {
                    StoreError::InvalidBlock(format!(
                        "no block at volume {} offset {}",
                        index, offset
                    ))
                })?;
            if view.len() != block.size as usize {
                return Err(StoreError::InvalidBlock(format!(
                    "block at volume {} offset {} holds {} bytes, blob expects {}",
                    index,
                    offset,
                    view.len(),
                    block.size
                )));
            }
            views.push_back(view.clone());
        }
        Ok(BlobReader { views })
    }

    /// Volume index and aligned offset for a new block
    fn open_block(&self) -> Result<OpenBlock> {
        let mut volumes = self.volumes.write();

        let found = volumes
            .iter()
            .position(|v| self.volume_size - v.position > MIN_REMAINING + v.padding());
        let index = match found {
            Some(index) => index,
            None => {
                volumes.push(Volume::new());
                trace!(volume = volumes.len() - 1, "allocated volume");
                volumes.len() - 1
            }
        };

        let volume = &mut volumes[index];
        volume.position += volume.padding();
        let offset = volume.position;
        pack_address(index, offset)?;
        Ok(OpenBlock {
            volume: index,
            offset,
            digest: BlockDigest::new(),
        })
    }
}

/// Per-write state: the open block and the blocks sealed so far
struct BlockWriter<'a> {
    store: &'a BlobStore,
    open: Option<OpenBlock>,
    blocks: Vec<Block>,
}

impl BlockWriter<'_> {
    /// Place encoded bytes, sealing and opening blocks as volumes fill
    fn append(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let mut open = match self.open.take() {
                Some(open) => open,
                None => self.store.open_block()?,
            };

            let written = {
                let mut volumes = self.store.volumes.write();
                let volume = &mut volumes[open.volume];
                let room = self.store.volume_size - volume.position;
                let n = room.min(data.len());
                volume.tail.extend_from_slice(&data[..n]);
                volume.position += n;
                n
            };

            open.digest.update(&data[..written]);
            data = &data[written..];
            self.open = Some(open);

            if written == 0 || self.volume_full() {
                self.seal()?;
            }
        }
        Ok(())
    }

    fn volume_full(&self) -> bool {
        match &self.open {
            Some(open) => self.store.volumes.read()[open.volume].position >= self.store.volume_size,
            None => false,
        }
    }

    /// Close the open block, if it holds any bytes
    fn seal(&mut self) -> Result<()> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };

        let bytes = {
            let mut volumes = self.store.volumes.write();
            let volume = &mut volumes[open.volume];
            let bytes = volume.tail.split().freeze();
            if !bytes.is_empty() {
                volume.blocks.insert(open.offset, bytes.clone());
            }
            bytes
        };
        if bytes.is_empty() {
            return Ok(());
        }

        let address = pack_address(open.volume, open.offset)?;
        trace!(volume = open.volume, offset = open.offset, len = bytes.len(), "sealed block");
        self.blocks.push(Block {
            address,
            size: bytes.len() as u32,
            hash: Some(open.digest.finish()),
        });
        Ok(())
    }
}

impl Drop for BlockWriter<'_> {
    /// A write that failed part way leaves its open block unsealed; drop its
    /// bytes so the next block starts clean. Blocks it already sealed stay
    /// in place, unreferenced.
    fn drop(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };

        let mut volumes = self.store.volumes.write();
        if let Some(volume) = volumes.get_mut(open.volume) {
            let discarded = volume.tail.len();
            volume.tail.clear();
            volume.position = open.offset;
            debug!(volume = open.volume, offset = open.offset, discarded, "discarded unsealed block");
        }
    }
}

/// Stored bytes of a blob
///
/// Iterates one `Bytes` view per block, or reads as a continuous stream.
#[derive(Debug, Clone, Default)]
pub struct BlobReader {
    views: VecDeque<Bytes>,
}

impl BlobReader {
    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.views.iter().map(Bytes::len).sum()
    }

    /// Collect the rest into one buffer
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.remaining());
        for view in &self.views {
            out.extend_from_slice(view);
        }
        out
    }

    /// Reader over the decoded content
    pub fn decoded(self, encoding: StreamEncoding) -> Result<Box<dyn Read>> {
        encoding.decoder(Box::new(self))
    }
}

impl Iterator for BlobReader {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        self.views.pop_front()
    }
}

impl Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let Some(front) = self.views.front_mut() {
            if front.is_empty() {
                self.views.pop_front();
                continue;
            }
            let n = front.len().min(buf.len());
            buf[..n].copy_from_slice(&front[..n]);
            front.advance(n);
            return Ok(n);
        }
        Ok(0)
    }
}

/// Read until `buf` is full or the input ends
fn read_some(input: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
