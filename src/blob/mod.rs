//! Blob Module
//!
//! Chunked, content-addressed storage for byte streams.
//!
//! ## Layout
//! Bytes live in fixed-capacity volumes. A write fills blocks: each block
//! starts on a 16-byte boundary of the first volume with room, and ends when
//! that volume is full or the stream is exhausted.
//! ```text
//! volume 0  ┌────────┬──┬──────────────┬──┬──────────────────┐
//!           │block a │▒▒│ block b      │▒▒│ block c ...      │
//!           └────────┴──┴──────────────┴──┴──────────────────┘
//!                     ▒▒ = padding to the next 16-byte offset
//! ```
//!
//! ## Addresses
//! ```text
//! 63            44 43                                       0
//! ┌───────────────┬──────────────────────────────────────────┐
//! │ volume (20)   │ offset / 16 (44)                         │
//! └───────────────┴──────────────────────────────────────────┘
//! ```
//!
//! ## Digests
//! - stream: `0x01` + SHA-256 of the unencoded bytes
//! - block: `0x02` + first 16 bytes of SHA-256 of the stored bytes
//!
//! ## Blob field encoding
//! ```text
//! size (8, BE) | encoding (1) | { address (8, BE) | length (4, BE) }*
//! ```
//! Digests are not part of the field encoding.

mod digest;
mod encoding;
mod store;

use crate::error::{Result, StoreError};

pub use digest::{BlockDigest, DigestReader, StreamDigest};
pub use encoding::{StreamEncoder, StreamEncoding};
pub use store::{BlobReader, BlobStore};

/// Algorithm tag of a stream digest (SHA-256)
pub const STREAM_DIGEST_TAG: u8 = 0x01;

/// Algorithm tag of a block digest (SHA-256 truncated to 128 bits)
pub const BLOCK_DIGEST_TAG: u8 = 0x02;

/// Block offsets are multiples of this
pub const BLOCK_ALIGNMENT: usize = 16;

const VOLUME_BITS: u32 = 20;
const OFFSET_BITS: u32 = 44;
const REFERENCE_HEADER: usize = 9;
const REFERENCE_BLOCK: usize = 12;

/// Pack a volume index and an aligned offset into a block address
pub fn pack_address(volume: usize, offset: usize) -> Result<u64> {
    if volume as u64 >= 1 << VOLUME_BITS {
        return Err(StoreError::InvalidBlock(format!(
            "volume index {} exceeds 20 bits",
            volume
        )));
    }
    if offset as u64 >= 1 << (OFFSET_BITS + 4) || offset % BLOCK_ALIGNMENT != 0 {
        return Err(StoreError::InvalidBlock(format!(
            "offset {} is not a 16-byte aligned 48-bit offset",
            offset
        )));
    }
    Ok(((volume as u64) << OFFSET_BITS) | (offset as u64 >> 4))
}

/// Split a block address into (volume index, byte offset)
pub fn unpack_address(address: u64) -> (usize, usize) {
    let volume = (address >> OFFSET_BITS) as usize;
    let offset = ((address & ((1 << OFFSET_BITS) - 1)) << 4) as usize;
    (volume, offset)
}

/// One stored chunk of a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub address: u64,
    pub size: u32,
    /// Tagged block digest; absent on blobs decoded from a field
    pub hash: Option<Vec<u8>>,
}

/// Reference to a stored byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    blocks: Vec<Block>,
    size: u64,
    hash: Option<Vec<u8>>,
    encoding: StreamEncoding,
}

impl Blob {
    pub fn new(blocks: Vec<Block>, size: u64, hash: Option<Vec<u8>>, encoding: StreamEncoding) -> Self {
        Self {
            blocks,
            size,
            hash,
            encoding,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Length of the unencoded stream
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Length of the stored (encoded) bytes
    pub fn stored_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.size as u64).sum()
    }

    /// Tagged stream digest; absent on blobs decoded from a field
    pub fn hash(&self) -> Option<&[u8]> {
        self.hash.as_deref()
    }

    /// Encoding of the stored bytes
    pub fn encoding(&self) -> StreamEncoding {
        self.encoding
    }

    /// Append the field encoding of this blob
    pub fn encode_reference(&self, out: &mut Vec<u8>) {
        out.reserve(REFERENCE_HEADER + self.blocks.len() * REFERENCE_BLOCK);
        out.extend_from_slice(&self.size.to_be_bytes());
        out.push(self.encoding.as_byte());
        for block in &self.blocks {
            out.extend_from_slice(&block.address.to_be_bytes());
            out.extend_from_slice(&block.size.to_be_bytes());
        }
    }

    /// Decode a blob from its field encoding
    pub fn decode_reference(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < REFERENCE_HEADER || (bytes.len() - REFERENCE_HEADER) % REFERENCE_BLOCK != 0 {
            return Err(StoreError::Malformed(format!(
                "blob reference of {} bytes",
                bytes.len()
            )));
        }

        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[..8]);
        let encoding = StreamEncoding::from_byte(bytes[8])?;

        let blocks = bytes[REFERENCE_HEADER..]
            .chunks_exact(REFERENCE_BLOCK)
            .map(|chunk| {
                let mut address = [0u8; 8];
                let mut len = [0u8; 4];
                address.copy_from_slice(&chunk[..8]);
                len.copy_from_slice(&chunk[8..]);
                Block {
                    address: u64::from_be_bytes(address),
                    size: u32::from_be_bytes(len),
                    hash: None,
                }
            })
            .collect();

        Ok(Self {
            blocks,
            size: u64::from_be_bytes(size),
            hash: None,
            encoding,
        })
    }
}
