//! Stream and block digests
//!
//! [`DigestReader`] passes an encoded stream through untouched while
//! digesting its decoded content, so a blob stored without transcoding still
//! gets a digest of the unencoded bytes.

use std::io::{self, Read, Write};

use sha2::{Digest, Sha256};

use super::{StreamEncoding, BLOCK_DIGEST_TAG, STREAM_DIGEST_TAG};
use crate::error::Result;

/// Running SHA-256 over a whole unencoded stream
#[derive(Clone, Default)]
pub struct StreamDigest {
    hasher: Sha256,
    size: u64,
}

impl StreamDigest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tagged digest of a complete byte string
    pub fn of(data: &[u8]) -> Vec<u8> {
        let mut digest = Self::new();
        digest.update(data);
        digest.finish()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.size += data.len() as u64;
    }

    /// Bytes digested so far
    pub fn size(&self) -> u64 {
        self.size
    }

    /// `0x01` followed by the 32-byte SHA-256
    pub fn finish(self) -> Vec<u8> {
        let mut tagged = Vec::with_capacity(33);
        tagged.push(STREAM_DIGEST_TAG);
        tagged.extend_from_slice(&self.hasher.finalize());
        tagged
    }
}

impl Write for StreamDigest {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Running SHA-256 over the stored bytes of one block
#[derive(Clone, Default)]
pub struct BlockDigest {
    hasher: Sha256,
}

impl BlockDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// `0x02` followed by the first 16 bytes of the SHA-256
    pub fn finish(self) -> Vec<u8> {
        let digest = self.hasher.finalize();
        let mut tagged = Vec::with_capacity(17);
        tagged.push(BLOCK_DIGEST_TAG);
        tagged.extend_from_slice(&digest[..16]);
        tagged
    }
}

enum Sink {
    Identity(StreamDigest),
    Zstd(Box<zstd::stream::write::Decoder<'static, StreamDigest>>),
}

/// Reader that digests the decoded form of what passes through it
pub struct DigestReader<R> {
    inner: R,
    sink: Sink,
}

impl<R: Read> DigestReader<R> {
    /// Wrap `inner`, whose bytes are in `encoding`
    pub fn new(inner: R, encoding: StreamEncoding) -> Result<Self> {
        let sink = match encoding {
            StreamEncoding::Identity => Sink::Identity(StreamDigest::new()),
            StreamEncoding::Zstd => Sink::Zstd(Box::new(zstd::stream::write::Decoder::new(
                StreamDigest::new(),
            )?)),
        };
        Ok(Self { inner, sink })
    }

    /// Digest of the decoded bytes read so far
    pub fn finish(self) -> Result<StreamDigest> {
        match self.sink {
            Sink::Identity(digest) => Ok(digest),
            Sink::Zstd(mut decoder) => {
                decoder.flush()?;
                Ok(decoder.into_inner())
            }
        }
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        match &mut self.sink {
            Sink::Identity(digest) => digest.update(&buf[..n]),
            Sink::Zstd(decoder) => decoder.write_all(&buf[..n])?,
        }
        Ok(n)
    }
}
