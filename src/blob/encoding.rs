//! Stream encodings
//!
//! A blob is stored either as-is or zstd-compressed. The tag byte is part of
//! the blob field encoding; an unknown tag is a decode error.

use std::io::{Read, Write};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamEncoding {
    #[default]
    Identity,
    Zstd,
}

impl StreamEncoding {
    pub fn as_byte(self) -> u8 {
        match self {
            StreamEncoding::Identity => 0,
            StreamEncoding::Zstd => 1,
        }
    }

    pub fn from_byte(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(StreamEncoding::Identity),
            1 => Ok(StreamEncoding::Zstd),
            other => Err(StoreError::UnknownEncoding(other)),
        }
    }

    /// Wrap an encoded reader so it yields decoded bytes
    pub fn decoder<'a>(self, input: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
        match self {
            StreamEncoding::Identity => Ok(input),
            StreamEncoding::Zstd => Ok(Box::new(zstd::stream::read::Decoder::new(input)?)),
        }
    }

    /// Encoder producing this encoding into memory
    pub fn encoder(self, level: i32) -> Result<StreamEncoder> {
        match self {
            StreamEncoding::Identity => Ok(StreamEncoder::Identity(Vec::new())),
            StreamEncoding::Zstd => Ok(StreamEncoder::Zstd(zstd::stream::write::Encoder::new(
                Vec::new(),
                level,
            )?)),
        }
    }
}

/// In-memory encoder whose output is drained as it is produced
pub enum StreamEncoder {
    Identity(Vec<u8>),
    Zstd(zstd::stream::write::Encoder<'static, Vec<u8>>),
}

impl StreamEncoder {
    /// Feed unencoded bytes
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        match self {
            StreamEncoder::Identity(out) => out.extend_from_slice(data),
            StreamEncoder::Zstd(encoder) => encoder.write_all(data)?,
        }
        Ok(())
    }

    /// Take the encoded bytes produced so far
    pub fn take(&mut self) -> Vec<u8> {
        match self {
            StreamEncoder::Identity(out) => std::mem::take(out),
            StreamEncoder::Zstd(encoder) => std::mem::take(encoder.get_mut()),
        }
    }

    /// End the stream, returning the remaining encoded bytes
    pub fn finish(self) -> Result<Vec<u8>> {
        match self {
            StreamEncoder::Identity(out) => Ok(out),
            StreamEncoder::Zstd(encoder) => Ok(encoder.finish()?),
        }
    }
}
