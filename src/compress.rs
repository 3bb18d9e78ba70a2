//! Compression collaborator: raw DEFLATE transforms over in-memory buffers,
//! plus the CRC-32 checksum used by the header structures.
//!
//! These are pure buffer-to-buffer functions; the archive model treats them
//! as an external codec and knows nothing about their internals.

use crate::error::Result;
use crc32fast::Hasher as Crc32;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// CRC-32 over a whole buffer, as stored in ZIP headers
/// (reflected, polynomial 0xEDB88320, initial/final complement)
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    hasher.finalize()
}

/// Compress a buffer with raw DEFLATE (no zlib/gzip wrapper)
pub fn deflate_raw(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a raw DEFLATE stream
pub fn inflate_raw(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Async form of `deflate_raw`
#[cfg(feature = "async")]
pub async fn deflate_raw_async(data: &[u8]) -> Result<Vec<u8>> {
    use async_compression::tokio::bufread::DeflateEncoder;
    use tokio::io::AsyncReadExt;

    let mut encoder = DeflateEncoder::new(data);
    let mut out = Vec::new();
    encoder.read_to_end(&mut out).await?;
    Ok(out)
}

/// Async form of `inflate_raw`
#[cfg(feature = "async")]
pub async fn inflate_raw_async(data: &[u8]) -> Result<Vec<u8>> {
    use async_compression::tokio::bufread::DeflateDecoder;
    use tokio::io::AsyncReadExt;

    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).await?;
    Ok(out)
}
