//! A single archive member: name, comment, extra field, header, and a lazily
//! (de)compressed payload.
//!
//! The payload is modelled as a closed state machine. Entries parsed from an
//! existing archive are `SourceBacked` and re-slice their compressed bytes
//! out of the shared source buffer on demand; entries whose data was supplied
//! programmatically hold `Pending` uncompressed bytes and are compressed
//! lazily at serialization time. Whether an entry must be recompressed is a
//! type-level fact, not a buffer-emptiness check.

use std::sync::Arc;

use crate::compress;
use crate::error::{MZipError, Result};
use crate::header::{CompressionMethod, EntryHeader, CENTRAL_HEADER_SIZE, DEFLATED, STORED};

/// Payload state of an entry
#[derive(Debug, Clone)]
enum EntryData {
    /// No payload: a fresh entry with nothing set yet
    Unset,
    /// Compressed bytes live in the parsed source archive, shared by
    /// reference with every other entry sourced from it
    SourceBacked(Arc<Vec<u8>>),
    /// Uncompressed bytes supplied programmatically, compressed on demand
    Pending(Vec<u8>),
}

/// One member of a ZIP archive
#[derive(Debug, Clone)]
pub struct ZipEntry {
    entry_name: Vec<u8>,
    comment: Vec<u8>,
    extra: Vec<u8>,
    is_directory: bool,
    header: EntryHeader,
    data: EntryData,
}

impl Default for ZipEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipEntry {
    /// Create a fresh entry with no payload
    pub fn new() -> Self {
        ZipEntry {
            entry_name: Vec::new(),
            comment: Vec::new(),
            extra: Vec::new(),
            is_directory: false,
            header: EntryHeader::new(),
            data: EntryData::Unset,
        }
    }

    /// Create an entry whose compressed bytes live in `source`, the full
    /// buffer of a parsed archive
    pub fn from_source(source: Arc<Vec<u8>>) -> Self {
        ZipEntry {
            data: EntryData::SourceBacked(source),
            ..ZipEntry::new()
        }
    }

    /// Full entry name (path within the archive), lossily decoded
    pub fn entry_name(&self) -> String {
        String::from_utf8_lossy(&self.entry_name).into_owned()
    }

    /// Full entry name as raw bytes
    pub fn raw_entry_name(&self) -> &[u8] {
        &self.entry_name
    }

    /// Set the entry name. A trailing `/` or `\` marks a directory entry.
    /// Names longer than the 16-bit wire length field can hold are rejected.
    pub fn set_entry_name(&mut self, name: impl Into<Vec<u8>>) -> Result<()> {
        let name = name.into();
        self.header.file_name_length =
            u16::try_from(name.len()).map_err(|_| MZipError::FieldTooLong("entry name"))?;
        self.is_directory = matches!(name.last(), Some(b'/') | Some(b'\\'));
        self.entry_name = name;
        Ok(())
    }

    /// Last path component of the entry name
    pub fn name(&self) -> String {
        let full = self.entry_name();
        let trimmed = full.trim_end_matches(['/', '\\']);
        trimmed
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(trimmed)
            .to_string()
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    /// Attach an extra field. ZIP64 records within it immediately override
    /// any header field that still reads as the 32-bit sentinel.
    pub fn set_extra(&mut self, extra: impl Into<Vec<u8>>) -> Result<()> {
        let extra = extra.into();
        self.header.extra_length =
            u16::try_from(extra.len()).map_err(|_| MZipError::FieldTooLong("extra field"))?;
        self.header.parse_extra(&extra);
        self.extra = extra;
        Ok(())
    }

    pub fn comment(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }

    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) -> Result<()> {
        let comment = comment.into();
        self.header.comment_length =
            u16::try_from(comment.len()).map_err(|_| MZipError::FieldTooLong("entry comment"))?;
        self.comment = comment;
        Ok(())
    }

    pub fn attr(&self) -> u32 {
        self.header.attr
    }

    pub fn set_attr(&mut self, attr: u32) {
        self.header.attr = attr;
    }

    pub fn header(&self) -> &EntryHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut EntryHeader {
        &mut self.header
    }

    /// Load this entry's central directory record
    pub fn load_header(&mut self, data: &[u8]) -> Result<()> {
        self.header.load_from_binary(data)
    }

    /// Supply uncompressed payload. Non-empty data on a file entry switches
    /// the method to DEFLATED and recomputes size and CRC on the spot;
    /// directories and empty payloads are stored.
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        let bytes = data.into();
        if !self.is_directory && !bytes.is_empty() {
            self.header.size = bytes.len() as u64;
            self.header.method = DEFLATED;
            self.header.crc = compress::crc32(&bytes);
            self.header.changed = true;
        } else {
            // folders and blank files should be stored
            self.header.method = STORED;
        }
        self.data = EntryData::Pending(bytes);
    }

    /// Decompressed payload of the entry.
    ///
    /// Pending data set via `set_data` is returned verbatim. Directory
    /// entries yield an empty buffer. Source-backed entries are inflated
    /// from the archive buffer; a CRC mismatch is fatal for STORED entries
    /// but only logged for DEFLATED ones (lenient-read policy, many
    /// real-world archives carry CRC quirks).
    pub fn get_data(&mut self) -> Result<Vec<u8>> {
        if self.header.changed {
            return Ok(self.pending_data());
        }
        if self.is_directory {
            return Ok(Vec::new());
        }

        let compressed = self.compressed_data_from_source()?;
        if compressed.is_empty() {
            return Err(MZipError::NoData);
        }

        match CompressionMethod::from_zip_method(self.header.method)? {
            CompressionMethod::Stored => {
                self.check_crc_strict(&compressed)?;
                Ok(compressed)
            }
            CompressionMethod::Deflate => {
                let data = compress::inflate_raw(&compressed)?;
                self.check_crc_lenient(&data);
                Ok(data)
            }
        }
    }

    /// Async form of `get_data`. Unlike the sync form, reading a directory
    /// entry reports `DirectoryContent`.
    #[cfg(feature = "async")]
    pub async fn get_data_async(&mut self) -> Result<Vec<u8>> {
        if self.header.changed {
            return Ok(self.pending_data());
        }
        if self.is_directory {
            return Err(MZipError::DirectoryContent);
        }

        let compressed = self.compressed_data_from_source()?;
        if compressed.is_empty() {
            return Err(MZipError::NoData);
        }

        match CompressionMethod::from_zip_method(self.header.method)? {
            CompressionMethod::Stored => {
                self.check_crc_strict(&compressed)?;
                Ok(compressed)
            }
            CompressionMethod::Deflate => {
                let data = compress::inflate_raw_async(&compressed).await?;
                self.check_crc_lenient(&data);
                Ok(data)
            }
        }
    }

    /// Compressed payload of the entry, compressing pending data on demand.
    ///
    /// Untouched source-backed entries pass their compressed bytes through
    /// unchanged, so reserializing a loaded archive never recompresses.
    pub fn get_compressed_data(&mut self) -> Result<Vec<u8>> {
        let Some(bytes) = self.pending_for_compression() else {
            return self.pass_through_compressed();
        };
        if self.header.method == STORED {
            self.header.compressed_size = self.header.size;
            Ok(bytes)
        } else {
            let deflated = compress::deflate_raw(&bytes)?;
            self.header.compressed_size = deflated.len() as u64;
            Ok(deflated)
        }
    }

    /// Async form of `get_compressed_data`
    #[cfg(feature = "async")]
    pub async fn get_compressed_data_async(&mut self) -> Result<Vec<u8>> {
        let Some(bytes) = self.pending_for_compression() else {
            return self.pass_through_compressed();
        };
        if self.header.method == STORED {
            self.header.compressed_size = self.header.size;
            Ok(bytes)
        } else {
            let deflated = compress::deflate_raw_async(&bytes).await?;
            self.header.compressed_size = deflated.len() as u64;
            Ok(deflated)
        }
    }

    /// Serialize the central directory record followed by name, extra and
    /// comment bytes, sized exactly `entry_header_size`.
    pub fn pack_header(&self) -> Vec<u8> {
        let mut header = self.header.entry_header_to_binary();
        let mut pos = CENTRAL_HEADER_SIZE;
        header[pos..pos + self.entry_name.len()].copy_from_slice(&self.entry_name);
        pos += self.entry_name.len();
        header[pos..pos + self.extra.len()].copy_from_slice(&self.extra);
        pos += self.extra.len();
        header[pos..pos + self.comment.len()].copy_from_slice(&self.comment);
        header
    }

    fn pending_data(&self) -> Vec<u8> {
        match &self.data {
            EntryData::Pending(bytes) => bytes.clone(),
            _ => Vec::new(),
        }
    }

    /// Pending uncompressed bytes that actually require compression, or None
    /// when the entry should pass through / emit nothing
    fn pending_for_compression(&self) -> Option<Vec<u8>> {
        match &self.data {
            EntryData::Pending(bytes) if !bytes.is_empty() && !self.is_directory => {
                Some(bytes.clone())
            }
            _ => None,
        }
    }

    fn pass_through_compressed(&mut self) -> Result<Vec<u8>> {
        if matches!(self.data, EntryData::SourceBacked(_)) {
            self.compressed_data_from_source()
        } else {
            Ok(Vec::new())
        }
    }

    /// Re-slice this entry's compressed bytes out of the source buffer. The
    /// payload position is derived from the local header, never assumed from
    /// the central directory layout.
    fn compressed_data_from_source(&mut self) -> Result<Vec<u8>> {
        let source = match &self.data {
            EntryData::SourceBacked(buf) => Arc::clone(buf),
            _ => return Ok(Vec::new()),
        };
        let real_data_offset = self.header.load_data_header_from_binary(&source)?;
        let start = real_data_offset as usize;
        let end = start
            .checked_add(self.header.compressed_size as usize)
            .ok_or(MZipError::InvalidLocalHeader)?;
        let slice = source.get(start..end).ok_or(MZipError::InvalidLocalHeader)?;
        Ok(slice.to_vec())
    }

    /// The CRC the payload must match: the local header's copy when loaded,
    /// the central directory's otherwise
    fn expected_crc(&self) -> u32 {
        match self.header.data_header() {
            Some(dh) => dh.crc,
            None => self.header.crc,
        }
    }

    /// True when the CRC matches or cannot be checked. With flag bit 3 set
    /// the header CRC is zero and the real one sits in a trailing data
    /// descriptor, which is not parsed; the check always passes then.
    fn crc_ok(&self, data: &[u8]) -> bool {
        if self.header.sizes_unknown() {
            return true;
        }
        compress::crc32(data) == self.expected_crc()
    }

    fn check_crc_strict(&self, data: &[u8]) -> Result<()> {
        if self.crc_ok(data) {
            Ok(())
        } else {
            Err(MZipError::BadCrc {
                expected: self.expected_crc(),
                actual: compress::crc32(data),
            })
        }
    }

    fn check_crc_lenient(&self, data: &[u8]) {
        if !self.crc_ok(data) {
            tracing::warn!(
                entry = %self.entry_name(),
                expected = self.expected_crc(),
                actual = compress::crc32(data),
                "CRC-32 mismatch on deflated entry, returning data anyway"
            );
        }
    }
}
