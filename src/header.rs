//! ZIP header structures: the end-of-central-directory record and the
//! combined local/central file header.
//!
//! All multi-byte fields are little-endian at fixed offsets, per the ZIP
//! application note. The central directory record (46 bytes fixed) is a
//! strict superset of the local file header (30 bytes fixed): it adds the
//! comment length, disk-start, attribute fields and the local header offset.

use crate::error::{MZipError, Result};

/// ZIP local file header signature ("PK\x03\x04")
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// ZIP central directory header signature ("PK\x01\x02")
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// ZIP end of central directory signature ("PK\x05\x06")
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// Fixed size of the local file header
pub const LOCAL_HEADER_SIZE: usize = 30;

/// Fixed size of a central directory record
pub const CENTRAL_HEADER_SIZE: usize = 46;

/// Fixed size of the end-of-central-directory record
pub const END_HEADER_SIZE: usize = 22;

/// Maximum legal length of the archive comment
pub const MAX_COMMENT_LENGTH: usize = 0xFFFF;

/// Compression method: no compression
pub const STORED: u16 = 0;

/// Compression method: raw DEFLATE
pub const DEFLATED: u16 = 8;

/// Header id of the ZIP64 extended information extra field
pub const ID_ZIP64: u16 = 0x0001;

/// 32-bit sentinel meaning "the real value lives in the ZIP64 extra field"
pub const ZIP64_SENTINEL_32: u32 = 0xFFFFFFFF;

/// 16-bit sentinel for the disk-start field
pub const ZIP64_SENTINEL_16: u16 = 0xFFFF;

/// General purpose flag bit 3: sizes and CRC unknown at header-write time,
/// a data descriptor trails the compressed payload.
pub const FLAG_SIZES_UNKNOWN: u16 = 0x0008;

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
        data[offset + 4],
        data[offset + 5],
        data[offset + 6],
        data[offset + 7],
    ])
}

fn write_u16(data: &mut [u8], offset: usize, val: u16) {
    data[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
}

fn write_u32(data: &mut [u8], offset: usize, val: u32) {
    data[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
}

/// Compression method used by an entry
///
/// ZIP allows many methods; this library reads and writes only STORED and
/// DEFLATED. Entries carrying any other method value are preserved verbatim
/// on pass-through but fail decompression with `UnknownMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// No compression (stored)
    Stored,
    /// Raw DEFLATE compression
    Deflate,
}

impl CompressionMethod {
    pub fn to_zip_method(self) -> u16 {
        match self {
            CompressionMethod::Stored => STORED,
            CompressionMethod::Deflate => DEFLATED,
        }
    }

    pub fn from_zip_method(method: u16) -> Result<Self> {
        match method {
            STORED => Ok(CompressionMethod::Stored),
            DEFLATED => Ok(CompressionMethod::Deflate),
            other => Err(MZipError::UnknownMethod(other)),
        }
    }
}

/// End-of-central-directory record (EOCD)
///
/// Single-volume archives only: the per-volume and total entry counts are
/// kept equal at all times, and the disk-number fields are written as zero.
#[derive(Debug, Default, Clone)]
pub struct MainHeader {
    disk_entries: u16,
    total_entries: u16,
    /// Byte length of the central directory
    pub size: u32,
    /// Byte offset of the first central directory record
    pub offset: u32,
    comment_length: u16,
}

impl MainHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disk_entries(&self) -> u16 {
        self.disk_entries
    }

    /// Single-volume archives: setting the per-volume count also sets the total
    pub fn set_disk_entries(&mut self, val: u16) {
        self.disk_entries = val;
        self.total_entries = val;
    }

    pub fn total_entries(&self) -> u16 {
        self.total_entries
    }

    pub fn set_total_entries(&mut self, val: u16) {
        self.total_entries = val;
        self.disk_entries = val;
    }

    pub fn comment_length(&self) -> u16 {
        self.comment_length
    }

    pub fn set_comment_length(&mut self, val: u16) {
        self.comment_length = val;
    }

    /// Full on-disk size of the record, trailing comment included
    pub fn main_header_size(&self) -> usize {
        END_HEADER_SIZE + self.comment_length as usize
    }

    /// Parse the fixed 22-byte EOCD record
    pub fn load_from_binary(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != END_HEADER_SIZE
            || read_u32(data, 0) != END_OF_CENTRAL_DIRECTORY_SIGNATURE
        {
            return Err(MZipError::InvalidEndRecord);
        }

        // number of entries on this volume
        self.disk_entries = read_u16(data, 8);
        // total number of entries
        self.total_entries = read_u16(data, 10);
        // central directory size in bytes
        self.size = read_u32(data, 12);
        // offset of first central directory record
        self.offset = read_u32(data, 16);
        // archive comment length
        self.comment_length = read_u16(data, 20);
        Ok(())
    }

    /// Emit the EOCD record followed by room for the archive comment
    pub fn to_binary(&self) -> Vec<u8> {
        let mut b = vec![0u8; self.main_header_size()];
        write_u32(&mut b, 0, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        // disk number fields stay zero (single volume)
        write_u16(&mut b, 8, self.disk_entries);
        write_u16(&mut b, 10, self.total_entries);
        write_u32(&mut b, 12, self.size);
        write_u32(&mut b, 16, self.offset);
        write_u16(&mut b, 20, self.comment_length);
        // pad the comment region so no garbage is left there
        for byte in &mut b[END_HEADER_SIZE..] {
            *byte = b' ';
        }
        b
    }
}

/// The fields of an entry's local file header as actually read from the
/// archive, plus the derived position of the compressed payload.
///
/// Local headers may disagree with the central directory copy (notably in
/// name/extra lengths and, with flag bit 3 set, sizes and CRC), so payload
/// offsets are always derived from this structure, never from the central
/// directory layout.
#[derive(Debug, Clone, Copy)]
pub struct DataHeader {
    pub crc: u32,
    pub compressed_size: u32,
    pub size: u32,
    pub file_name_length: u16,
    pub extra_length: u16,
    /// Byte offset at which this entry's compressed payload begins
    pub real_data_offset: u64,
}

/// Combined local/central file header of one archive entry
#[derive(Debug, Default, Clone)]
pub struct EntryHeader {
    /// Version made by
    pub made: u16,
    /// Version needed to extract
    pub version: u16,
    /// General purpose bit flags
    pub flags: u16,
    /// Compression method, kept as the raw wire value so that entries with
    /// unsupported methods still round-trip untouched
    pub method: u16,
    /// Modification time (MS-DOS format)
    pub time: u16,
    /// Modification date (MS-DOS format)
    pub date: u16,
    pub crc: u32,
    /// Widened to u64 so a ZIP64 extra field can override the 32-bit value
    pub compressed_size: u64,
    pub size: u64,
    pub file_name_length: u16,
    pub extra_length: u16,
    pub comment_length: u16,
    /// Widened for the 4-byte ZIP64 override of the 16-bit wire field
    pub disk_num_start: u32,
    /// Internal file attributes
    pub in_attr: u16,
    /// External file attributes
    pub attr: u32,
    /// Offset of the local file header
    pub offset: u64,
    /// Set when uncompressed payload was supplied programmatically and the
    /// entry must be recompressed on serialization
    pub changed: bool,
    data_header: Option<DataHeader>,
}

impl EntryHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag bit 3: CRC and sizes were unknown when the local header was written
    pub fn sizes_unknown(&self) -> bool {
        self.flags & FLAG_SIZES_UNKNOWN == FLAG_SIZES_UNKNOWN
    }

    /// Full size of the central directory record including name/extra/comment
    pub fn entry_header_size(&self) -> usize {
        CENTRAL_HEADER_SIZE
            + self.file_name_length as usize
            + self.extra_length as usize
            + self.comment_length as usize
    }

    /// Full size of the local header including name/extra (no comment)
    pub fn data_header_size(&self) -> usize {
        LOCAL_HEADER_SIZE + self.file_name_length as usize + self.extra_length as usize
    }

    /// Local header fields captured by `load_data_header_from_binary`
    pub fn data_header(&self) -> Option<&DataHeader> {
        self.data_header.as_ref()
    }

    /// Parse the fixed 46-byte central directory record
    pub fn load_from_binary(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < CENTRAL_HEADER_SIZE
            || read_u32(data, 0) != CENTRAL_DIRECTORY_SIGNATURE
        {
            return Err(MZipError::InvalidCentralHeader);
        }

        self.made = read_u16(data, 4);
        self.version = read_u16(data, 6);
        self.flags = read_u16(data, 8);
        self.method = read_u16(data, 10);
        self.time = read_u16(data, 12);
        self.date = read_u16(data, 14);
        self.crc = read_u32(data, 16);
        self.compressed_size = read_u32(data, 20) as u64;
        self.size = read_u32(data, 24) as u64;
        self.file_name_length = read_u16(data, 28);
        self.extra_length = read_u16(data, 30);
        self.comment_length = read_u16(data, 32);
        self.disk_num_start = read_u16(data, 34) as u32;
        self.in_attr = read_u16(data, 36);
        self.attr = read_u32(data, 38);
        self.offset = read_u32(data, 42) as u64;
        Ok(())
    }

    /// Read and validate this entry's 30-byte local header in place within
    /// the archive's full buffer and derive the position of the compressed
    /// payload from the local header's own name/extra lengths.
    ///
    /// The parsed header is kept after the first call: serialization rewrites
    /// `offset` for the output layout, while the payload stays at its
    /// original position in the source buffer.
    pub fn load_data_header_from_binary(&mut self, source: &[u8]) -> Result<u64> {
        if let Some(data_header) = &self.data_header {
            return Ok(data_header.real_data_offset);
        }
        let start = self.offset as usize;
        let end = start
            .checked_add(LOCAL_HEADER_SIZE)
            .ok_or(MZipError::InvalidLocalHeader)?;
        let data = source
            .get(start..end)
            .ok_or(MZipError::InvalidLocalHeader)?;
        if read_u32(data, 0) != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(MZipError::InvalidLocalHeader);
        }

        let file_name_length = read_u16(data, 26);
        let extra_length = read_u16(data, 28);
        let real_data_offset = self.offset
            + LOCAL_HEADER_SIZE as u64
            + file_name_length as u64
            + extra_length as u64;

        self.data_header = Some(DataHeader {
            crc: read_u32(data, 14),
            compressed_size: read_u32(data, 18),
            size: read_u32(data, 22),
            file_name_length,
            extra_length,
            real_data_offset,
        });
        Ok(real_data_offset)
    }

    /// Emit the 30-byte local header form (no comment fields)
    pub fn data_header_to_binary(&self) -> Vec<u8> {
        let mut b = vec![0u8; LOCAL_HEADER_SIZE];
        write_u32(&mut b, 0, LOCAL_FILE_HEADER_SIGNATURE);
        write_u16(&mut b, 4, self.version);
        write_u16(&mut b, 6, self.flags);
        write_u16(&mut b, 8, self.method);
        write_u16(&mut b, 10, self.time);
        write_u16(&mut b, 12, self.date);
        write_u32(&mut b, 14, self.crc);
        write_u32(&mut b, 18, self.compressed_size as u32);
        write_u32(&mut b, 22, self.size as u32);
        write_u16(&mut b, 26, self.file_name_length);
        write_u16(&mut b, 28, self.extra_length);
        b
    }

    /// Emit the 46-byte central directory form plus zeroed room for the
    /// trailing name, extra field and comment (filled by the entry).
    pub fn entry_header_to_binary(&self) -> Vec<u8> {
        let mut b = vec![0u8; self.entry_header_size()];
        write_u32(&mut b, 0, CENTRAL_DIRECTORY_SIGNATURE);
        write_u16(&mut b, 4, self.made);
        write_u16(&mut b, 6, self.version);
        write_u16(&mut b, 8, self.flags);
        write_u16(&mut b, 10, self.method);
        write_u16(&mut b, 12, self.time);
        write_u16(&mut b, 14, self.date);
        write_u32(&mut b, 16, self.crc);
        write_u32(&mut b, 20, self.compressed_size as u32);
        write_u32(&mut b, 24, self.size as u32);
        write_u16(&mut b, 28, self.file_name_length);
        write_u16(&mut b, 30, self.extra_length);
        write_u16(&mut b, 32, self.comment_length);
        write_u16(&mut b, 34, self.disk_num_start as u16);
        write_u16(&mut b, 36, self.in_attr);
        write_u32(&mut b, 38, self.attr);
        write_u32(&mut b, 42, self.offset as u32);
        b
    }

    /// Walk an extra field's TLV records and apply any ZIP64 overrides
    pub fn parse_extra(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        while offset + 4 <= data.len() {
            let signature = read_u16(data, offset);
            let size = read_u16(data, offset + 2) as usize;
            offset += 4;
            if offset + size > data.len() {
                break;
            }
            if signature == ID_ZIP64 {
                self.parse_zip64_extended_information(&data[offset..offset + size]);
            }
            offset += size;
        }
    }

    /// Override 32-bit header fields that read as the ZIP64 sentinel with the
    /// wide values from the extra field. Sub-fields appear in fixed order
    /// (uncompressed size, compressed size, local header offset, disk start)
    /// and each is only present when the preceding ones are.
    fn parse_zip64_extended_information(&mut self, data: &[u8]) {
        if data.len() >= 8 && self.size == ZIP64_SENTINEL_32 as u64 {
            self.size = read_u64(data, 0);
        }
        if data.len() >= 16 && self.compressed_size == ZIP64_SENTINEL_32 as u64 {
            self.compressed_size = read_u64(data, 8);
        }
        if data.len() >= 24 && self.offset == ZIP64_SENTINEL_32 as u64 {
            self.offset = read_u64(data, 16);
        }
        if data.len() >= 28 && self.disk_num_start == ZIP64_SENTINEL_16 as u32 {
            self.disk_num_start = read_u32(data, 24);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_header_round_trip() {
        let mut header = MainHeader::new();
        header.set_total_entries(3);
        header.size = 138;
        header.offset = 1024;
        header.set_comment_length(5);

        let bytes = header.to_binary();
        assert_eq!(bytes.len(), END_HEADER_SIZE + 5);
        assert_eq!(&bytes[0..4], b"PK\x05\x06");

        let mut parsed = MainHeader::new();
        parsed.load_from_binary(&bytes[..END_HEADER_SIZE]).unwrap();
        assert_eq!(parsed.disk_entries(), 3);
        assert_eq!(parsed.total_entries(), 3);
        assert_eq!(parsed.size, 138);
        assert_eq!(parsed.offset, 1024);
        assert_eq!(parsed.comment_length(), 5);
    }

    #[test]
    fn main_header_rejects_bad_signature() {
        let mut bytes = MainHeader::new().to_binary();
        bytes[0] = 0x51;
        let mut header = MainHeader::new();
        assert!(matches!(
            header.load_from_binary(&bytes),
            Err(MZipError::InvalidEndRecord)
        ));
    }

    #[test]
    fn main_header_rejects_wrong_length() {
        let bytes = MainHeader::new().to_binary();
        let mut header = MainHeader::new();
        assert!(matches!(
            header.load_from_binary(&bytes[..20]),
            Err(MZipError::InvalidEndRecord)
        ));
    }

    #[test]
    fn disk_entries_and_total_entries_stay_coupled() {
        let mut header = MainHeader::new();
        header.set_disk_entries(7);
        assert_eq!(header.total_entries(), 7);
        header.set_total_entries(9);
        assert_eq!(header.disk_entries(), 9);
    }

    #[test]
    fn entry_header_round_trip() {
        let mut header = EntryHeader::new();
        header.made = 20;
        header.version = 20;
        header.method = DEFLATED;
        header.crc = 0xdeadbeef;
        header.compressed_size = 42;
        header.size = 100;
        header.file_name_length = 7;
        header.offset = 512;

        let bytes = header.entry_header_to_binary();
        assert_eq!(bytes.len(), CENTRAL_HEADER_SIZE + 7);
        assert_eq!(&bytes[0..4], b"PK\x01\x02");

        let mut parsed = EntryHeader::new();
        parsed.load_from_binary(&bytes).unwrap();
        assert_eq!(parsed.method, DEFLATED);
        assert_eq!(parsed.crc, 0xdeadbeef);
        assert_eq!(parsed.compressed_size, 42);
        assert_eq!(parsed.size, 100);
        assert_eq!(parsed.file_name_length, 7);
        assert_eq!(parsed.offset, 512);
        assert_eq!(parsed.entry_header_size(), CENTRAL_HEADER_SIZE + 7);
    }

    #[test]
    fn entry_header_rejects_bad_signature() {
        let mut bytes = EntryHeader::new().entry_header_to_binary();
        bytes[1] = 0;
        let mut header = EntryHeader::new();
        assert!(matches!(
            header.load_from_binary(&bytes),
            Err(MZipError::InvalidCentralHeader)
        ));
    }

    #[test]
    fn data_header_parses_local_form() {
        let mut header = EntryHeader::new();
        header.method = STORED;
        header.crc = 0x1234;
        header.compressed_size = 2;
        header.size = 2;
        header.file_name_length = 5;
        header.offset = 0;

        let mut source = header.data_header_to_binary();
        source.extend_from_slice(b"a.txthi");

        let real = header.load_data_header_from_binary(&source).unwrap();
        assert_eq!(real, (LOCAL_HEADER_SIZE + 5) as u64);
        let dh = header.data_header().unwrap();
        assert_eq!(dh.crc, 0x1234);
        assert_eq!(dh.compressed_size, 2);
        assert_eq!(dh.file_name_length, 5);
    }

    #[test]
    fn data_header_survives_offset_rewrite() {
        let mut header = EntryHeader::new();
        header.compressed_size = 2;
        header.size = 2;
        header.file_name_length = 5;
        header.offset = 0;

        let mut source = header.data_header_to_binary();
        source.extend_from_slice(b"a.txthi");
        let real = header.load_data_header_from_binary(&source).unwrap();

        // serialization relocates the entry; the payload position in the
        // source buffer must not move with it
        header.offset = 500;
        assert_eq!(header.load_data_header_from_binary(&source).unwrap(), real);
    }

    #[test]
    fn data_header_rejects_offset_past_end() {
        let mut header = EntryHeader::new();
        header.offset = 1000;
        assert!(matches!(
            header.load_data_header_from_binary(&[0u8; 64]),
            Err(MZipError::InvalidLocalHeader)
        ));
    }

    #[test]
    fn zip64_extra_overrides_sentinel_size() {
        let mut header = EntryHeader::new();
        header.size = ZIP64_SENTINEL_32 as u64;
        header.compressed_size = 99;

        let mut extra = Vec::new();
        extra.extend_from_slice(&ID_ZIP64.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&0x1_0000_0001u64.to_le_bytes());
        header.parse_extra(&extra);

        assert_eq!(header.size, 0x1_0000_0001);
        // compressed size was not a sentinel and the sub-field is absent
        assert_eq!(header.compressed_size, 99);
    }

    #[test]
    fn zip64_extra_progressive_truncation() {
        let mut header = EntryHeader::new();
        header.size = ZIP64_SENTINEL_32 as u64;
        header.compressed_size = ZIP64_SENTINEL_32 as u64;
        header.offset = ZIP64_SENTINEL_32 as u64;
        header.disk_num_start = ZIP64_SENTINEL_16 as u32;

        let mut extra = Vec::new();
        extra.extend_from_slice(&ID_ZIP64.to_le_bytes());
        extra.extend_from_slice(&28u16.to_le_bytes());
        extra.extend_from_slice(&11u64.to_le_bytes());
        extra.extend_from_slice(&22u64.to_le_bytes());
        extra.extend_from_slice(&33u64.to_le_bytes());
        extra.extend_from_slice(&44u32.to_le_bytes());
        header.parse_extra(&extra);

        assert_eq!(header.size, 11);
        assert_eq!(header.compressed_size, 22);
        assert_eq!(header.offset, 33);
        assert_eq!(header.disk_num_start, 44);
    }

    #[test]
    fn unrelated_extra_records_are_skipped() {
        let mut header = EntryHeader::new();
        header.size = ZIP64_SENTINEL_32 as u64;

        let mut extra = Vec::new();
        // unknown record first
        extra.extend_from_slice(&0x7075u16.to_le_bytes());
        extra.extend_from_slice(&3u16.to_le_bytes());
        extra.extend_from_slice(&[1, 2, 3]);
        // then the zip64 record
        extra.extend_from_slice(&ID_ZIP64.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&777u64.to_le_bytes());
        header.parse_extra(&extra);

        assert_eq!(header.size, 777);
    }

    #[test]
    fn compression_method_mapping() {
        assert_eq!(
            CompressionMethod::from_zip_method(0).unwrap(),
            CompressionMethod::Stored
        );
        assert_eq!(
            CompressionMethod::from_zip_method(8).unwrap(),
            CompressionMethod::Deflate
        );
        assert!(matches!(
            CompressionMethod::from_zip_method(12),
            Err(MZipError::UnknownMethod(12))
        ));
        assert_eq!(CompressionMethod::Deflate.to_zip_method(), DEFLATED);
    }
}
