//! Error types for m-zip

use std::io;

/// Result type for m-zip operations
pub type Result<T> = std::result::Result<T, MZipError>;

/// Error types that can occur during ZIP operations
#[derive(Debug)]
pub enum MZipError {
    /// I/O error
    Io(io::Error),
    /// End-of-central-directory record is truncated or has a bad signature
    InvalidEndRecord,
    /// No end-of-central-directory record found in the scan window
    InvalidFormat,
    /// Central directory record is truncated or has a bad signature
    InvalidCentralHeader,
    /// Local file header is truncated or has a bad signature
    InvalidLocalHeader,
    /// Entry has an empty compressed data region
    NoData,
    /// Unsupported compression method
    UnknownMethod(u16),
    /// CRC-32 checksum mismatch
    BadCrc { expected: u32, actual: u32 },
    /// Attempted to read the payload of a directory entry
    DirectoryContent,
    /// Name, extra field or comment longer than its 16-bit wire length field
    /// can hold
    FieldTooLong(&'static str),
    /// Entry not found in archive
    EntryNotFound(String),
    /// A plain file occupies a path component that must become a directory
    FileInTheWay(String),
}

impl std::fmt::Display for MZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MZipError::Io(e) => write!(f, "I/O error: {}", e),
            MZipError::InvalidEndRecord => {
                write!(f, "Invalid or missing end of central directory record")
            }
            MZipError::InvalidFormat => write!(f, "Invalid ZIP format: no end record found"),
            MZipError::InvalidCentralHeader => write!(f, "Invalid central directory header"),
            MZipError::InvalidLocalHeader => write!(f, "Invalid local file header"),
            MZipError::NoData => write!(f, "Entry has no compressed data"),
            MZipError::UnknownMethod(method) => {
                write!(f, "Unsupported compression method: {}", method)
            }
            MZipError::BadCrc { expected, actual } => {
                write!(
                    f,
                    "CRC-32 mismatch: expected 0x{:08x}, got 0x{:08x}",
                    expected, actual
                )
            }
            MZipError::DirectoryContent => write!(f, "Directory entries have no content"),
            MZipError::FieldTooLong(field) => {
                write!(f, "Over-long {}: ZIP length fields are 16-bit", field)
            }
            MZipError::EntryNotFound(name) => write!(f, "Entry not found: {}", name),
            MZipError::FileInTheWay(path) => {
                write!(f, "A file is in the way of directory creation: {}", path)
            }
        }
    }
}

impl std::error::Error for MZipError {}

impl From<io::Error> for MZipError {
    fn from(err: io::Error) -> Self {
        MZipError::Io(err)
    }
}
