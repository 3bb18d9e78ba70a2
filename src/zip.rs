//! High-level façade mapping entry names to archive operations.
//!
//! Thin by design: every method resolves a name (or entry) and delegates to
//! the archive model. Callers that need header-level control use
//! [`ZipArchive`] directly.

use std::path::Path;

use crate::archive::ZipArchive;
use crate::entry::ZipEntry;
use crate::error::{MZipError, Result};
use crate::fsutil;

/// High-level handle to a ZIP archive
pub struct Zip {
    archive: ZipArchive,
}

impl Default for Zip {
    fn default() -> Self {
        Self::new()
    }
}

impl Zip {
    /// Start a new empty archive
    pub fn new() -> Self {
        Zip {
            archive: ZipArchive::new(),
        }
    }

    /// Parse an archive from an in-memory buffer
    pub fn from_buffer(buffer: Vec<u8>) -> Result<Self> {
        Ok(Zip {
            archive: ZipArchive::from_buffer(buffer)?,
        })
    }

    /// Read and parse an archive from a file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Zip {
            archive: ZipArchive::open(path)?,
        })
    }

    /// The underlying archive model
    pub fn archive(&self) -> &ZipArchive {
        &self.archive
    }

    pub fn archive_mut(&mut self) -> &mut ZipArchive {
        &mut self.archive
    }

    /// List all entries
    pub fn get_entries(&self) -> &[ZipEntry] {
        self.archive.entries()
    }

    /// Fetch one entry by its full name
    pub fn get_entry(&self, name: &str) -> Option<&ZipEntry> {
        self.archive.get_entry(name)
    }

    /// Decompressed content of the named entry
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.archive.get_entry_mut(name) {
            Some(entry) => entry.get_data(),
            None => Err(MZipError::EntryNotFound(name.to_string())),
        }
    }

    /// Async form of `read_file`
    #[cfg(feature = "async")]
    pub async fn read_file_async(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.archive.get_entry_mut(name) {
            Some(entry) => entry.get_data_async().await,
            None => Err(MZipError::EntryNotFound(name.to_string())),
        }
    }

    /// Insert a new entry with the given content. A name with a trailing
    /// separator creates a directory entry (content ignored); names past the
    /// 16-bit wire length limit are rejected.
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mut entry = ZipEntry::new();
        entry.set_entry_name(name)?;
        entry.set_data(data);
        self.archive.set_entry(entry);
        Ok(())
    }

    /// Remove an entry (with directory cascade) by name
    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        self.archive.delete_entry(name)
    }

    /// Archive comment
    pub fn comment(&self) -> String {
        self.archive.comment()
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<()> {
        self.archive.set_comment(comment.as_bytes().to_vec())
    }

    /// Serialize the archive to a buffer
    pub fn to_buffer(&mut self) -> Result<Vec<u8>> {
        self.archive.compress_to_buffer()
    }

    /// Incremental serialization with per-entry progress callbacks
    #[cfg(feature = "async")]
    pub async fn to_async_buffer<S, E>(&mut self, on_item_start: S, on_item_end: E) -> Result<Vec<u8>>
    where
        S: FnMut(&str),
        E: FnMut(&str),
    {
        self.archive.to_async_buffer(on_item_start, on_item_end).await
    }

    /// Serialize and write the archive to a file, overwriting any existing
    /// file at the path
    pub fn write_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let buffer = self.to_buffer()?;
        fsutil::write_file_to(path.as_ref(), &buffer, true, None)
    }

    /// Decompress every file entry, reporting whether all of them read back
    /// without error
    pub fn test(&mut self) -> bool {
        for entry in self.archive.entries_mut() {
            if entry.is_directory() {
                continue;
            }
            if entry.get_data().is_err() {
                return false;
            }
        }
        true
    }
}
