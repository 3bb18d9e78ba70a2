//! The archive container: an ordered entry list driven by the central
//! directory, with a name-keyed lookup table kept in sync on every mutation.
//!
//! Loading walks the buffer backward to the EOCD record, then forward through
//! the central directory. Serialization emits, in one traversal,
//! `[data blocks][central directory][EOCD + comment]` into a buffer of the
//! exact precomputed size.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::entry::ZipEntry;
use crate::error::{MZipError, Result};
use crate::header::{
    MainHeader, CENTRAL_HEADER_SIZE, END_HEADER_SIZE, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    MAX_COMMENT_LENGTH,
};

/// In-memory ZIP archive
pub struct ZipArchive {
    entries: Vec<ZipEntry>,
    table: HashMap<String, usize>,
    main_header: MainHeader,
    comment: Vec<u8>,
    /// Full original file, retained so unmodified entries can lazily
    /// re-slice their compressed bytes. Never mutated once parsed.
    source: Option<Arc<Vec<u8>>>,
}

impl Default for ZipArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        ZipArchive {
            entries: Vec::new(),
            table: HashMap::new(),
            main_header: MainHeader::new(),
            comment: Vec::new(),
            source: None,
        }
    }

    /// Parse an archive from an in-memory buffer
    pub fn from_buffer(buffer: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new();
        archive.source = Some(Arc::new(buffer));
        archive.read_main_header()?;
        Ok(archive)
    }

    /// Read and parse an archive from a file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_buffer(std::fs::read(path)?)
    }

    /// All entries, in central-directory order (or insertion order for a
    /// freshly built archive; serialization re-sorts)
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [ZipEntry] {
        &mut self.entries
    }

    pub fn main_header(&self) -> &MainHeader {
        &self.main_header
    }

    /// Archive comment
    pub fn comment(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }

    /// Set the archive comment. Comments longer than the EOCD record's
    /// 16-bit length field can hold are rejected.
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) -> Result<()> {
        let comment = comment.into();
        if comment.len() > MAX_COMMENT_LENGTH {
            return Err(MZipError::FieldTooLong("archive comment"));
        }
        self.main_header.set_comment_length(comment.len() as u16);
        self.comment = comment;
        Ok(())
    }

    /// Look up an entry by its full name
    pub fn get_entry(&self, entry_name: &str) -> Option<&ZipEntry> {
        self.table.get(entry_name).map(|&i| &self.entries[i])
    }

    pub fn get_entry_mut(&mut self, entry_name: &str) -> Option<&mut ZipEntry> {
        match self.table.get(entry_name) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    /// Append an entry and index it by name. On a name collision the new
    /// entry wins the table slot.
    pub fn set_entry(&mut self, entry: ZipEntry) {
        let name = entry.entry_name();
        self.table.insert(name, self.entries.len());
        self.entries.push(entry);
        self.main_header.set_total_entries(self.entries.len() as u16);
    }

    /// Remove an entry by name. Deleting a directory entry cascades over its
    /// whole subtree (every entry whose name it prefixes).
    pub fn delete_entry(&mut self, entry_name: &str) -> Result<()> {
        let idx = *self
            .table
            .get(entry_name)
            .ok_or_else(|| MZipError::EntryNotFound(entry_name.to_string()))?;

        if self.entries[idx].is_directory() {
            let children: Vec<String> = self
                .get_entry_children(&self.entries[idx])
                .iter()
                .map(|child| child.entry_name())
                .filter(|name| name != entry_name)
                .collect();
            for child in children {
                // a nested directory cascade may have removed it already
                if self.table.contains_key(&child) {
                    self.delete_entry(&child)?;
                }
            }
        }

        // child deletions shift positions, so find the entry again
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.entry_name() == entry_name)
        {
            self.entries.remove(pos);
        }
        self.reindex();
        Ok(())
    }

    /// All entries whose name is prefixed by the directory's name, the
    /// directory itself included. Empty for non-directories.
    pub fn get_entry_children(&self, entry: &ZipEntry) -> Vec<&ZipEntry> {
        if !entry.is_directory() {
            return Vec::new();
        }
        let prefix = entry.raw_entry_name();
        self.entries
            .iter()
            .filter(|e| e.raw_entry_name().starts_with(prefix))
            .collect()
    }

    /// Serialize the whole archive to a buffer.
    ///
    /// Entries are stable-sorted case-insensitively by name, each entry's
    /// compressed bytes are obtained (compressing pending data lazily), and
    /// the output layout plus its total size are produced in that same
    /// single traversal.
    pub fn compress_to_buffer(&mut self) -> Result<Vec<u8>> {
        self.sort_entries();

        let mut total_size = 0usize;
        let mut data_block: Vec<Vec<u8>> = Vec::new();
        let mut entry_headers: Vec<Vec<u8>> = Vec::new();
        let mut dindex = 0u64;

        self.main_header.size = 0;
        self.main_header.offset = 0;

        for entry in &mut self.entries {
            // compress first: the local and central headers must reflect the
            // final compressed size and offset
            let compressed = entry.get_compressed_data()?;
            entry.header_mut().offset = dindex;

            let data_header = entry.header().data_header_to_binary();
            let mut post_header =
                Vec::with_capacity(entry.raw_entry_name().len() + entry.extra().len());
            post_header.extend_from_slice(entry.raw_entry_name());
            post_header.extend_from_slice(entry.extra());

            let data_length = data_header.len() + post_header.len() + compressed.len();
            dindex += data_length as u64;

            data_block.push(data_header);
            data_block.push(post_header);
            data_block.push(compressed);

            let entry_header = entry.pack_header();
            self.main_header.size += entry_header.len() as u32;
            total_size += data_length + entry_header.len();
            entry_headers.push(entry_header);
        }

        total_size += self.main_header.main_header_size();
        // end of the data region, start of the central directory
        self.main_header.offset = dindex as u32;

        Ok(Self::assemble(
            total_size,
            &data_block,
            &entry_headers,
            &self.main_header,
            &self.comment,
        ))
    }

    /// Incremental serialization: identical layout to `compress_to_buffer`,
    /// but entries are compressed strictly one at a time, with the progress
    /// callbacks invoked before and after each entry's compression. The
    /// first per-entry failure aborts the pipeline with no output.
    #[cfg(feature = "async")]
    pub async fn to_async_buffer<S, E>(
        &mut self,
        mut on_item_start: S,
        mut on_item_end: E,
    ) -> Result<Vec<u8>>
    where
        S: FnMut(&str),
        E: FnMut(&str),
    {
        self.sort_entries();

        let mut total_size = 0usize;
        let mut data_block: Vec<Vec<u8>> = Vec::new();
        let mut entry_headers: Vec<Vec<u8>> = Vec::new();
        let mut dindex = 0u64;

        self.main_header.size = 0;
        self.main_header.offset = 0;

        for entry in &mut self.entries {
            let name = entry.entry_name();
            on_item_start(&name);
            let compressed = entry.get_compressed_data_async().await?;
            on_item_end(&name);

            entry.header_mut().offset = dindex;

            let data_header = entry.header().data_header_to_binary();
            let mut post_header =
                Vec::with_capacity(entry.raw_entry_name().len() + entry.extra().len());
            post_header.extend_from_slice(entry.raw_entry_name());
            post_header.extend_from_slice(entry.extra());

            let data_length = data_header.len() + post_header.len() + compressed.len();
            dindex += data_length as u64;

            data_block.push(data_header);
            data_block.push(post_header);
            data_block.push(compressed);

            let entry_header = entry.pack_header();
            self.main_header.size += entry_header.len() as u32;
            total_size += data_length + entry_header.len();
            entry_headers.push(entry_header);
        }

        total_size += self.main_header.main_header_size();
        self.main_header.offset = dindex as u32;

        Ok(Self::assemble(
            total_size,
            &data_block,
            &entry_headers,
            &self.main_header,
            &self.comment,
        ))
    }

    /// Case-insensitive ascending stable sort by entry name. Both the sync
    /// and the async serialization path use this single order.
    fn sort_entries(&mut self) {
        if self.entries.len() > 1 {
            self.entries.sort_by(|a, b| {
                a.raw_entry_name()
                    .to_ascii_lowercase()
                    .cmp(&b.raw_entry_name().to_ascii_lowercase())
            });
            self.reindex();
        }
    }

    /// Concatenate the precomputed segments into one exact-size buffer
    fn assemble(
        total_size: usize,
        data_block: &[Vec<u8>],
        entry_headers: &[Vec<u8>],
        main_header: &MainHeader,
        comment: &[u8],
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(total_size);
        for block in data_block {
            out.extend_from_slice(block);
        }
        for header in entry_headers {
            out.extend_from_slice(header);
        }
        let mut end_record = main_header.to_binary();
        end_record[END_HEADER_SIZE..END_HEADER_SIZE + comment.len()].copy_from_slice(comment);
        out.extend_from_slice(&end_record);
        debug_assert_eq!(out.len(), total_size);
        out
    }

    /// Locate the EOCD record by scanning the buffer tail backward, load it,
    /// capture the archive comment, then walk the central directory.
    fn read_main_header(&mut self) -> Result<()> {
        let source = match &self.source {
            Some(buf) => Arc::clone(buf),
            None => return Err(MZipError::InvalidFormat),
        };
        let buffer = source.as_slice();

        if buffer.len() < END_HEADER_SIZE {
            return Err(MZipError::InvalidFormat);
        }
        let mut i = buffer.len() - END_HEADER_SIZE;
        // bounded by the maximum legal comment length: below this point no
        // comment length could make up the difference
        let n = i.saturating_sub(MAX_COMMENT_LENGTH);
        let mut end_offset = None;
        loop {
            // quick check that the byte is 'P' before the full signature read
            if buffer[i] == 0x50
                && u32::from_le_bytes([buffer[i], buffer[i + 1], buffer[i + 2], buffer[i + 3]])
                    == END_OF_CENTRAL_DIRECTORY_SIGNATURE
            {
                end_offset = Some(i);
                break;
            }
            if i == n {
                break;
            }
            i -= 1;
        }
        let end_offset = end_offset.ok_or(MZipError::InvalidFormat)?;

        self.main_header
            .load_from_binary(&buffer[end_offset..end_offset + END_HEADER_SIZE])?;
        if self.main_header.comment_length() > 0 {
            let start = end_offset + END_HEADER_SIZE;
            let end = (start + self.main_header.comment_length() as usize).min(buffer.len());
            self.comment = buffer[start..end].to_vec();
        }
        self.read_entries(&source)
    }

    /// Walk the central directory, building one entry per record. Any
    /// truncated or corrupt record aborts the walk before the entry table is
    /// touched, so a malformed archive is never partially indexed.
    fn read_entries(&mut self, source: &Arc<Vec<u8>>) -> Result<()> {
        let buffer = source.as_slice();
        let count = self.main_header.disk_entries() as usize;
        let mut index = self.main_header.offset as usize;

        let mut entries = Vec::with_capacity(count);
        let mut table = HashMap::with_capacity(count);

        for _ in 0..count {
            let mut entry = ZipEntry::from_source(Arc::clone(source));

            let header_end = index
                .checked_add(CENTRAL_HEADER_SIZE)
                .ok_or(MZipError::InvalidCentralHeader)?;
            let header_slice = buffer
                .get(index..header_end)
                .ok_or(MZipError::InvalidCentralHeader)?;
            entry.load_header(header_slice)?;

            let mut pos = header_end;
            let name_len = entry.header().file_name_length as usize;
            let name = buffer
                .get(pos..pos + name_len)
                .ok_or(MZipError::InvalidCentralHeader)?;
            entry.set_entry_name(name.to_vec())?;
            pos += name_len;

            let extra_len = entry.header().extra_length as usize;
            if extra_len > 0 {
                let extra = buffer
                    .get(pos..pos + extra_len)
                    .ok_or(MZipError::InvalidCentralHeader)?;
                entry.set_extra(extra.to_vec())?;
                pos += extra_len;
            }

            let comment_len = entry.header().comment_length as usize;
            if comment_len > 0 {
                let comment = buffer
                    .get(pos..pos + comment_len)
                    .ok_or(MZipError::InvalidCentralHeader)?;
                entry.set_comment(comment.to_vec())?;
            }

            index += entry.header().entry_header_size();

            table.insert(entry.entry_name(), entries.len());
            entries.push(entry);
        }

        self.entries = entries;
        self.table = table;
        Ok(())
    }

    fn reindex(&mut self) {
        self.table.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.table.insert(entry.entry_name(), i);
        }
        self.main_header.set_total_entries(self.entries.len() as u16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_named(name: &str) -> ZipEntry {
        let mut entry = ZipEntry::new();
        entry.set_entry_name(name).unwrap();
        entry
    }

    #[test]
    fn table_and_list_stay_in_sync() {
        let mut archive = ZipArchive::new();
        archive.set_entry(entry_named("a.txt"));
        archive.set_entry(entry_named("b.txt"));

        assert_eq!(archive.entries().len(), 2);
        assert_eq!(archive.main_header().total_entries(), 2);
        assert!(archive.get_entry("a.txt").is_some());

        archive.delete_entry("a.txt").unwrap();
        assert_eq!(archive.entries().len(), 1);
        assert_eq!(archive.main_header().total_entries(), 1);
        assert!(archive.get_entry("a.txt").is_none());
        assert!(archive.get_entry("b.txt").is_some());
    }

    #[test]
    fn delete_missing_entry_reports_not_found() {
        let mut archive = ZipArchive::new();
        assert!(matches!(
            archive.delete_entry("nope"),
            Err(MZipError::EntryNotFound(_))
        ));
    }

    #[test]
    fn name_collision_last_insert_wins() {
        let mut archive = ZipArchive::new();
        let mut first = entry_named("dup.txt");
        first.set_data(b"one".as_slice());
        let mut second = entry_named("dup.txt");
        second.set_data(b"two".as_slice());
        archive.set_entry(first);
        archive.set_entry(second);

        let found = archive.get_entry_mut("dup.txt").unwrap();
        assert_eq!(found.get_data().unwrap(), b"two");
    }

    #[test]
    fn children_of_a_directory_include_itself() {
        let mut archive = ZipArchive::new();
        archive.set_entry(entry_named("dir/"));
        archive.set_entry(entry_named("dir/x"));
        archive.set_entry(entry_named("other"));

        let dir = archive.get_entry("dir/").unwrap();
        let children = archive.get_entry_children(dir);
        assert_eq!(children.len(), 2);

        let plain = archive.get_entry("other").unwrap();
        assert!(archive.get_entry_children(plain).is_empty());
    }

    #[test]
    fn empty_buffer_is_not_an_archive() {
        assert!(matches!(
            ZipArchive::from_buffer(Vec::new()),
            Err(MZipError::InvalidFormat)
        ));
    }
}
