//! # m-zip: In-Memory ZIP Archive Library
//!
//! `m-zip` parses, modifies and rebuilds ZIP archives entirely in memory.
//! It reads the central directory of an existing archive into an entry
//! table, decompresses entries lazily on demand, and serializes the whole
//! entry set back into a byte-exact ZIP stream, either synchronously or
//! incrementally with per-entry progress hooks.
//!
//! ## Features
//!
//! - **Central-directory driven**: entries are indexed from the authoritative
//!   central directory; local headers are consulted only to locate payloads
//! - **Lazy transforms**: untouched entries pass their compressed bytes
//!   through unchanged, new data is compressed only at serialization time
//! - **ZIP64 aware reads**: 32-bit sentinel fields are overridden from the
//!   ZIP64 extra field
//! - **Sync and async**: one-entry-at-a-time incremental serialization behind
//!   the `async` feature
//!
//! ## Quick Start
//!
//! ### Reading an archive
//!
//! ```no_run
//! use m_zip::Zip;
//!
//! let mut zip = Zip::open("archive.zip")?;
//!
//! for entry in zip.get_entries() {
//!     println!("{}: {} bytes", entry.entry_name(), entry.header().size);
//! }
//!
//! let data = zip.read_file("file.txt")?;
//! # Ok::<(), m_zip::MZipError>(())
//! ```
//!
//! ### Building an archive
//!
//! ```no_run
//! use m_zip::Zip;
//!
//! let mut zip = Zip::new();
//! zip.add_file("hello.txt", b"Hello, World!")?;
//! zip.add_file("dir/", b"")?;
//! zip.add_file("dir/nested.txt", b"Another file")?;
//!
//! let bytes = zip.to_buffer()?;
//! std::fs::write("output.zip", bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod compress;
pub mod entry;
pub mod error;
pub mod fsutil;
pub mod header;
pub mod zip;

pub use archive::ZipArchive;
pub use entry::ZipEntry;
pub use error::{MZipError, Result};
pub use header::{CompressionMethod, EntryHeader, MainHeader};
pub use zip::Zip;
