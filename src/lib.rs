//! # rezip
//!
//! A Rust zip archive manager.
//!
//! This library creates ZIP archives from a file or directory tree, lists
//! and extracts their entries, and removes or adds entries in an existing
//! archive. Removal and addition rebuild the archive in a temporary file
//! next to it and swap it in with a single rename, copying untouched
//! entries byte for byte, so a failed call never leaves a half-written
//! archive behind.
//!
//! ## Features
//!
//! - Create archives from a single file or a whole directory
//! - List entries with sizes counted while decoding
//! - Extract all entries, refusing names that escape the output directory
//! - Remove and add entries with copy-through rewrites
//! - Support for ZIP64 format (archives larger than 4GB)
//! - Support for STORED (uncompressed) and DEFLATE compression methods
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use rezip::{Archive, RewriteOutcome};
//!
//! fn main() -> rezip::Result<()> {
//!     let archive = Archive::new("/tmp/backup.zip");
//!     archive.create(Path::new("/tmp/project"))?;
//!
//!     for entry in archive.list()? {
//!         println!("{} ({} bytes)", entry.name, entry.uncompressed_size);
//!     }
//!
//!     for outcome in archive.remove(&["notes.txt"])? {
//!         if let RewriteOutcome::Removed(name) = outcome {
//!             println!("dropped {}", name);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod io;
pub mod walk;
pub mod zip;

pub use archive::{Archive, Entries, EntryInfo, RewriteOutcome};
pub use cli::Cli;
pub use error::{ArchiveError, ErrorKind, Result};
pub use io::{LocalFileReader, ReadAt};
pub use zip::{CompressionMethod, ZipReader, ZipWriter};
