//! ZIP container codec.
//!
//! The archive engine never edits an archive in place. Every change reads the
//! current file through [`ZipReader`] and streams a fresh one through
//! [`ZipWriter`]. Entries that are kept are copied through as raw local
//! records without being decoded again.
//!
//! - [`structures`]: on-disk records (local and central headers, data
//!   descriptors, end of central directory, ZIP64 records) and their encoders
//! - [`parser`]: locates the end records and parses the central directory
//! - [`reader`]: yields entries in the order they sit in the file, decoding
//!   stored and deflated payloads and checking length and CRC-32
//! - [`writer`]: writes new entries and patches their local headers once the
//!   sizes are known, copies raw records, then emits the central directory
//!   and end records
//!
//! ZIP64 records are read whenever present and written only when a size,
//! offset or count no longer fits the classic fields. Split archives and
//! decryption are not handled; encrypted or unknown-method entries can
//! still be copied through.

pub mod parser;
pub mod reader;
pub mod structures;
pub mod writer;

/// Chunk size used when streaming entry data
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

pub use parser::ZipParser;
pub use reader::{RawEntry, ZipEntry, ZipReader};
pub use structures::*;
pub use writer::{ZipWriter, copy_chunks};
