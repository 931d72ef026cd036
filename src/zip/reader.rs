//! Streaming entry reader.
//!
//! [`ZipReader`] yields entries one at a time in the physical order of their
//! data in the file. Each [`ZipEntry`] decodes its payload through [`Read`];
//! the sizes it reports are the ones counted while decoding, so they only
//! become available once the payload has been read to the end. An entry
//! that is not decoded can instead be handed over whole, as a [`RawEntry`],
//! for copy-through into another archive.

use flate2::read::DeflateDecoder;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::{ArchiveError, Result};
use crate::io::{LocalFileReader, ReadAt, SectionReader};

use super::parser::{LocalRecord, ZipParser};
use super::structures::{CompressionMethod, ZipFileEntry};

/// Sequential reader over the entries of a ZIP archive.
pub struct ZipReader<R: ReadAt> {
    parser: ZipParser<R>,
    pending: std::vec::IntoIter<ZipFileEntry>,
    comment: Vec<u8>,
}

impl ZipReader<LocalFileReader> {
    /// Open an archive on the local filesystem.
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(Arc::new(LocalFileReader::new(path)?))
    }
}

impl<R: ReadAt> ZipReader<R> {
    pub fn new(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let mut directory = parser.central_directory()?;
        directory.entries.sort_by_key(|e| e.lfh_offset);

        Ok(Self {
            parser,
            pending: directory.entries.into_iter(),
            comment: directory.comment,
        })
    }

    /// Archive comment stored after the end of central directory record
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Advance to the next entry, or `None` once the archive is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<ZipEntry<R>>> {
        let Some(header) = self.pending.next() else {
            return Ok(None);
        };

        let record = self.parser.locate(&header)?;
        log::debug!(
            "entry {} at offset {} ({} bytes compressed)",
            header.file_name,
            record.data_offset,
            header.compressed_size
        );

        Ok(Some(ZipEntry {
            header,
            record,
            reader: self.parser.reader().clone(),
            decoder: None,
            hasher: crc32fast::Hasher::new(),
            bytes_out: 0,
            sizes: None,
        }))
    }
}

impl<R: ReadAt> Iterator for ZipReader<R> {
    type Item = Result<ZipEntry<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

enum Decoder<R: ReadAt> {
    Stored(SectionReader<R>),
    Deflate(DeflateDecoder<SectionReader<R>>),
}

/// One entry of an archive, readable as its decoded content.
pub struct ZipEntry<R: ReadAt> {
    header: ZipFileEntry,
    record: LocalRecord,
    reader: Arc<R>,
    decoder: Option<Decoder<R>>,
    hasher: crc32fast::Hasher,
    bytes_out: u64,
    /// (uncompressed, compressed), set when the payload has been fully read
    sizes: Option<(u64, u64)>,
}

impl<R: ReadAt> ZipEntry<R> {
    pub fn name(&self) -> &str {
        &self.header.file_name
    }

    pub fn is_dir(&self) -> bool {
        self.header.is_directory
    }

    /// Central directory record of this entry
    pub fn header(&self) -> &ZipFileEntry {
        &self.header
    }

    /// Decoded size; `None` until the entry has been read to the end
    pub fn uncompressed_size(&self) -> Option<u64> {
        self.sizes.map(|(uncompressed, _)| uncompressed)
    }

    /// Bytes of payload consumed; `None` until the entry has been read to the end
    pub fn compressed_size(&self) -> Option<u64> {
        self.sizes.map(|(_, compressed)| compressed)
    }

    /// Give up decoding and expose the whole local record for copy-through.
    pub fn into_raw(self) -> RawEntry<R> {
        let record = SectionReader::new(self.reader, self.header.lfh_offset, self.record.len);
        RawEntry {
            header: self.header,
            record,
        }
    }

    fn section(&self) -> SectionReader<R> {
        SectionReader::new(
            self.reader.clone(),
            self.record.data_offset,
            self.header.compressed_size,
        )
    }

    fn decoder(&mut self) -> io::Result<&mut Decoder<R>> {
        if self.decoder.is_none() {
            if self.header.is_encrypted() {
                return Err(invalid_data(format!(
                    "{} is encrypted",
                    self.header.file_name
                )));
            }
            let decoder = match self.header.compression_method {
                CompressionMethod::Stored => Decoder::Stored(self.section()),
                CompressionMethod::Deflate => Decoder::Deflate(DeflateDecoder::new(self.section())),
                CompressionMethod::Unknown(method) => {
                    return Err(io::Error::other(ArchiveError::UnsupportedCompression(method)));
                }
            };
            self.decoder = Some(decoder);
        }

        // Initialised just above
        self.decoder
            .as_mut()
            .ok_or_else(|| io::Error::other("decoder unavailable"))
    }

    /// Verify the decoded payload against the central directory and record sizes.
    fn finish(&mut self) -> io::Result<()> {
        let compressed = match &self.decoder {
            Some(Decoder::Stored(section)) => self.header.compressed_size - section.remaining(),
            Some(Decoder::Deflate(decoder)) => decoder.total_in(),
            None => 0,
        };

        if self.bytes_out != self.header.uncompressed_size {
            return Err(invalid_data(format!(
                "{}: expected {} bytes, decoded {}",
                self.header.file_name, self.header.uncompressed_size, self.bytes_out
            )));
        }

        let crc = std::mem::take(&mut self.hasher).finalize();
        if crc != self.header.crc32 {
            return Err(invalid_data(format!(
                "{}: CRC mismatch (expected {:08x}, got {:08x})",
                self.header.file_name, self.header.crc32, crc
            )));
        }

        self.sizes = Some((self.bytes_out, compressed));
        Ok(())
    }
}

impl<R: ReadAt> Read for ZipEntry<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sizes.is_some() || buf.is_empty() {
            return Ok(0);
        }

        let n = match self.decoder()? {
            Decoder::Stored(section) => section.read(buf)?,
            Decoder::Deflate(decoder) => decoder.read(buf)?,
        };

        if n == 0 {
            self.finish()?;
            return Ok(0);
        }

        // Refuse to inflate past the declared size
        if self.bytes_out + n as u64 > self.header.uncompressed_size {
            return Err(invalid_data(format!(
                "{}: data exceeds declared size of {} bytes",
                self.header.file_name, self.header.uncompressed_size
            )));
        }

        self.hasher.update(&buf[..n]);
        self.bytes_out += n as u64;
        Ok(n)
    }
}

/// Local record of an entry (header, payload, data descriptor) as stored,
/// together with its central directory record.
pub struct RawEntry<R: ReadAt> {
    pub header: ZipFileEntry,
    pub record: SectionReader<R>,
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, ArchiveError::InvalidArchive(msg))
}
