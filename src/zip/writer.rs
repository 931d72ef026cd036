//! ZIP writer.
//!
//! New entries are written with a placeholder local header; once the payload
//! is complete the writer seeks back and fills in the CRC and sizes, so no
//! data descriptor is needed. Entries copied from another archive are written
//! exactly as they were stored. The central directory and end records are
//! written by [`ZipWriter::finish`].

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{ArchiveError, Result};
use crate::io::ReadAt;

use super::reader::RawEntry;
use super::structures::*;

/// Unix mode bits recorded for regular files (rw-r--r--)
const FILE_ATTRS: u32 = 0o100644 << 16;
/// Unix mode bits (rwxr-xr-x) plus the MS-DOS directory bit
const DIR_ATTRS: u32 = (0o040755 << 16) | 0x10;

/// Entries expected to come close to 4 GiB reserve ZIP64 space up front
const ZIP64_RESERVE_THRESHOLD: u64 = 0xF000_0000;

/// Writer that tracks how many bytes went through it
struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Seek> CountingWriter<W> {
    /// Overwrite bytes already written, then return to the end
    fn patch(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(bytes)?;
        self.inner.seek(SeekFrom::Start(self.count))?;
        Ok(())
    }
}

/// Entry currently receiving payload bytes
struct OpenEntry {
    header: ZipFileEntry,
    hasher: crc32fast::Hasher,
    bytes_in: u64,
    bytes_out: u64,
    encoder: Option<DeflateEncoder<Vec<u8>>>,
}

/// ZIP archive writer over a seekable sink.
///
/// The sink must be empty and positioned at its start.
pub struct ZipWriter<W: Write + Seek> {
    out: CountingWriter<W>,
    entries: Vec<ZipFileEntry>,
    current: Option<OpenEntry>,
    comment: Vec<u8>,
}

impl<W: Write + Seek> ZipWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: CountingWriter { inner, count: 0 },
            entries: Vec::new(),
            current: None,
            comment: Vec::new(),
        }
    }

    /// Archive comment written after the end of central directory record
    pub fn set_comment(&mut self, comment: Vec<u8>) {
        self.comment = comment;
    }

    /// Begin a new entry; payload bytes are supplied through [`Write`].
    ///
    /// `size_hint` is the expected uncompressed size. Entries that may not
    /// fit in 32 bits get ZIP64 fields from the start. An entry still open
    /// is finished first.
    pub fn start_entry(
        &mut self,
        name: &str,
        method: CompressionMethod,
        modified: DosDateTime,
        size_hint: u64,
    ) -> Result<()> {
        self.finish_entry()?;

        let encoder = match method {
            CompressionMethod::Stored => None,
            CompressionMethod::Deflate => {
                Some(DeflateEncoder::new(Vec::new(), Compression::default()))
            }
            CompressionMethod::Unknown(m) => return Err(ArchiveError::UnsupportedCompression(m)),
        };

        let zip64 = size_hint >= ZIP64_RESERVE_THRESHOLD;
        let mut header = ZipFileEntry::new(name);
        header.compression_method = method;
        header.lfh_offset = self.out.count;
        header.last_mod_time = modified.time;
        header.last_mod_date = modified.date;
        header.external_attrs = if header.is_directory { DIR_ATTRS } else { FILE_ATTRS };
        if zip64 {
            header.version_needed = VERSION_ZIP64;
            header.zip64.uncompressed = true;
            header.zip64.compressed = true;
        }
        LocalFileHeader::placeholder(&header, zip64).write_to(&mut self.out)?;

        self.current = Some(OpenEntry {
            header,
            hasher: crc32fast::Hasher::new(),
            bytes_in: 0,
            bytes_out: 0,
            encoder,
        });
        Ok(())
    }

    /// Close the open entry, if any, and fill in its local header.
    pub fn finish_entry(&mut self) -> Result<()> {
        let Some(mut entry) = self.current.take() else {
            return Ok(());
        };

        if let Some(encoder) = entry.encoder.take() {
            let tail = encoder.finish()?;
            self.out.write_all(&tail)?;
            entry.bytes_out += tail.len() as u64;
        }

        let mut header = entry.header;
        header.crc32 = entry.hasher.finalize();
        header.uncompressed_size = entry.bytes_in;
        header.compressed_size = entry.bytes_out;

        let reserved = header.zip64.compressed;
        let too_large = header.compressed_size >= ZIP64_MARKER_32 as u64
            || header.uncompressed_size >= ZIP64_MARKER_32 as u64;
        if too_large && !reserved {
            return Err(ArchiveError::invalid(format!(
                "{} grew past 4 GiB without ZIP64 fields",
                header.file_name
            )));
        }

        let mut fields = Vec::with_capacity(12);
        fields.extend_from_slice(&header.crc32.to_le_bytes());
        if reserved {
            fields.extend_from_slice(&ZIP64_MARKER_32.to_le_bytes());
            fields.extend_from_slice(&ZIP64_MARKER_32.to_le_bytes());
        } else {
            fields.extend_from_slice(&(header.compressed_size as u32).to_le_bytes());
            fields.extend_from_slice(&(header.uncompressed_size as u32).to_le_bytes());
        }
        self.out
            .patch(header.lfh_offset + LocalFileHeader::CRC_OFFSET, &fields)?;

        if reserved {
            // ZIP64 block data follows its 4-byte header after the name
            let block = header.lfh_offset + LFH_SIZE as u64 + header.name_raw.len() as u64 + 4;
            let mut sizes = Vec::with_capacity(16);
            sizes.extend_from_slice(&header.uncompressed_size.to_le_bytes());
            sizes.extend_from_slice(&header.compressed_size.to_le_bytes());
            self.out.patch(block, &sizes)?;
        }

        log::debug!(
            "wrote {} ({} -> {} bytes)",
            header.file_name,
            header.uncompressed_size,
            header.compressed_size
        );
        self.entries.push(header);
        Ok(())
    }

    /// Copy an entry from another archive exactly as it was stored.
    pub fn copy_raw<R: ReadAt>(&mut self, raw: RawEntry<R>) -> Result<()> {
        self.finish_entry()?;

        let RawEntry { mut header, mut record } = raw;
        let expected = record.remaining();
        header.lfh_offset = self.out.count;

        let copied = copy_chunks(&mut record, &mut self.out)?;
        if copied != expected {
            return Err(ArchiveError::invalid(format!(
                "{}: copied {} of {} bytes",
                header.file_name, copied, expected
            )));
        }

        log::debug!("copied {} ({} bytes raw)", header.file_name, copied);
        self.entries.push(header);
        Ok(())
    }

    /// Write the central directory and end records, returning the sink.
    pub fn finish(mut self) -> Result<W> {
        self.finish_entry()?;

        let cd_offset = self.out.count;
        for entry in &self.entries {
            entry.write_central_header(&mut self.out)?;
        }
        let cd_size = self.out.count - cd_offset;
        let total = self.entries.len() as u64;

        let zip64 = total >= ZIP64_MARKER_16 as u64
            || cd_size >= ZIP64_MARKER_32 as u64
            || cd_offset >= ZIP64_MARKER_32 as u64;

        let mut eocd = if zip64 {
            let eocd64_offset = self.out.count;
            Zip64EOCD::new(total, cd_size, cd_offset).write_to(&mut self.out)?;
            Zip64EOCDLocator {
                disk_with_eocd64: 0,
                eocd64_offset,
                total_disks: 1,
            }
            .write_to(&mut self.out)?;

            EndOfCentralDirectory {
                disk_entries: ZIP64_MARKER_16,
                total_entries: ZIP64_MARKER_16,
                cd_size: ZIP64_MARKER_32,
                cd_offset: ZIP64_MARKER_32,
                ..Default::default()
            }
        } else {
            EndOfCentralDirectory {
                disk_entries: total as u16,
                total_entries: total as u16,
                cd_size: cd_size as u32,
                cd_offset: cd_offset as u32,
                ..Default::default()
            }
        };
        eocd.comment = std::mem::take(&mut self.comment);
        eocd.write_to(&mut self.out)?;
        self.out.flush()?;

        Ok(self.out.inner)
    }
}

impl<W: Write + Seek> Write for ZipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(entry) = self.current.as_mut() else {
            return Err(io::Error::other("no entry started"));
        };

        match entry.encoder.as_mut() {
            Some(encoder) => {
                encoder.write_all(buf)?;
                // Drain whatever the encoder has produced so far
                let produced = std::mem::take(encoder.get_mut());
                self.out.write_all(&produced)?;
                entry.bytes_out += produced.len() as u64;
            }
            None => {
                self.out.write_all(buf)?;
                entry.bytes_out += buf.len() as u64;
            }
        }

        entry.hasher.update(buf);
        entry.bytes_in += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Copy everything from `reader` to `writer` in fixed-size chunks.
pub fn copy_chunks<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
) -> io::Result<u64> {
    let mut buffer = [0u8; super::COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let len = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..len])?;
        total += len as u64;
    }
}
