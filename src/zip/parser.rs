//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! The central directory is the authoritative source for where each
//! entry's data ends; local headers of streamed entries carry zero sizes.
//! A local record spans the header, the payload and, for streamed entries,
//! the trailing data descriptor.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::sync::Arc;

use crate::error::{ArchiveError, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Entries of an archive together with its trailing comment
pub struct CentralDirectory {
    pub entries: Vec<ZipFileEntry>,
    pub comment: Vec<u8>,
}

/// Where an entry's bytes sit in the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalRecord {
    /// Start of the payload
    pub data_offset: u64,
    /// Length of header, payload and data descriptor together
    pub len: u64,
}

/// Low-level ZIP file parser.
///
/// Typically used through [`ZipReader`](super::ZipReader)
/// rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidArchive`] if no valid EOCD can be found.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(ArchiveError::invalid("file too small to be a zip archive"));
        }

        // Fast path: no archive comment
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf)?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // The EOCD could be earlier if there's a ZIP comment.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf)?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length field should match the remaining bytes.
                let comment_len = read_u16_at(&buf, i + 20)? as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ArchiveError::invalid("end of central directory not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| ArchiveError::invalid("missing ZIP64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator_buf)?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;
        if locator.total_disks > 1 {
            return Err(ArchiveError::invalid("split archives are not supported"));
        }

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Parse the whole central directory.
    ///
    /// Entries are returned in central directory order, which is not
    /// necessarily the physical order of their data.
    pub fn central_directory(&self) -> Result<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let mut comment = vec![0u8; eocd.comment_len as usize];
        self.reader
            .read_exact_at(eocd_offset + EndOfCentralDirectory::SIZE as u64, &mut comment)?;

        if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
            return Err(ArchiveError::invalid("split archives are not supported"));
        }

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.saturating_add(cd_size) > eocd_offset {
            return Err(ArchiveError::invalid("central directory out of bounds"));
        }
        // Every header needs at least CDFH_MIN_SIZE bytes
        if total_entries > cd_size / CDFH_MIN_SIZE as u64 {
            return Err(ArchiveError::invalid("central directory entry count too large"));
        }

        // Read the entire Central Directory in one request
        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data)?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..total_entries {
            let entry = self.parse_cdfh(&mut cursor)?;
            if entry.lfh_offset >= cd_offset {
                return Err(ArchiveError::invalid(format!(
                    "local header of {} points past the data area",
                    entry.file_name
                )));
            }
            entries.push(entry);
        }

        Ok(CentralDirectory { entries, comment })
    }

    /// Parse a Central Directory File Header from a cursor.
    fn parse_cdfh(&self, cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let sig = read_bytes(cursor, 4)?;
        if sig != CDFH_SIGNATURE {
            return Err(ArchiveError::invalid("invalid central directory file header"));
        }

        let version_made_by = cursor.read_u16::<LittleEndian>()?;
        let version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let name_raw = read_bytes(cursor, file_name_length as usize)?;
        // Use lossy conversion to handle non-UTF8 filenames gracefully
        let file_name = String::from_utf8_lossy(&name_raw).into_owned();

        // Directory entries end with '/'
        let is_directory = file_name.ends_with('/');

        let raw_extra = read_bytes(cursor, extra_field_length as usize)?;
        let mut extra = Cursor::new(raw_extra.as_slice());
        let extra_end = extra_field_length as u64;
        let mut other_fields = Vec::with_capacity(raw_extra.len());
        let mut zip64 = Zip64Fields::default();

        while extra.position() + 4 <= extra_end {
            let field_start = extra.position() as usize;
            let header_id = extra.read_u16::<LittleEndian>()?;
            let field_size = extra.read_u16::<LittleEndian>()? as u64;
            let field_end = (extra.position() + field_size).min(extra_end);

            if header_id == ZIP64_EXTRA_ID {
                // Fields are present only if corresponding header field is 0xFFFFFFFF
                if uncompressed_size == ZIP64_MARKER_32 as u64 && extra.position() + 8 <= field_end {
                    uncompressed_size = extra.read_u64::<LittleEndian>()?;
                    zip64.uncompressed = true;
                }
                if compressed_size == ZIP64_MARKER_32 as u64 && extra.position() + 8 <= field_end {
                    compressed_size = extra.read_u64::<LittleEndian>()?;
                    zip64.compressed = true;
                }
                if lfh_offset == ZIP64_MARKER_32 as u64 && extra.position() + 8 <= field_end {
                    lfh_offset = extra.read_u64::<LittleEndian>()?;
                    zip64.offset = true;
                }
            } else {
                other_fields.extend_from_slice(&raw_extra[field_start..field_end as usize]);
            }
            extra.set_position(field_end);
        }
        // Trailing bytes too short to form a field are kept as they are
        other_fields.extend_from_slice(&raw_extra[extra.position() as usize..]);

        let comment = read_bytes(cursor, file_comment_length as usize)?;

        Ok(ZipFileEntry {
            file_name,
            name_raw,
            version_made_by,
            version_needed,
            flags,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            internal_attrs,
            external_attrs,
            extra: other_fields,
            comment,
            zip64,
            is_directory,
        })
    }

    /// Locate an entry's payload and the full extent of its local record.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry, so
    /// it is read to find where the payload begins. Streamed entries are
    /// followed by a data descriptor whose width depends on ZIP64.
    pub fn locate(&self, entry: &ZipFileEntry) -> Result<LocalRecord> {
        let mut fixed = [0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut fixed)?;
        let (name_len, extra_len) = LocalFileHeader::variable_lengths(&fixed).map_err(|_| {
            ArchiveError::invalid(format!("bad local file header for {}", entry.file_name))
        })?;

        let extra_offset = entry.lfh_offset + LFH_SIZE as u64 + name_len;
        let mut local_extra = vec![0u8; extra_len as usize];
        self.reader.read_exact_at(extra_offset, &mut local_extra)?;

        let data_offset = extra_offset + extra_len;
        let mut end = data_offset.saturating_add(entry.compressed_size);

        if entry.flags & FLAG_DATA_DESCRIPTOR != 0 && end < self.size {
            let zip64 = has_extra_block(&local_extra, ZIP64_EXTRA_ID)
                || entry.compressed_size >= ZIP64_MARKER_32 as u64
                || entry.uncompressed_size >= ZIP64_MARKER_32 as u64;
            let mut lead = [0u8; 4];
            let n = self.reader.read_at(end, &mut lead)?;
            end = end.saturating_add(data_descriptor_len(&lead[..n], zip64));
        }

        if end > self.size {
            return Err(ArchiveError::invalid(format!(
                "data of {} extends past end of archive",
                entry.file_name
            )));
        }

        Ok(LocalRecord {
            data_offset,
            len: end - entry.lfh_offset,
        })
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}
