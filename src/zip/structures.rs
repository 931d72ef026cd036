use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ArchiveError, Result};

/// Marker stored in 16-bit fields that overflowed into ZIP64 records
pub const ZIP64_MARKER_16: u16 = 0xFFFF;
/// Marker stored in 32-bit fields that overflowed into ZIP64 records
pub const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;
/// Header ID of the ZIP64 extended information extra field
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// General purpose flag: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 1 << 0;
/// General purpose flag: sizes and CRC follow the data in a data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
/// General purpose flag: name is UTF-8
pub const FLAG_UTF8: u16 = 1 << 11;

/// "Version needed to extract" for plain deflate/stored entries (2.0)
pub const VERSION_DEFAULT: u16 = 20;
/// "Version needed to extract" when ZIP64 records are used (4.5)
pub const VERSION_ZIP64: u16 = 45;
/// "Version made by": upper byte 3 = Unix
pub const VERSION_MADE_BY: u16 = (3 << 8) | VERSION_ZIP64;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    Stored,
    #[default]
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompressionMethod::Stored => "Stored",
            CompressionMethod::Deflate => "Defl:N",
            CompressionMethod::Unknown(_) => "Unk",
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, Default)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
    /// Archive comment; filled in by the parser, written back by the writer
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ArchiveError::invalid("invalid end of central directory"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
            comment: Vec::new(),
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == ZIP64_MARKER_16
            || self.total_entries == ZIP64_MARKER_16
            || self.cd_size == ZIP64_MARKER_32
            || self.cd_offset == ZIP64_MARKER_32
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.disk_number)?;
        w.write_u16::<LittleEndian>(self.disk_with_cd)?;
        w.write_u16::<LittleEndian>(self.disk_entries)?;
        w.write_u16::<LittleEndian>(self.total_entries)?;
        w.write_u32::<LittleEndian>(self.cd_size)?;
        w.write_u32::<LittleEndian>(self.cd_offset)?;
        w.write_u16::<LittleEndian>(field_len(&self.comment, "archive comment")?)?;
        w.write_all(&self.comment)
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ArchiveError::invalid("invalid ZIP64 locator"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u32::<LittleEndian>(self.disk_with_eocd64)?;
        w.write_u64::<LittleEndian>(self.eocd64_offset)?;
        w.write_u32::<LittleEndian>(self.total_disks)
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
#[derive(Debug, Clone)]
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn new(total_entries: u64, cd_size: u64, cd_offset: u64) -> Self {
        Self {
            // Size of the remaining record, excluding signature and this field
            eocd64_size: (Self::MIN_SIZE - 12) as u64,
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_ZIP64,
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: total_entries,
            total_entries,
            cd_size,
            cd_offset,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ArchiveError::invalid("invalid ZIP64 end of central directory"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u64::<LittleEndian>(self.eocd64_size)?;
        w.write_u16::<LittleEndian>(self.version_made_by)?;
        w.write_u16::<LittleEndian>(self.version_needed)?;
        w.write_u32::<LittleEndian>(self.disk_number)?;
        w.write_u32::<LittleEndian>(self.disk_with_cd)?;
        w.write_u64::<LittleEndian>(self.disk_entries)?;
        w.write_u64::<LittleEndian>(self.total_entries)?;
        w.write_u64::<LittleEndian>(self.cd_size)?;
        w.write_u64::<LittleEndian>(self.cd_offset)
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Data descriptor, optionally preceded by this signature
pub const DATA_DESCRIPTOR_SIGNATURE: &[u8] = b"PK\x07\x08";

/// Fields of a central directory record that live in its ZIP64 extra block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64Fields {
    pub uncompressed: bool,
    pub compressed: bool,
    pub offset: bool,
}

/// Parsed ZIP file entry information, as recorded in the central directory.
///
/// Everything the record carries is kept so it can be written back
/// unchanged; only the local header offset and the ZIP64 block that may
/// hold it are recomputed.
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    /// Name for display and matching; names that are not UTF-8 are decoded lossily
    pub file_name: String,
    /// Name exactly as stored
    pub name_raw: Vec<u8>,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    /// Central extra field with the ZIP64 block taken out
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    pub zip64: Zip64Fields,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// A fresh record for a UTF-8 named entry, with every size still zero
    pub fn new(name: &str) -> Self {
        Self {
            file_name: name.to_string(),
            name_raw: name.as_bytes().to_vec(),
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_DEFAULT,
            flags: FLAG_UTF8,
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: 0,
            last_mod_time: DosDateTime::MIN.time,
            last_mod_date: DosDateTime::MIN.date,
            internal_attrs: 0,
            external_attrs: 0,
            extra: Vec::new(),
            comment: Vec::new(),
            zip64: Zip64Fields::default(),
            is_directory: name.ends_with('/'),
        }
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Serialize this entry as a central directory file header.
    ///
    /// A field goes into the ZIP64 block if it was there when the record
    /// was read or if it no longer fits in 32 bits. The block is written
    /// ahead of the other extra fields.
    pub fn write_central_header<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let overflows = |v: u64| v >= ZIP64_MARKER_32 as u64;
        let in_block = Zip64Fields {
            uncompressed: self.zip64.uncompressed || overflows(self.uncompressed_size),
            compressed: self.zip64.compressed || overflows(self.compressed_size),
            offset: self.zip64.offset || overflows(self.lfh_offset),
        };

        let mut block = Vec::new();
        if in_block.uncompressed {
            block.write_u64::<LittleEndian>(self.uncompressed_size)?;
        }
        if in_block.compressed {
            block.write_u64::<LittleEndian>(self.compressed_size)?;
        }
        if in_block.offset {
            block.write_u64::<LittleEndian>(self.lfh_offset)?;
        }

        let mut extra = Vec::with_capacity(4 + block.len() + self.extra.len());
        let version_needed = if block.is_empty() {
            self.version_needed
        } else {
            extra.write_u16::<LittleEndian>(ZIP64_EXTRA_ID)?;
            extra.write_u16::<LittleEndian>(block.len() as u16)?;
            extra.extend_from_slice(&block);
            self.version_needed.max(VERSION_ZIP64)
        };
        extra.extend_from_slice(&self.extra);

        let field32 = |v: u64, zip64: bool| if zip64 { ZIP64_MARKER_32 } else { v as u32 };

        w.write_all(CDFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.version_made_by)?;
        w.write_u16::<LittleEndian>(version_needed)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        w.write_u16::<LittleEndian>(self.last_mod_time)?;
        w.write_u16::<LittleEndian>(self.last_mod_date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(field32(self.compressed_size, in_block.compressed))?;
        w.write_u32::<LittleEndian>(field32(self.uncompressed_size, in_block.uncompressed))?;
        w.write_u16::<LittleEndian>(field_len(&self.name_raw, "entry name")?)?;
        w.write_u16::<LittleEndian>(field_len(&extra, "extra field")?)?;
        w.write_u16::<LittleEndian>(field_len(&self.comment, "entry comment")?)?;
        w.write_u16::<LittleEndian>(0)?; // disk number start
        w.write_u16::<LittleEndian>(self.internal_attrs)?;
        w.write_u32::<LittleEndian>(self.external_attrs)?;
        w.write_u32::<LittleEndian>(field32(self.lfh_offset, in_block.offset))?;
        w.write_all(&self.name_raw)?;
        w.write_all(&extra)?;
        w.write_all(&self.comment)
    }
}

/// Local File Header preceding each entry's data
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_raw: Vec<u8>,
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Offset of the CRC-32 field from the start of the header
    pub const CRC_OFFSET: u64 = 14;

    /// Read the lengths of the name and extra field from the fixed part
    pub fn variable_lengths(fixed: &[u8]) -> Result<(u64, u64)> {
        if fixed.len() < LFH_SIZE || &fixed[0..4] != LFH_SIGNATURE {
            return Err(ArchiveError::invalid("invalid local file header"));
        }

        let mut cursor = Cursor::new(&fixed[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok((file_name_length, extra_field_length))
    }

    /// Header for a new entry whose CRC and sizes are patched in later.
    ///
    /// With `zip64` the size fields hold the marker and a zeroed ZIP64
    /// block is reserved right after the name.
    pub fn placeholder(entry: &ZipFileEntry, zip64: bool) -> Self {
        let (size, extra) = if zip64 {
            let mut extra = Vec::with_capacity(20);
            extra.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
            extra.extend_from_slice(&16u16.to_le_bytes());
            extra.extend_from_slice(&[0u8; 16]);
            (ZIP64_MARKER_32, extra)
        } else {
            (0, Vec::new())
        };

        Self {
            version_needed: entry.version_needed,
            flags: entry.flags,
            compression_method: entry.compression_method,
            last_mod_time: entry.last_mod_time,
            last_mod_date: entry.last_mod_date,
            crc32: 0,
            compressed_size: size,
            uncompressed_size: size,
            name_raw: entry.name_raw.clone(),
            extra,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(LFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.version_needed)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        w.write_u16::<LittleEndian>(self.last_mod_time)?;
        w.write_u16::<LittleEndian>(self.last_mod_date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(field_len(&self.name_raw, "entry name")?)?;
        w.write_u16::<LittleEndian>(field_len(&self.extra, "extra field")?)?;
        w.write_all(&self.name_raw)?;
        w.write_all(&self.extra)
    }
}

/// Length of the data descriptor that follows a streamed entry.
///
/// `lead` is the first four bytes after the payload, which hold the
/// optional signature. Sizes are 8 bytes wide for ZIP64 entries.
pub fn data_descriptor_len(lead: &[u8], zip64: bool) -> u64 {
    let signature = if lead == DATA_DESCRIPTOR_SIGNATURE { 4 } else { 0 };
    let sizes = if zip64 { 16 } else { 8 };
    signature + 4 + sizes
}

/// Whether an extra field contains a block with the given header ID
pub fn has_extra_block(extra: &[u8], id: u16) -> bool {
    let mut pos = 0usize;
    while pos + 4 <= extra.len() {
        let header_id = u16::from_le_bytes([extra[pos], extra[pos + 1]]);
        let size = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;
        if header_id == id {
            return true;
        }
        pos += 4 + size;
    }
    false
}

fn field_len(field: &[u8], what: &str) -> io::Result<u16> {
    u16::try_from(field.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("{what} too long")))
}

/// Read a fixed-size little-endian record field by field
pub(crate) fn read_u16_at(data: &[u8], pos: usize) -> Result<u16> {
    let mut cursor = Cursor::new(data.get(pos..).unwrap_or_default());
    Ok(cursor.read_u16::<LittleEndian>()?)
}

/// Read a variable-length byte field from a cursor
pub(crate) fn read_bytes<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// MS-DOS date and time pair as stored in ZIP headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable timestamp
    pub const MIN: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Convert a UTC timestamp; values outside 1980..=2107 are clamped to [`Self::MIN`]
    pub fn from_system_time(t: SystemTime) -> Self {
        let Ok(since_epoch) = t.duration_since(UNIX_EPOCH) else {
            return Self::MIN;
        };
        let secs = since_epoch.as_secs();
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;
        let (year, month, day) = civil_from_days(days);
        if !(1980..=2107).contains(&year) {
            return Self::MIN;
        }

        let hour = (rem / 3600) as u16;
        let minute = ((rem % 3600) / 60) as u16;
        let second = (rem % 60) as u16;

        DosDateTime {
            time: (hour << 11) | (minute << 5) | (second / 2),
            date: (((year - 1980) as u16) << 9) | ((month as u16) << 5) | day as u16,
        }
    }
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_compression_method_codes() {
        assert_eq!(CompressionMethod::from_u16(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_u16(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from_u16(12), CompressionMethod::Unknown(12));
        assert_eq!(CompressionMethod::Unknown(12).as_u16(), 12);
    }

    #[test]
    fn test_eocd_layout() {
        let eocd = EndOfCentralDirectory {
            disk_entries: 2,
            total_entries: 2,
            cd_size: 100,
            cd_offset: 200,
            ..Default::default()
        };
        let mut buf = Vec::new();
        eocd.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), EndOfCentralDirectory::SIZE);

        let parsed = EndOfCentralDirectory::from_bytes(&buf).unwrap();
        assert_eq!(parsed.total_entries, 2);
        assert_eq!(parsed.cd_offset, 200);
        assert!(!parsed.is_zip64());
    }

    #[test]
    fn test_zip64_records_have_fixed_sizes() {
        let mut buf = Vec::new();
        Zip64EOCD::new(70_000, 1, 2).write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), Zip64EOCD::MIN_SIZE);

        let mut loc = Vec::new();
        Zip64EOCDLocator {
            disk_with_eocd64: 0,
            eocd64_offset: 5,
            total_disks: 1,
        }
        .write_to(&mut loc)
        .unwrap();
        assert_eq!(loc.len(), Zip64EOCDLocator::SIZE);
        assert_eq!(Zip64EOCDLocator::from_bytes(&loc).unwrap().eocd64_offset, 5);
    }

    #[test]
    fn test_local_header_lengths() {
        let entry = ZipFileEntry::new("dir/file.txt");
        let mut buf = Vec::new();
        LocalFileHeader::placeholder(&entry, true).write_to(&mut buf).unwrap();

        let (name_len, extra_len) = LocalFileHeader::variable_lengths(&buf).unwrap();
        assert_eq!(name_len, 12);
        assert_eq!(extra_len, 20);
        assert_eq!(buf.len() as u64, LFH_SIZE as u64 + name_len + extra_len);
        assert_eq!(read_u16_at(&buf, 6).unwrap(), FLAG_UTF8);
        assert!(has_extra_block(&buf[LFH_SIZE + 12..], ZIP64_EXTRA_ID));
    }

    #[test]
    fn test_data_descriptor_widths() {
        assert_eq!(data_descriptor_len(DATA_DESCRIPTOR_SIGNATURE, false), 16);
        assert_eq!(data_descriptor_len(DATA_DESCRIPTOR_SIGNATURE, true), 24);
        assert_eq!(data_descriptor_len(b"\x12\x34\x56\x78", false), 12);
    }

    #[test]
    fn test_central_header_keeps_foreign_fields() {
        let mut entry = ZipFileEntry::new("doc.txt");
        entry.version_made_by = 20; // MS-DOS host
        entry.flags = 0;
        entry.internal_attrs = 1;
        entry.external_attrs = 0x20;
        entry.extra = vec![0x55, 0x54, 0x01, 0x00, 0x03];
        entry.comment = b"note".to_vec();

        let mut buf = Vec::new();
        entry.write_central_header(&mut buf).unwrap();
        assert_eq!(read_u16_at(&buf, 4).unwrap(), 20);
        assert_eq!(read_u16_at(&buf, 30).unwrap(), 5);
        assert_eq!(read_u16_at(&buf, 32).unwrap(), 4);
        assert_eq!(read_u16_at(&buf, 36).unwrap(), 1);
        assert!(buf.ends_with(b"doc.txtUT\x01\x00\x03note"));

        // Moving past 4 GiB adds a ZIP64 block in front of the other fields
        entry.lfh_offset = 5 << 30;
        let mut buf = Vec::new();
        entry.write_central_header(&mut buf).unwrap();
        assert_eq!(read_u16_at(&buf, 6).unwrap(), VERSION_ZIP64);
        assert_eq!(read_u16_at(&buf, 30).unwrap(), 4 + 8 + 5);
        assert!(has_extra_block(&buf[CDFH_MIN_SIZE + 7..], ZIP64_EXTRA_ID));
    }

    #[test]
    fn test_dos_date_time() {
        // 2024-02-29 13:45:30 UTC
        let t = UNIX_EPOCH + Duration::from_secs(1_709_214_330);
        let dos = DosDateTime::from_system_time(t);
        let mut entry = ZipFileEntry::new("");
        entry.last_mod_time = dos.time;
        entry.last_mod_date = dos.date;
        assert_eq!(entry.mod_date(), (2024, 2, 29));
        assert_eq!(entry.mod_time(), (13, 45, 30));

        assert_eq!(DosDateTime::from_system_time(UNIX_EPOCH), DosDateTime::MIN);
    }
}
