use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
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

    /// Pick a method for a member by its file name.
    ///
    /// Formats that are already compressed gain nothing from DEFLATE and
    /// are stored as-is.
    pub fn for_file_name(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "mp3" | "mp4" | "ogg" | "wav" | "ogv"
            | "webm" | "unity3d" | "zip" | "7z" | "rar" => CompressionMethod::Stored,
            _ => CompressionMethod::Deflate,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes plus the archive comment
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(invalid("Invalid End of Central Directory"));
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
        })
    }

    /// Serialize the record; the comment itself follows it on disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(Self::SIGNATURE);
        // Writes into a Vec cannot fail
        let _ = buf.write_u16::<LittleEndian>(self.disk_number);
        let _ = buf.write_u16::<LittleEndian>(self.disk_with_cd);
        let _ = buf.write_u16::<LittleEndian>(self.disk_entries);
        let _ = buf.write_u16::<LittleEndian>(self.total_entries);
        let _ = buf.write_u32::<LittleEndian>(self.cd_size);
        let _ = buf.write_u32::<LittleEndian>(self.cd_offset);
        let _ = buf.write_u16::<LittleEndian>(self.comment_len);
        buf
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
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
            return Err(invalid("Invalid ZIP64 format"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
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

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(invalid("Invalid ZIP64 format"));
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
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// General purpose flag: file name is UTF-8
pub const FLAG_UTF8: u16 = 0x0800;

/// Version needed to extract: 2.0 (DEFLATE, directories)
pub const VERSION_NEEDED: u16 = 20;

/// Version made by: unix host, APPNOTE 2.0
pub const VERSION_MADE_BY_UNIX: u16 = (3 << 8) | 20;

/// Host system id stored in the high byte of "version made by"
const HOST_UNIX: u16 = 3;

pub(crate) fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidArchive(msg.into())
}

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub version_made_by: u16,
    pub external_attrs: u32,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Unix permission bits, if the archive was created on a unix host
    pub fn unix_mode(&self) -> Option<u32> {
        if self.version_made_by >> 8 != HOST_UNIX {
            return None;
        }
        match (self.external_attrs >> 16) & 0o7777 {
            0 => None,
            mode => Some(mode),
        }
    }

    /// Relative path this member extracts to.
    ///
    /// Rejects absolute names, drive prefixes and `..` components so a
    /// member can never land outside the destination directory.
    pub fn enclosed_name(&self) -> Result<PathBuf> {
        let name = self.file_name.replace('\\', "/");
        let mut path = PathBuf::new();
        for component in Path::new(&name).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::UnsafeMemberPath(self.file_name.clone()));
                }
            }
        }
        if path.as_os_str().is_empty() {
            return Err(Error::UnsafeMemberPath(self.file_name.clone()));
        }
        Ok(path)
    }
}

/// Header fields of a member as written by this crate.
///
/// The same record produces the Local File Header and, once the member's
/// offset is known, its Central Directory entry. No extra fields and no
/// file comment are written.
#[derive(Debug, Clone)]
pub struct MemberHeader {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub external_attrs: u32,
    pub lfh_offset: u32,
}

impl MemberHeader {
    /// Serialize the Local File Header followed by the file name
    pub fn local_bytes(&self) -> Result<Vec<u8>> {
        let name_len = self.name_len()?;
        let mut buf = Vec::with_capacity(LFH_SIZE + self.file_name.len());
        buf.extend_from_slice(LFH_SIGNATURE);
        buf.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        buf.write_u16::<LittleEndian>(FLAG_UTF8)?;
        buf.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        buf.write_u16::<LittleEndian>(self.last_mod_time)?;
        buf.write_u16::<LittleEndian>(self.last_mod_date)?;
        buf.write_u32::<LittleEndian>(self.crc32)?;
        buf.write_u32::<LittleEndian>(self.compressed_size)?;
        buf.write_u32::<LittleEndian>(self.uncompressed_size)?;
        buf.write_u16::<LittleEndian>(name_len)?;
        buf.write_u16::<LittleEndian>(0)?; // extra field
        buf.extend_from_slice(self.file_name.as_bytes());
        Ok(buf)
    }

    /// Serialize the Central Directory File Header followed by the file name
    pub fn central_bytes(&self) -> Result<Vec<u8>> {
        let name_len = self.name_len()?;
        let mut buf = Vec::with_capacity(CDFH_MIN_SIZE + self.file_name.len());
        buf.extend_from_slice(CDFH_SIGNATURE);
        buf.write_u16::<LittleEndian>(VERSION_MADE_BY_UNIX)?;
        buf.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        buf.write_u16::<LittleEndian>(FLAG_UTF8)?;
        buf.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        buf.write_u16::<LittleEndian>(self.last_mod_time)?;
        buf.write_u16::<LittleEndian>(self.last_mod_date)?;
        buf.write_u32::<LittleEndian>(self.crc32)?;
        buf.write_u32::<LittleEndian>(self.compressed_size)?;
        buf.write_u32::<LittleEndian>(self.uncompressed_size)?;
        buf.write_u16::<LittleEndian>(name_len)?;
        buf.write_u16::<LittleEndian>(0)?; // extra field
        buf.write_u16::<LittleEndian>(0)?; // file comment
        buf.write_u16::<LittleEndian>(0)?; // disk number start
        buf.write_u16::<LittleEndian>(0)?; // internal attributes
        buf.write_u32::<LittleEndian>(self.external_attrs)?;
        buf.write_u32::<LittleEndian>(self.lfh_offset)?;
        buf.extend_from_slice(self.file_name.as_bytes());
        Ok(buf)
    }

    fn name_len(&self) -> Result<u16> {
        u16::try_from(self.file_name.len()).map_err(|_| invalid("Member name too long"))
    }
}

/// Encode a timestamp as DOS (time, date).
///
/// DOS dates start in 1980; earlier timestamps clamp to 1980-01-01.
pub fn dos_datetime(ts: NaiveDateTime) -> (u16, u16) {
    if ts.year() < 1980 {
        return (0, (1 << 5) | 1);
    }
    let year = (ts.year() - 1980).min(127) as u16;
    let date = (year << 9) | ((ts.month() as u16) << 5) | ts.day() as u16;
    let time = ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2);
    (time, date)
}
