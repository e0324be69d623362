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
//! The archive comment sits directly behind the EOCD, so it is
//! available as soon as the EOCD has been located.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
pub const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// This struct handles reading and parsing ZIP structures from
/// a data source. It's generic over the reader type so archives on
/// disk and archives held in memory go through the same code.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD is located at the end of the ZIP file. This method
    /// handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// Returns an error if no valid EOCD can be found, indicating
    /// the file is not a valid ZIP archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(invalid("Not a valid ZIP file"));
        }

        // First try the simple case where there's no comment.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // The EOCD is followed by a comment; search backwards for it.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        // Prefer a record whose comment ends exactly at end of file. Failing
        // that, take the last record whose comment fits, which tolerates
        // bytes appended after the archive.
        let mut fallback = None;
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
                let trailing = buf.len() - i - EndOfCentralDirectory::SIZE;

                if comment_len == trailing {
                    fallback = Some(i);
                    break;
                }
                if comment_len < trailing && fallback.is_none() {
                    fallback = Some(i);
                }
            }
        }

        let i = fallback.ok_or_else(|| invalid("Not a valid ZIP file"))?;
        let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
        if i + EndOfCentralDirectory::SIZE + eocd.comment_len as usize != buf.len() {
            debug!(
                trailing = buf.len() - i - EndOfCentralDirectory::SIZE - eocd.comment_len as usize,
                "Ignoring bytes after the archive comment"
            );
        }
        Ok((eocd, search_start + i as u64))
    }

    /// Read the archive comment stored after the EOCD.
    pub async fn read_comment(&self, eocd: &EndOfCentralDirectory, eocd_offset: u64) -> Result<Vec<u8>> {
        let mut comment = vec![0u8; eocd.comment_len as usize];
        if !comment.is_empty() {
            self.reader
                .read_exact_at(eocd_offset + EndOfCentralDirectory::SIZE as u64, &mut comment)
                .await?;
        }
        Ok(comment)
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| invalid("Invalid ZIP64 format"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .await?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .await?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Read the member list and the archive comment.
    ///
    /// Members come back in Central Directory order.
    pub async fn read_directory(&self) -> Result<(Vec<ZipFileEntry>, Vec<u8>)> {
        let (eocd, eocd_offset) = self.find_eocd().await?;
        let comment = self.read_comment(&eocd, eocd_offset).await?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.saturating_add(cd_size) > self.size {
            return Err(invalid("Central Directory extends past end of file"));
        }

        // Read the entire Central Directory in one request
        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data).await?;

        let capacity = total_entries.min((cd_size / CDFH_MIN_SIZE as u64).max(1));
        let mut entries = Vec::with_capacity(capacity as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..total_entries {
            let entry = self.parse_cdfh(&mut cursor)?;
            entries.push(entry);
        }

        debug!(
            members = entries.len(),
            comment_len = comment.len(),
            "Parsed central directory"
        );

        Ok((entries, comment))
    }

    /// Parse a Central Directory File Header from a cursor.
    fn parse_cdfh(&self, cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        // Read and verify the signature (PK\x01\x02)
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(invalid("Invalid Central Directory File Header"));
        }

        let version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
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
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Use lossy conversion to handle non-UTF8 filenames gracefully
        let file_name = String::from_utf8_lossy(&file_name_bytes).to_string();

        // Directory entries end with '/'
        let is_directory = file_name.ends_with('/');

        // ZIP64 extended information lives in extra field ID 0x0001
        let extra_field_end = cursor.position() + extra_field_length as u64;

        while cursor.position() + 4 <= extra_field_end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()?;

            if header_id == 0x0001 {
                // Fields are present only if corresponding header field is 0xFFFFFFFF
                if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= extra_field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= extra_field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= extra_field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
                cursor.set_position(extra_field_end);
            } else {
                cursor.set_position(cursor.position() + field_size as u64);
            }
        }

        cursor.set_position(extra_field_end + file_comment_length as u64);

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            version_made_by,
            external_attrs,
            is_directory,
        })
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry.
    /// This method reads the LFH to calculate where the actual file
    /// data begins.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf).await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(invalid(format!(
                "Invalid Local File Header for '{}'",
                entry.file_name
            )));
        }

        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;

    fn empty_archive(comment: &[u8]) -> Vec<u8> {
        let mut data = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 0,
            total_entries: 0,
            cd_size: 0,
            cd_offset: 0,
            comment_len: comment.len() as u16,
        }
        .to_bytes();
        data.extend_from_slice(comment);
        data
    }

    #[tokio::test]
    async fn rejects_non_zip_data() {
        let parser = ZipParser::new(Arc::new(MemoryReader::new(vec![0u8; 64])));
        assert!(parser.find_eocd().await.is_err());

        let parser = ZipParser::new(Arc::new(MemoryReader::new(b"PK".to_vec())));
        assert!(parser.find_eocd().await.is_err());
    }

    #[tokio::test]
    async fn empty_archive_with_comment() {
        let comment = br#"{"export_date": 1}"#;
        let parser = ZipParser::new(Arc::new(MemoryReader::new(empty_archive(comment))));
        let (entries, read_comment) = parser.read_directory().await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(read_comment, comment);
    }

    #[tokio::test]
    async fn tolerates_bytes_after_the_archive() {
        let comment = br#"{"export_date": 1}"#;
        let mut data = empty_archive(comment);
        data.extend_from_slice(b"appended by a download manager");

        let parser = ZipParser::new(Arc::new(MemoryReader::new(data)));
        let (entries, read_comment) = parser.read_directory().await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(read_comment, comment);
    }

    #[test]
    fn written_central_header_parses_back() {
        let header = MemberHeader {
            file_name: "Mods/Workshop/123.json".to_string(),
            compression_method: CompressionMethod::Deflate,
            last_mod_time: 0x1234,
            last_mod_date: 0x5678,
            crc32: 42,
            compressed_size: 10,
            uncompressed_size: 20,
            external_attrs: 0o100600 << 16,
            lfh_offset: 99,
        };
        let bytes = header.central_bytes().unwrap();

        let parser = ZipParser::new(Arc::new(MemoryReader::new(Vec::new())));
        let entry = parser.parse_cdfh(&mut Cursor::new(bytes.as_slice())).unwrap();

        assert_eq!(entry.file_name, "Mods/Workshop/123.json");
        assert_eq!(entry.compression_method, CompressionMethod::Deflate);
        assert_eq!((entry.crc32, entry.compressed_size, entry.uncompressed_size), (42, 10, 20));
        assert_eq!(entry.lfh_offset, 99);
        assert_eq!(entry.unix_mode(), Some(0o600));
    }
}
