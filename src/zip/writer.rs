//! Streaming ZIP writer.
//!
//! Members are written one after another as local header plus data; the
//! Central Directory and the EOCD (carrying the archive comment) are
//! emitted by [`ZipWriter::finish`]. ZIP64 output is not produced.

use chrono::{DateTime, Local, NaiveDateTime};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::time::SystemTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;

use super::parser::MAX_COMMENT_SIZE;
use super::structures::*;

/// Metadata for one member about to be written
#[derive(Debug, Clone)]
pub struct MemberOptions {
    pub method: CompressionMethod,
    pub modified: NaiveDateTime,
    pub unix_mode: u32,
}

impl MemberOptions {
    /// Options for a member named `name`, modified at `modified`
    pub fn for_file(name: &str, modified: SystemTime, unix_mode: u32) -> Self {
        Self {
            method: CompressionMethod::for_file_name(name),
            modified: DateTime::<Local>::from(modified).naive_local(),
            unix_mode,
        }
    }
}

pub struct ZipWriter<W: AsyncWrite + Unpin> {
    inner: W,
    entries: Vec<MemberHeader>,
    offset: u64,
}

impl<W: AsyncWrite + Unpin> ZipWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            entries: Vec::new(),
            offset: 0,
        }
    }

    /// Number of members written so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one member with the given contents
    pub async fn add_bytes(&mut self, name: &str, data: &[u8], options: &MemberOptions) -> Result<()> {
        if self.entries.len() >= u16::MAX as usize {
            return Err(invalid("Too many members (ZIP64 output is not supported)"));
        }

        let crc32 = crc32fast::hash(data);
        let compressed = match options.method {
            CompressionMethod::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?
            }
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Unknown(method) => {
                return Err(crate::error::Error::UnsupportedCompression(method));
            }
        };

        let (last_mod_time, last_mod_date) = dos_datetime(options.modified);
        let entry = MemberHeader {
            file_name: name.to_string(),
            compression_method: options.method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size: to_u32(compressed.len() as u64, "Member too large")?,
            uncompressed_size: to_u32(data.len() as u64, "Member too large")?,
            external_attrs: (options.unix_mode & 0o177777) << 16,
            lfh_offset: to_u32(self.offset, "Archive too large")?,
        };
        let header = entry.local_bytes()?;

        self.inner.write_all(&header).await?;
        self.inner.write_all(&compressed).await?;
        self.offset += (header.len() + compressed.len()) as u64;
        self.entries.push(entry);

        Ok(())
    }

    /// Write the Central Directory and EOCD, returning the inner writer
    pub async fn finish(mut self, comment: &[u8]) -> Result<W> {
        if comment.len() as u64 > MAX_COMMENT_SIZE {
            return Err(invalid("Archive comment longer than 65535 bytes"));
        }

        let cd_offset = to_u32(self.offset, "Archive too large")?;
        let mut directory = Vec::new();

        for entry in &self.entries {
            directory.extend_from_slice(&entry.central_bytes()?);
        }

        let cd_size = to_u32(directory.len() as u64, "Central Directory too large")?;
        to_u32(self.offset + directory.len() as u64, "Archive too large")?;

        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: self.entries.len() as u16,
            total_entries: self.entries.len() as u16,
            cd_size,
            cd_offset,
            comment_len: comment.len() as u16,
        };

        self.inner.write_all(&directory).await?;
        self.inner.write_all(&eocd.to_bytes()).await?;
        self.inner.write_all(comment).await?;
        self.inner.flush().await?;

        Ok(self.inner)
    }
}

fn to_u32(value: u64, msg: &str) -> Result<u32> {
    // 0xFFFFFFFF is reserved as the ZIP64 marker
    u32::try_from(value)
        .ok()
        .filter(|v| *v != u32::MAX)
        .ok_or_else(|| invalid(format!("{msg} (ZIP64 output is not supported)")))
}
