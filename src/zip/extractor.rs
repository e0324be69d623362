use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{invalid, CompressionMethod, ZipFileEntry};

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// Member list and archive comment
    pub async fn read_directory(&self) -> Result<(Vec<ZipFileEntry>, Vec<u8>)> {
        self.parser.read_directory().await
    }

    /// Extract file data to memory, verifying its CRC-32
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(Error::UnsupportedCompression(method));
        }

        let data_offset = self.parser.get_data_offset(entry).await?;
        if data_offset.saturating_add(entry.compressed_size) > self.parser.reader().size() {
            return Err(invalid(format!(
                "Member '{}' extends past end of file",
                entry.file_name
            )));
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_exact_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Deflate => {
                // The declared size comes from the archive; never trust it
                // beyond what the compressed data could plausibly expand to
                let capacity = usize::try_from(entry.uncompressed_size)
                    .unwrap_or(usize::MAX)
                    .min(raw.len().saturating_mul(4));
                let mut data = Vec::with_capacity(capacity);
                DeflateDecoder::new(raw.as_slice())
                    .read_to_end(&mut data)
                    .map_err(|err| invalid(format!("Corrupt DEFLATE data in '{}': {err}", entry.file_name)))?;
                data
            }
            _ => raw,
        };

        if data.len() as u64 != entry.uncompressed_size {
            return Err(invalid(format!(
                "Member '{}' is {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            )));
        }

        if crc32fast::hash(&data) != entry.crc32 {
            return Err(Error::ChecksumMismatch(entry.file_name.clone()));
        }

        Ok(data)
    }

    /// Extract file to disk
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if entry.is_directory {
            fs::create_dir_all(output_path).await?;
            return Ok(());
        }

        // Decompress before touching the destination so a corrupt member
        // never truncates an existing file
        let data = self.extract_to_memory(entry).await?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(output_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(output_path, std::fs::Permissions::from_mode(mode)).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::{MemberOptions, ZipWriter};
    use chrono::DateTime;

    async fn single_member(method: CompressionMethod) -> (ZipExtractor<MemoryReader>, ZipFileEntry) {
        let options = MemberOptions {
            method,
            modified: DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc(),
            unix_mode: 0o100644,
        };
        let mut writer = ZipWriter::new(Vec::new());
        writer
            .add_bytes("Mods/Workshop/123.json", &b"{}".repeat(100), &options)
            .await
            .unwrap();
        let data = writer.finish(b"").await.unwrap();

        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(data)));
        let (mut entries, _) = extractor.read_directory().await.unwrap();
        (extractor, entries.remove(0))
    }

    #[tokio::test]
    async fn huge_declared_size_is_an_error() {
        let (extractor, mut entry) = single_member(CompressionMethod::Deflate).await;
        entry.uncompressed_size = 1 << 62;

        let err = extractor.extract_to_memory(&entry).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn size_mismatch_is_an_error() {
        let (extractor, mut entry) = single_member(CompressionMethod::Stored).await;
        entry.uncompressed_size += 1;

        assert!(matches!(
            extractor.extract_to_memory(&entry).await,
            Err(Error::InvalidArchive(_))
        ));
    }
}
