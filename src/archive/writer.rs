use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::BufWriter;
use tracing::{debug, info};

use super::{ArchiveOptions, WriteOutcome};
use crate::error::{Error, Result};
use crate::manifest::{ManifestRecord, TOOL_REVISION};
use crate::zip::{MemberOptions, ZipWriter};

/// A backup archive being assembled.
///
/// Each logical file name is added at most once; later requests for the
/// same name return the first outcome. In dry-run mode the archive file
/// is never created.
pub struct ArchiveWriter {
    zip: Option<ZipWriter<BufWriter<File>>>,
    path: PathBuf,
    source_root: PathBuf,
    revision: String,
    comment: Vec<u8>,
    stored_files: HashMap<String, WriteOutcome>,
    options: ArchiveOptions,
}

impl ArchiveWriter {
    pub async fn create(path: &Path, options: ArchiveOptions) -> Result<Self> {
        let zip = if options.dry_run {
            None
        } else {
            let file = File::create(path).await?;
            Some(ZipWriter::new(BufWriter::new(file)))
        };

        Ok(Self {
            zip,
            path: path.to_path_buf(),
            source_root: std::env::current_dir()?,
            revision: TOOL_REVISION.to_string(),
            comment: Vec::new(),
            stored_files: HashMap::new(),
            options,
        })
    }

    /// Resolve file names against `root` instead of the working directory
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    /// Record `revision` in the metadata instead of this crate's version
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Add the file `filename` (relative to the source root) to the archive
    pub async fn write(&mut self, filename: &str) -> Result<WriteOutcome> {
        if let Some(outcome) = self.stored_files.get(filename) {
            debug!(filename, "Already stored");
            return Ok(outcome.clone());
        }

        let absname = self.source_root.join(filename);
        let metadata = fs::metadata(&absname).await.ok().filter(|m| m.is_file());

        if metadata.is_none() && !self.options.ignore_missing {
            return Err(Error::NotFound(absname));
        }

        let outcome = match (metadata, self.zip.as_mut()) {
            (None, _) => {
                info!("{} (not found)", absname.display());
                WriteOutcome::Missing(absname)
            }
            (Some(_), None) => {
                info!("{} (would write)", absname.display());
                WriteOutcome::WouldWrite(absname)
            }
            (Some(metadata), Some(zip)) => {
                let data = fs::read(&absname).await?;
                let options = MemberOptions::for_file(filename, metadata.modified()?, unix_mode(&metadata));
                zip.add_bytes(filename, &data, &options).await?;
                info!("{}", absname.display());
                WriteOutcome::Written(absname)
            }
        };

        self.stored_files.insert(filename.to_string(), outcome.clone());
        Ok(outcome)
    }

    /// Store a metadata record in the archive comment
    pub fn put_metadata(&mut self, comment: Option<&str>, info_filename: Option<&str>) -> Result<()> {
        let record = ManifestRecord::new(self.revision.clone(), comment, info_filename);
        self.comment = record.encode()?.into_bytes();
        Ok(())
    }

    /// Finish the archive. Outside dry runs this writes the Central
    /// Directory and flushes the file.
    pub async fn finish(self) -> Result<()> {
        if let Some(zip) = self.zip {
            let members = zip.len();
            zip.finish(&self.comment).await?;
            debug!(path = %self.path.display(), members, "Archive written");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn unix_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn unix_mode(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() { 0o100444 } else { 0o100644 }
}
