use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{ArchiveOptions, ExtractOutcome};
use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};
use crate::manifest::ManifestRecord;
use crate::zip::{ZipExtractor, ZipFileEntry};

/// A backup archive opened for reading
pub struct Archive<R: ReadAt> {
    extractor: ZipExtractor<R>,
    members: Vec<ZipFileEntry>,
    comment: Vec<u8>,
    options: ArchiveOptions,
}

impl Archive<LocalFileReader> {
    /// Open the archive at `path`.
    ///
    /// Fails with [`Error::NotFound`] if there is no such file.
    pub async fn open(path: &Path, options: ArchiveOptions) -> Result<Self> {
        let reader = LocalFileReader::new(path)?;
        Self::from_reader(Arc::new(reader), options).await
    }
}

impl<R: ReadAt> Archive<R> {
    pub async fn from_reader(reader: Arc<R>, options: ArchiveOptions) -> Result<Self> {
        let extractor = ZipExtractor::new(reader);
        let (members, comment) = extractor.read_directory().await?;

        Ok(Self {
            extractor,
            members,
            comment,
            options,
        })
    }

    /// Members in archive order
    pub fn members(&self) -> &[ZipFileEntry] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&ZipFileEntry> {
        self.members.iter().find(|m| m.file_name == name)
    }

    /// Raw archive comment
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Contents of the member called `name`
    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let member = self
            .member(name)
            .ok_or_else(|| Error::MissingMember(name.to_string()))?;
        self.extractor.extract_to_memory(member).await
    }

    /// Decode the metadata record stored in the archive comment
    pub fn get_metadata(&self) -> Result<ManifestRecord> {
        ManifestRecord::decode(&self.comment)
    }

    /// Extract `member` below `destination`.
    ///
    /// An existing file at the target is left alone unless the archive
    /// was opened with `rewrite`, in dry runs too. A dry run reports the
    /// target without touching the filesystem. A failed write is logged
    /// and returned as [`Error::Extract`].
    pub async fn extract(&self, member: &ZipFileEntry, destination: &Path) -> Result<ExtractOutcome> {
        let target = destination.join(member.enclosed_name()?);

        let exists = fs::metadata(&target)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);

        if exists && !self.options.rewrite {
            info!("{} (already exists)", target.display());
            debug!(member = %member.file_name, "Skipping because file already exists");
            return Ok(ExtractOutcome::Skipped(target));
        }

        if self.options.dry_run {
            info!("{} (would write)", target.display());
            return Ok(ExtractOutcome::WouldWrite(target));
        }

        if let Err(err) = self.extractor.extract_to_file(member, &target).await {
            warn!("{} (could not write)", target.display());
            return Err(Error::Extract {
                path: target,
                source: Box::new(err),
            });
        }

        info!("{}", target.display());
        Ok(ExtractOutcome::Written(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use rstest::rstest;
    use std::path::PathBuf;

    /// An archive holding `Mods/Images/a.png` and `123.json`
    async fn sample_archive(dir: &Path) -> PathBuf {
        let sources = dir.join("sources");
        std::fs::create_dir_all(sources.join("Mods/Images")).unwrap();
        std::fs::write(sources.join("Mods/Images/a.png"), b"fresh image").unwrap();
        std::fs::write(sources.join("123.json"), br#"{"SaveName": "Pirates"}"#).unwrap();

        let path = dir.join("backup.zip");
        let mut writer = ArchiveWriter::create(&path, ArchiveOptions::default())
            .await
            .unwrap()
            .with_source_root(&sources);
        writer.write("Mods/Images/a.png").await.unwrap();
        writer.write("123.json").await.unwrap();
        writer.put_metadata(None, Some("123.json")).unwrap();
        writer.finish().await.unwrap();
        path
    }

    #[tokio::test]
    async fn open_missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.zip");

        let err = Archive::open(&path, ArchiveOptions::default()).await.err().unwrap();
        assert!(matches!(err, Error::NotFound(p) if p == path));
    }

    #[tokio::test]
    async fn reads_members_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::open(&sample_archive(dir.path()).await, ArchiveOptions::default())
            .await
            .unwrap();

        assert_eq!(archive.members().len(), 2);
        assert_eq!(archive.read("123.json").await.unwrap(), br#"{"SaveName": "Pirates"}"#);
        assert!(matches!(archive.read("nope").await, Err(Error::MissingMember(_))));
        assert_eq!(
            archive.get_metadata().unwrap().info_filename.as_deref(),
            Some("123.json")
        );
    }

    #[rstest]
    #[case::keep(false, false, b"stale".as_slice())]
    #[case::rewrite(true, false, b"fresh image".as_slice())]
    #[case::dry_run_keep(false, true, b"stale".as_slice())]
    #[case::dry_run_rewrite(true, true, b"stale".as_slice())]
    #[tokio::test]
    async fn extract_respects_existing_files(
        #[case] rewrite: bool,
        #[case] dry_run: bool,
        #[case] expected: &[u8],
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path()).await;
        let dest = dir.path().join("cache");
        std::fs::create_dir_all(dest.join("Mods/Images")).unwrap();
        std::fs::write(dest.join("Mods/Images/a.png"), b"stale").unwrap();

        let options = ArchiveOptions {
            rewrite,
            dry_run,
            ..Default::default()
        };
        let archive = Archive::open(&path, options).await.unwrap();
        let member = archive.member("Mods/Images/a.png").unwrap().clone();
        let outcome = archive.extract(&member, &dest).await.unwrap();

        let target = dest.join("Mods/Images/a.png");
        let expected_outcome = match (rewrite, dry_run) {
            (false, _) => ExtractOutcome::Skipped(target.clone()),
            (true, true) => ExtractOutcome::WouldWrite(target.clone()),
            (true, false) => ExtractOutcome::Written(target.clone()),
        };
        assert_eq!(outcome, expected_outcome);
        assert_eq!(std::fs::read(&target).unwrap(), expected);
    }

    #[tokio::test]
    async fn dry_run_extract_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path()).await;
        let dest = dir.path().join("cache");
        std::fs::create_dir_all(&dest).unwrap();

        let options = ArchiveOptions {
            dry_run: true,
            ..Default::default()
        };
        let archive = Archive::open(&path, options).await.unwrap();
        for member in archive.members() {
            archive.extract(member, &dest).await.unwrap();
        }

        assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_write_reports_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path()).await;
        // A plain file where the member's parent directory should be
        let dest = dir.path().join("cache");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("Mods"), b"in the way").unwrap();

        let archive = Archive::open(&path, ArchiveOptions::default()).await.unwrap();
        let member = archive.member("Mods/Images/a.png").unwrap();
        let err = archive.extract(member, &dest).await.unwrap_err();

        assert!(matches!(err, Error::Extract { path, .. } if path == dest.join("Mods/Images/a.png")));
    }
}
