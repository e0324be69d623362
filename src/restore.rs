//! Restoring a backup archive into the game's cache.
//!
//! A restore decodes the archive's metadata, finds the member holding
//! the save/mod info, extracts every member (the info member into the
//! workshop directory, everything else below the game data root) and
//! finally makes sure the workshop catalog lists the restored item.
//!
//! Re-running a restore is cheap: files already on disk are skipped
//! unless `rewrite` is set, and the catalog gains at most one entry per
//! `(Directory, Name)` pair.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::archive::{Archive, ArchiveOptions, ExtractOutcome};
use crate::catalog::{Catalog, CatalogEntry, normalize_directory};
use crate::error::{Error, Result};
use crate::gamedata::GameData;
use crate::io::ReadAt;
use crate::manifest::ManifestRecord;
use crate::zip::ZipFileEntry;

/// Save/mod description stored in the info member
#[derive(Debug, Clone, Deserialize)]
pub struct InfoRecord {
    #[serde(rename = "SaveName")]
    pub save_name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Backup archive to restore from
    pub archive: PathBuf,
    /// Name to list the item under instead of its save name
    pub restore_name: Option<String>,
    pub rewrite: bool,
    pub dry_run: bool,
}

/// What happened to the workshop catalog
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogOutcome {
    AlreadyPresent,
    Added(CatalogEntry),
    WouldAdd(CatalogEntry),
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub info_member: String,
    pub save_name: String,
    pub restore_name: String,
    pub extracted: Vec<ExtractOutcome>,
    pub catalog: CatalogOutcome,
    pub dry_run: bool,
}

/// Pick the archive member holding the save/mod info.
///
/// The metadata's `info_filename` wins when it names a member of the
/// archive. Older archives carry no such pointer; for those the last
/// member is used if its name ends in `.json`.
pub fn resolve_info_member<'a>(manifest: &ManifestRecord, members: &'a [ZipFileEntry]) -> Option<&'a str> {
    if let Some(hint) = manifest.info_filename.as_deref() {
        if let Some(member) = members.iter().find(|m| m.file_name == hint) {
            debug!(member = hint, "Found info file in metadata");
            return Some(&member.file_name);
        }
        debug!(member = hint, "Info file named in metadata is not in the archive");
    }

    let last = members.last().filter(|m| m.file_name.ends_with(".json"))?;
    debug!(member = %last.file_name, "Found info file as last file");
    Some(&last.file_name)
}

/// Restore the archive named in `options` into `gamedata`
pub async fn restore(gamedata: &GameData, options: &RestoreOptions) -> Result<RestoreReport> {
    let archive_options = ArchiveOptions {
        dry_run: options.dry_run,
        rewrite: options.rewrite,
        ignore_missing: false,
    };
    let archive = Archive::open(&options.archive, archive_options).await?;
    restore_from(gamedata, &archive, options).await
}

/// Restore from an already opened archive
pub async fn restore_from<R: ReadAt>(
    gamedata: &GameData,
    archive: &Archive<R>,
    options: &RestoreOptions,
) -> Result<RestoreReport> {
    let manifest = archive.get_metadata()?;
    let export_date = manifest.require_export_date()?;

    let info_member = resolve_info_member(&manifest, archive.members())
        .ok_or_else(|| Error::NoInfoFile(options.archive.clone()))?
        .to_string();

    let info_data = archive.read(&info_member).await?;
    let info: InfoRecord = serde_json::from_slice(&info_data)
        .map_err(|err| Error::decode(format!("info file '{info_member}'"), err))?;

    let restore_name = match &options.restore_name {
        Some(name) => {
            info!("Extracting '{}' as '{}'...", info.save_name, name);
            name.clone()
        }
        None => {
            info!("Extracting '{}'...", info.save_name);
            info.save_name.clone()
        }
    };

    let workshop_dir = gamedata.workshop_dir();
    let mut extracted = Vec::with_capacity(archive.members().len());
    for member in archive.members() {
        let destination = if member.file_name == info_member {
            workshop_dir.as_path()
        } else {
            gamedata.root()
        };
        extracted.push(archive.extract(member, destination).await?);
    }

    let infofile_path = normalize_directory(&workshop_dir.join(&info_member).to_string_lossy());
    let catalog = update_catalog(gamedata, &infofile_path, &restore_name, export_date, options.dry_run).await?;

    if options.dry_run {
        info!("Dry run for {} completed.", options.archive.display());
    } else {
        info!(
            "Restored contents from {} to {}.",
            options.archive.display(),
            gamedata.root().display()
        );
    }

    Ok(RestoreReport {
        info_member,
        save_name: info.save_name,
        restore_name,
        extracted,
        catalog,
        dry_run: options.dry_run,
    })
}

async fn update_catalog(
    gamedata: &GameData,
    directory: &str,
    name: &str,
    update_time: i64,
    dry_run: bool,
) -> Result<CatalogOutcome> {
    let mut catalog = Catalog::load(&gamedata.workshop_info_file()).await?;

    if catalog.find(directory, name).is_some() {
        info!("Item is already in the workshop info");
        return Ok(CatalogOutcome::AlreadyPresent);
    }

    let entry = CatalogEntry::new(directory, name, update_time);
    if dry_run {
        let json = serde_json::to_string(&entry)
            .map_err(|err| Error::decode("workshop info entry", err))?;
        info!("Item would be added to your workshop info: {json}");
        return Ok(CatalogOutcome::WouldAdd(entry));
    }

    catalog.push(entry.clone());
    catalog.save().await?;
    info!("Item added to your workshop info");
    Ok(CatalogOutcome::Added(entry))
}
