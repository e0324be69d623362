//! The workshop catalog (`WorkshopFileInfos.json`).
//!
//! The game lists cached mods and saves in a JSON array of
//! `{"Directory", "Name", "UpdateTime"}` objects. Restores append to it
//! and never remove or reorder entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

/// One cached item known to the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "Directory")]
    pub directory: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "UpdateTime")]
    pub update_time: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogEntry {
    pub fn new(directory: impl Into<String>, name: impl Into<String>, update_time: i64) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            update_time,
            extra: Map::new(),
        }
    }

    /// Whether this entry is the `(directory, name)` item.
    ///
    /// The stored directory may contain doubled slashes; the comparison
    /// is made against its normalized form.
    pub fn matches(&self, directory: &str, name: &str) -> bool {
        self.name == name && normalize_directory(&self.directory) == directory
    }
}

/// Collapse doubled slashes (`//` becomes `/`) in a single pass
pub fn normalize_directory(directory: &str) -> String {
    directory.replace("//", "/")
}

/// A catalog file loaded into memory
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub async fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).await?;
        let entries: Vec<CatalogEntry> = serde_json::from_slice(&data)
            .map_err(|err| Error::decode(format!("workshop info file '{}'", path.display()), err))?;

        debug!(path = %path.display(), entries = entries.len(), "Loaded workshop catalog");

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn find(&self, directory: &str, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.matches(directory, name))
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    /// Rewrite the catalog file in place.
    ///
    /// The file is truncated and rewritten, not atomically replaced: a
    /// crash mid-write leaves it corrupt.
    pub async fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.entries)
            .map_err(|err| Error::decode(format!("workshop info file '{}'", self.path.display()), err))?;
        fs::write(&self.path, data).await?;
        Ok(())
    }
}
