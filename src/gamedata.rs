//! Layout of the Tabletop Simulator game data directory.

use directories::{BaseDirs, UserDirs};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Workshop metadata directory, relative to the game data root
pub const WORKSHOP_PATH: &str = "Mods/Workshop";

/// Catalog of cached workshop items, inside [`WORKSHOP_PATH`]
pub const WORKSHOP_INFO_FILE: &str = "WorkshopFileInfos.json";

const GAME_DIR_NAME: &str = "Tabletop Simulator";

/// A game data directory that has been checked to exist
#[derive(Debug, Clone)]
pub struct GameData {
    root: PathBuf,
}

impl GameData {
    /// Check that `root` is a game data directory with a workshop catalog
    pub fn locate(root: impl Into<PathBuf>) -> Result<Self> {
        let gamedata = Self { root: root.into() };

        if !gamedata.root.is_dir() {
            return Err(Error::MissingGameData(gamedata.root));
        }
        let info_file = gamedata.workshop_info_file();
        if !info_file.is_file() {
            return Err(Error::MissingWorkshopInfo(info_file));
        }

        Ok(gamedata)
    }

    /// The platform's default game data directory, if a home directory is known
    pub fn default_dir() -> Option<PathBuf> {
        if cfg!(windows) {
            UserDirs::new()?
                .document_dir()
                .map(|docs| docs.join("My Games").join(GAME_DIR_NAME))
        } else if cfg!(target_os = "macos") {
            BaseDirs::new().map(|dirs| dirs.home_dir().join("Library").join(GAME_DIR_NAME))
        } else {
            BaseDirs::new().map(|dirs| dirs.data_dir().join(GAME_DIR_NAME))
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workshop_dir(&self) -> PathBuf {
        self.root.join(WORKSHOP_PATH)
    }

    pub fn workshop_info_file(&self) -> PathBuf {
        self.workshop_dir().join(WORKSHOP_INFO_FILE)
    }
}
