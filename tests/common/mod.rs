#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tts_restore::gamedata::{WORKSHOP_INFO_FILE, WORKSHOP_PATH};
use tts_restore::{ArchiveOptions, ArchiveWriter, GameData};

pub const IMAGE: &str = "Mods/Images/table.png";
pub const MODEL: &str = "Mods/Models/ship.obj";
pub const INFO: &str = "save123.json";

pub struct Fixture {
    pub dir: TempDir,
    pub gamedata: GameData,
    pub archive: PathBuf,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.gamedata.root()
    }

    pub fn catalog(&self) -> serde_json::Value {
        let data = std::fs::read(self.gamedata.workshop_info_file()).unwrap();
        serde_json::from_slice(&data).unwrap()
    }

    /// Where the catalog expects the restored info file
    pub fn info_directory(&self) -> String {
        self.gamedata
            .workshop_dir()
            .join(INFO)
            .to_string_lossy()
            .into_owned()
    }
}

/// A game data directory with an empty catalog and a three-member backup
/// whose last member is the info file.
pub async fn fixture(info_filename: Option<&str>) -> Fixture {
    fixture_with_members(&[IMAGE, MODEL, INFO], info_filename, "[]").await
}

pub async fn fixture_with_members(members: &[&str], info_filename: Option<&str>, catalog: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();

    let root = dir.path().join("gamedata");
    std::fs::create_dir_all(root.join(WORKSHOP_PATH)).unwrap();
    std::fs::write(root.join(WORKSHOP_PATH).join(WORKSHOP_INFO_FILE), catalog).unwrap();

    let sources = dir.path().join("sources");
    for member in members {
        let path = sources.join(member);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let contents = if member.ends_with(".json") {
            r#"{"SaveName": "Pirates", "GameMode": "Pirates of the Caribbean"}"#.to_string()
        } else {
            format!("contents of {member}")
        };
        std::fs::write(path, contents).unwrap();
    }

    let archive = dir.path().join("backup.zip");
    let mut writer = ArchiveWriter::create(&archive, ArchiveOptions::default())
        .await
        .unwrap()
        .with_source_root(&sources);
    for member in members {
        writer.write(member).await.unwrap();
    }
    writer.put_metadata(Some("test backup"), info_filename).unwrap();
    writer.finish().await.unwrap();

    Fixture {
        gamedata: GameData::locate(&root).unwrap(),
        dir,
        archive,
    }
}

/// Every file below `dir` with its contents
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                files.insert(path.clone(), Vec::new());
                pending.push(path);
            } else {
                files.insert(path.clone(), std::fs::read(&path).unwrap());
            }
        }
    }
    files
}
