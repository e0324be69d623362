use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, writing or restoring a backup archive.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No such file: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not open gamedata directory '{}'", .0.display())]
    MissingGameData(PathBuf),

    #[error("Could not find Workshop info file at '{}'", .0.display())]
    MissingWorkshopInfo(PathBuf),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Unsupported compression method: {0} (only STORED and DEFLATE are supported)")]
    UnsupportedCompression(u16),

    #[error("CRC-32 mismatch for member '{0}'")]
    ChecksumMismatch(String),

    #[error("Refusing to extract member with unsafe path '{0}'")]
    UnsafeMemberPath(String),

    #[error("No member named '{0}' in archive")]
    MissingMember(String),

    #[error("Archive has no metadata comment")]
    MissingManifest,

    #[error("Archive metadata is not a JSON object")]
    ManifestNotObject,

    #[error("Archive metadata has no '{0}' field")]
    MissingManifestField(&'static str),

    #[error("Could not decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not find .json info file in '{}'", .0.display())]
    NoInfoFile(PathBuf),

    #[error("Could not extract file '{}': {source}", .path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            what: what.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
