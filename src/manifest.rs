//! Backup metadata stored in the archive comment.
//!
//! The comment holds a single UTF-8 JSON object:
//!
//! ```json
//! {"script_revision": "0.1.0", "export_date": 1700000000, "comment": "...", "info_filename": "123.json"}
//! ```
//!
//! `comment` and `info_filename` are optional. Keys this crate does not
//! know about are kept and written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Revision recorded in archives written by this build
pub const TOOL_REVISION: &str = env!("CARGO_PKG_VERSION");

/// Metadata record embedded in a backup archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    #[serde(rename = "script_revision", default)]
    pub tool_revision: String,

    /// Export time, seconds since the unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Archive member holding the save/mod info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_filename: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestRecord {
    /// A record stamped with the current time.
    ///
    /// Empty strings are treated as absent.
    pub fn new(tool_revision: impl Into<String>, comment: Option<&str>, info_filename: Option<&str>) -> Self {
        Self {
            tool_revision: tool_revision.into(),
            export_date: Some(chrono::Utc::now().timestamp()),
            comment: comment.filter(|c| !c.is_empty()).map(str::to_string),
            info_filename: info_filename.filter(|f| !f.is_empty()).map(str::to_string),
            extra: Map::new(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| Error::decode("archive metadata", err))
    }

    pub fn decode(comment: &[u8]) -> Result<Self> {
        if comment.is_empty() {
            return Err(Error::MissingManifest);
        }

        let value: Value =
            serde_json::from_slice(comment).map_err(|err| Error::decode("archive metadata", err))?;
        if !value.is_object() {
            return Err(Error::ManifestNotObject);
        }

        serde_json::from_value(value).map_err(|err| Error::decode("archive metadata", err))
    }

    /// Export date, required by anything that records when a backup was made
    pub fn require_export_date(&self) -> Result<i64> {
        self.export_date
            .ok_or(Error::MissingManifestField("export_date"))
    }
}
