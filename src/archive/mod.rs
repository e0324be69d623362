//! Backup archive wrapper.
//!
//! Sits on top of the [`zip`](crate::zip) layer and adds the behavior a
//! backup tool needs: dry runs that never touch the filesystem, a
//! conflict policy for extraction, and write-once tracking of logical
//! file names while an archive is being assembled.

mod reader;
mod writer;

pub use reader::Archive;
pub use writer::ArchiveWriter;

use std::path::PathBuf;

/// Flags shared by archive reads and writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Only report what would happen
    pub dry_run: bool,
    /// Overwrite files that already exist at the extraction target
    pub rewrite: bool,
    /// Skip source files that do not exist instead of failing
    pub ignore_missing: bool,
}

/// Result of extracting one member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Written(PathBuf),
    WouldWrite(PathBuf),
    /// A file already exists at the target and rewriting is off
    Skipped(PathBuf),
}

/// Result of adding one file to an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    WouldWrite(PathBuf),
    /// The source file does not exist and missing files are ignored
    Missing(PathBuf),
}
