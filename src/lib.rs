//! # tts-restore
//!
//! Restore Tabletop Simulator mods and saves from backup archives.
//!
//! A backup is a ZIP archive holding cached game assets plus one JSON
//! info member describing the save or mod. The archive comment carries a
//! small metadata record naming that member. Restoring extracts the
//! assets into the game data directory and adds the item to the
//! workshop catalog so the game picks it up.
//!
//! ## Features
//!
//! - Dry runs that report every file without touching the filesystem
//! - Existing cache files are kept unless rewriting is requested
//! - Catalog updates are idempotent per `(Directory, Name)`
//! - Legacy archives without an info pointer are still understood
//!
//! ## Example
//!
//! ```no_run
//! use tts_restore::{GameData, RestoreOptions, restore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gamedata = GameData::locate("/home/me/.local/share/Tabletop Simulator")?;
//!     let options = RestoreOptions {
//!         archive: "backup.zip".into(),
//!         dry_run: true,
//!         ..Default::default()
//!     };
//!
//!     let report = restore(&gamedata, &options).await?;
//!     println!("{} files", report.extracted.len());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod gamedata;
pub mod io;
pub mod logger;
pub mod manifest;
pub mod restore;
pub mod zip;

pub use archive::{Archive, ArchiveOptions, ArchiveWriter, ExtractOutcome, WriteOutcome};
pub use catalog::{Catalog, CatalogEntry};
pub use cli::Cli;
pub use error::{Error, Result};
pub use gamedata::GameData;
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use manifest::ManifestRecord;
pub use restore::{CatalogOutcome, InfoRecord, RestoreOptions, RestoreReport, restore};
