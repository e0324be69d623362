//! ZIP archive parsing, extraction and writing.
//!
//! This is the container layer the backup archive wrapper sits on.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`extractor`]: Member data decoding and extraction to disk
//! - [`writer`]: Streaming writer producing archives with a comment
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end, followed by
//!    the archive comment
//!
//! Backup archives keep their metadata record in that comment.
//!
//! ## Supported Features
//!
//! - ZIP64 extensions when reading
//! - STORED and DEFLATE compression methods
//! - CRC-32 verification of extracted data
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No ZIP64 output

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::{MAX_COMMENT_SIZE, ZipParser};
pub use structures::*;
pub use writer::{MemberOptions, ZipWriter};
