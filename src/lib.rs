//! # rogrf — random-access reader for the GRF resource archive format
//!
//! Format facts this crate is built around (fixed by the game client):
//! - 46-byte header: `"Master of Magic"` signature, version 0x200 or 0x300;
//!   mis-tagged 0x300 archives with a 0x200 layout are detected and re-read
//! - All numeric fields are little-endian; only the DES permutation tables
//!   index bits MSB-first within each byte
//! - The central directory is one zlib stream of null-terminated names plus
//!   fixed trailers; offsets are relative to the end of the header
//! - Protected entries use a keyless single-round DES variant with four
//!   S-boxes, plus a byte-shuffle stride in mixed mode; decryption only
//! - Filenames carry no declared encoding: UTF-8 and CP949 are told apart
//!   by scoring, and CP949-as-Windows-1252 mojibake is repairable
//! - Lookups are case-insensitive and slash-agnostic; colliding names are
//!   reported, never silently picked
//!
//! Reading is the whole scope: this crate never writes or re-encrypts.

pub mod archive;
pub mod cache;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod header;
pub mod index;
pub mod source;
pub mod table;

// Flat re-exports for the most common types.
pub use archive::{GrfArchive, OpenOptions};
pub use cache::DEFAULT_CACHE_CAPACITY;
pub use encoding::{FilenameEncoding, DEFAULT_AUTO_DETECT_THRESHOLD};
pub use error::{ErrorCode, GrfError};
pub use header::{GrfHeader, Version, GRF_HEADER_SIZE, GRF_SIGNATURE};
pub use index::{ArchiveStats, FindCriteria, PathResolution};
pub use source::{FileSource, MemorySource, ReadSource};
pub use table::{FileEntry, ENTRY_TYPE_FILE, ENTRY_TYPE_HEADER_CRYPT, ENTRY_TYPE_MIXED_CRYPT};
