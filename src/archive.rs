//! High-level [`GrfArchive`] API — the primary embedding surface.
//!
//! ```no_run
//! use rogrf::{GrfArchive, OpenOptions};
//!
//! let mut grf = GrfArchive::open_path("data.grf", OpenOptions::default())?;
//! grf.load()?;
//! let sprite = grf.get_file("data\\sprite\\cursors.act")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! An archive is created closed, transitions to loaded exactly once
//! (`load` is idempotent), and its indices are immutable from then on:
//! every query takes `&self` and may run concurrently.  The extraction
//! cache and the byte pool are the only mutable shared state, each behind
//! its own short lock.  `reload_with_encoding` takes `&mut self` — the
//! compile-time form of the exclusive access it requires — and swaps in a
//! fully built fresh state.

use std::path::Path;

use crate::cache::{ExtractionCache, DEFAULT_CACHE_CAPACITY};
use crate::crypto;
use crate::encoding::{self, FilenameEncoding, DEFAULT_AUTO_DETECT_THRESHOLD};
use crate::error::GrfError;
use crate::header::{GrfHeader, Version, GRF_HEADER_SIZE};
use crate::index::{ArchiveStats, FindCriteria, NameIndex, PathResolution};
use crate::source::{BytePool, FileSource, MemorySource, PoolBuf, ReadSource};
use crate::table::{self, FileEntry};

// ── OpenOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`GrfArchive::open`].
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub filename_encoding: FilenameEncoding,
    /// Bad-character ratio under which a UTF-8 decoding wins auto-detection.
    pub auto_detect_threshold: f64,
    /// Entries above this uncompressed size are silently skipped.
    pub max_file_uncompressed_bytes: u64,
    /// A declared entry count above this fails the load.
    pub max_entries: u32,
    pub use_byte_pool: bool,
    pub cache_capacity: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            filename_encoding: FilenameEncoding::Auto,
            auto_detect_threshold: DEFAULT_AUTO_DETECT_THRESHOLD,
            max_file_uncompressed_bytes: 256 * 1024 * 1024,
            max_entries: 500_000,
            use_byte_pool: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

// ── GrfArchive ───────────────────────────────────────────────────────────────

struct LoadedState {
    version: Version,
    encoding: FilenameEncoding,
    index: NameIndex,
}

pub struct GrfArchive<S: ReadSource> {
    source: S,
    options: OpenOptions,
    state: Option<LoadedState>,
    cache: ExtractionCache,
}

impl GrfArchive<FileSource> {
    /// Open a local file as an (un-loaded) archive.
    pub fn open_path<P: AsRef<Path>>(path: P, options: OpenOptions) -> std::io::Result<Self> {
        Ok(Self::open(FileSource::open(path)?, options))
    }
}

impl GrfArchive<MemorySource> {
    /// Wrap an in-memory blob as an (un-loaded) archive.
    pub fn from_bytes(bytes: Vec<u8>, options: OpenOptions) -> Self {
        Self::open(MemorySource::new(bytes), options)
    }
}

impl<S: ReadSource> GrfArchive<S> {
    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Wrap any random-read source.  No bytes are read until [`load`].
    ///
    /// [`load`]: GrfArchive::load
    pub fn open(source: S, options: OpenOptions) -> Self {
        let cache = ExtractionCache::new(options.cache_capacity);
        Self { source, options, state: None, cache }
    }

    /// Parse the header and central directory and build the indices.
    /// Idempotent: subsequent calls return without touching the source.
    pub fn load(&mut self) -> Result<(), GrfError> {
        if self.state.is_some() {
            return Ok(());
        }
        self.state = Some(self.build_state(self.options.filename_encoding)?);
        Ok(())
    }

    /// Drop the loaded state and load again with a fixed encoding.
    ///
    /// The fresh state is built completely before the swap, so a failed
    /// reload leaves the archive unloaded rather than half-swapped.  The
    /// extraction cache is cleared: keys are decoded names.
    pub fn reload_with_encoding(&mut self, encoding: FilenameEncoding) -> Result<(), GrfError> {
        self.state = None;
        self.cache.clear();
        self.state = Some(self.build_state(encoding)?);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    fn build_state(&self, requested: FilenameEncoding) -> Result<LoadedState, GrfError> {
        let mut header_buf = [0u8; GRF_HEADER_SIZE];
        self.source.read_into(0, &mut header_buf)?;
        let header = GrfHeader::parse(&header_buf, self.options.max_entries)?;

        let entries = table::read_table(&self.source, &header)?;

        let encoding = match requested {
            FilenameEncoding::Auto => encoding::detect(
                entries.iter().map(|e| e.raw_name.as_slice()),
                self.options.auto_detect_threshold,
            ),
            fixed => fixed,
        };

        let index = NameIndex::build(
            entries,
            encoding,
            header.file_count,
            self.options.max_file_uncompressed_bytes,
        );

        Ok(LoadedState { version: header.version, encoding, index })
    }

    fn state(&self) -> Result<&LoadedState, GrfError> {
        self.state.as_ref().ok_or(GrfError::NotLoaded)
    }

    // ── Extraction ───────────────────────────────────────────────────────────

    /// Resolve `name` and return the entry's decoded bytes.
    ///
    /// Serves from the cache when possible; a miss reads the payload,
    /// runs the cipher mode selected by the entry's type bits, inflates,
    /// and admits the result to the cache.  Per-entry failures are
    /// recoverable: the archive stays loaded and other entries remain
    /// extractable.
    pub fn get_file(&self, name: &str) -> Result<Vec<u8>, GrfError> {
        let state = self.state()?;
        let exact = match state.index.resolve(name) {
            PathResolution::Found(exact) => exact,
            PathResolution::Ambiguous(candidates) => {
                return Err(GrfError::AmbiguousPath {
                    query: name.to_owned(),
                    candidates: candidates.into_iter().take(5).collect(),
                });
            }
            PathResolution::NotFound => return Err(GrfError::FileNotFound(name.to_owned())),
        };

        if let Some(data) = self.cache.get(&exact) {
            return Ok(data);
        }

        let Some(entry) = state.index.get(&exact) else {
            return Err(GrfError::FileNotFound(name.to_owned()));
        };
        let data = self.extract(&exact, entry)?;
        self.cache.insert(exact, data.clone());
        Ok(data)
    }

    /// Read → decipher → inflate, without touching the cache.
    fn extract(&self, name: &str, entry: &FileEntry) -> Result<Vec<u8>, GrfError> {
        if entry.length_aligned == 0 {
            return Ok(Vec::new());
        }
        let length = entry.length_aligned as usize;

        let end = entry
            .offset
            .checked_add(length as u64)
            .filter(|&end| end <= self.source.len());
        if end.is_none() {
            return Err(GrfError::InvalidOffset {
                name: name.to_owned(),
                offset: entry.offset,
                length: length as u64,
                source_len: self.source.len(),
            });
        }

        let mut buf = if self.options.use_byte_pool {
            BytePool::global().acquire(length)
        } else {
            PoolBuf::unpooled(length)
        };
        self.source.read_into(entry.offset, &mut buf)?;

        if entry.is_ciphered() {
            if length % crypto::BLOCK_SIZE != 0 {
                return Err(GrfError::CorruptTable(format!(
                    "entry {name:?}: ciphered length {length} is not a multiple of 8"
                )));
            }
            if entry.is_mixed_crypt() {
                crypto::decode_full(&mut buf, entry.compressed_size);
            } else {
                crypto::decode_header(&mut buf);
            }
        }

        let compressed_len = entry.compressed_size as usize;
        if compressed_len > length {
            return Err(GrfError::CorruptTable(format!(
                "entry {name:?}: compressed size {compressed_len} exceeds aligned length {length}"
            )));
        }
        let payload = &buf[..compressed_len];

        if entry.is_stored() {
            // Alignment padding past compressed_size is discarded.
            return Ok(payload.to_vec());
        }

        let data = table::inflate(payload).map_err(|e| GrfError::DecompressFail {
            name: name.to_owned(),
            reason: e.to_string(),
        })?;
        if data.len() != entry.real_size as usize {
            return Err(GrfError::DecompressFail {
                name: name.to_owned(),
                reason: format!("inflated to {} bytes, expected {}", data.len(), entry.real_size),
            });
        }
        Ok(data)
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Whether `name` resolves to exactly one entry.
    pub fn has_file(&self, name: &str) -> bool {
        matches!(self.resolve_path(name), PathResolution::Found(_))
    }

    /// Entry metadata for a resolved name, when unique.
    pub fn get_entry(&self, name: &str) -> Option<&FileEntry> {
        let state = self.state.as_ref()?;
        match state.index.resolve(name) {
            PathResolution::Found(exact) => state.index.get(&exact),
            _ => None,
        }
    }

    pub fn resolve_path(&self, name: &str) -> PathResolution {
        match &self.state {
            Some(state) => state.index.resolve(name),
            None => PathResolution::NotFound,
        }
    }

    pub fn find(&self, criteria: &FindCriteria) -> Vec<String> {
        match &self.state {
            Some(state) => state.index.find(criteria),
            None => Vec::new(),
        }
    }

    pub fn get_files_by_extension(&self, ext: &str) -> &[String] {
        match &self.state {
            Some(state) => state.index.files_with_extension(ext),
            None => &[],
        }
    }

    pub fn list_extensions(&self) -> Vec<String> {
        match &self.state {
            Some(state) => state.index.extensions(),
            None => Vec::new(),
        }
    }

    /// Exact names in central-directory order.
    pub fn list_files(&self) -> &[String] {
        match &self.state {
            Some(state) => state.index.names(),
            None => &[],
        }
    }

    pub fn file_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.index.len())
    }

    pub fn version(&self) -> Option<Version> {
        self.state.as_ref().map(|s| s.version)
    }

    pub fn get_stats(&self) -> Option<&ArchiveStats> {
        self.state.as_ref().map(|s| s.index.stats())
    }

    /// The encoding chosen at load time; never `Auto`.
    pub fn get_detected_encoding(&self) -> Option<FilenameEncoding> {
        self.state.as_ref().map(|s| s.encoding)
    }

    // ── Cache ────────────────────────────────────────────────────────────────

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// (hits, misses) of the extraction cache since open.
    pub fn cache_counters(&self) -> (u64, u64) {
        self.cache.counters()
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.cache.hit_rate()
    }
}
