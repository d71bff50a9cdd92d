//! Name indices: exact, normalized, and extension lookup, collision
//! tracking, and the archive statistics snapshot.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::Serialize;

use crate::encoding::{self, FilenameEncoding};
use crate::table::FileEntry;

// ── Normalization ────────────────────────────────────────────────────────────

/// Case-insensitive, slash-agnostic lookup key: ASCII-lowercased with every
/// backslash turned into a forward slash.
pub fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '\\' { '/' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Lowercased extension without the dot, of the final path component.
/// Empty extensions are not indexed.
pub fn extension_of(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (_, ext) = base.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

// ── Resolution ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResolution {
    /// Exact or unique case-insensitive match; carries the exact name.
    Found(String),
    /// Two or more exact names share the normalized form of the query.
    Ambiguous(Vec<String>),
    NotFound,
}

// ── Find criteria ────────────────────────────────────────────────────────────

/// Conjunctive filters for [`NameIndex::find`].  An extension-only query
/// is served straight from the extension index without a scan.
#[derive(Debug, Default, Clone)]
pub struct FindCriteria {
    pub extension: Option<String>,
    pub substring: Option<String>,
    pub suffix: Option<String>,
    pub pattern: Option<Regex>,
    pub limit: Option<usize>,
}

impl FindCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    pub fn substring(mut self, needle: impl Into<String>) -> Self {
        self.substring = Some(needle.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ── Statistics ───────────────────────────────────────────────────────────────

/// Load-time snapshot, immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveStats {
    /// Entry count declared by the header, sentinels included.
    pub declared_count: u32,
    /// Entries retained in the indices.
    pub retained_count: usize,
    /// Decoded names still containing U+FFFD or C1 controls.
    pub bad_name_count: usize,
    /// Normalized-name buckets holding more than one exact name.
    pub collision_count: usize,
    pub extension_counts: BTreeMap<String, usize>,
    pub encoding: FilenameEncoding,
}

// ── NameIndex ────────────────────────────────────────────────────────────────

/// The three lookup structures of a loaded archive plus its stats, built
/// once in central-directory order and never mutated.
pub struct NameIndex {
    entries: HashMap<String, FileEntry>,
    /// Exact names in directory order.
    order: Vec<String>,
    normalized: HashMap<String, Vec<String>>,
    by_extension: HashMap<String, Vec<String>>,
    stats: ArchiveStats,
}

impl NameIndex {
    /// Decode names and populate the indices.
    ///
    /// Records above the uncompressed-size ceiling and directory sentinels
    /// are skipped; both skips are silent by design of the format.
    pub fn build(
        entries: Vec<FileEntry>,
        encoding: FilenameEncoding,
        declared_count: u32,
        max_file_uncompressed_bytes: u64,
    ) -> Self {
        let mut index = Self {
            entries: HashMap::new(),
            order: Vec::new(),
            normalized: HashMap::new(),
            by_extension: HashMap::new(),
            stats: ArchiveStats {
                declared_count,
                retained_count: 0,
                bad_name_count: 0,
                collision_count: 0,
                extension_counts: BTreeMap::new(),
                encoding,
            },
        };

        for entry in entries {
            if entry.real_size as u64 > max_file_uncompressed_bytes {
                continue;
            }
            if !entry.is_file() {
                continue;
            }

            let name = encoding::decode_name(&entry.raw_name, encoding);
            if index.entries.insert(name.clone(), entry).is_some() {
                // Duplicate exact name: the newest record wins, the name
                // keeps its first directory position and index buckets.
                continue;
            }

            if encoding::is_bad_name(&name) {
                index.stats.bad_name_count += 1;
            }

            let bucket = index.normalized.entry(normalize(&name)).or_default();
            if !bucket.is_empty() {
                index.stats.collision_count += 1;
            }
            bucket.push(name.clone());

            if let Some(ext) = extension_of(&name) {
                *index.stats.extension_counts.entry(ext.clone()).or_insert(0) += 1;
                index.by_extension.entry(ext).or_default().push(name.clone());
            }

            index.order.push(name);
        }

        index.stats.retained_count = index.order.len();
        index
    }

    pub fn get(&self, exact_name: &str) -> Option<&FileEntry> {
        self.entries.get(exact_name)
    }

    pub fn contains(&self, exact_name: &str) -> bool {
        self.entries.contains_key(exact_name)
    }

    /// Exact names in central-directory order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn stats(&self) -> &ArchiveStats {
        &self.stats
    }

    /// Exact match first, then the normalized bucket.
    pub fn resolve(&self, query: &str) -> PathResolution {
        if self.entries.contains_key(query) {
            return PathResolution::Found(query.to_owned());
        }
        match self.normalized.get(&normalize(query)) {
            Some(bucket) if bucket.len() == 1 => PathResolution::Found(bucket[0].clone()),
            Some(bucket) if !bucket.is_empty() => PathResolution::Ambiguous(bucket.clone()),
            _ => PathResolution::NotFound,
        }
    }

    pub fn files_with_extension(&self, ext: &str) -> &[String] {
        self.by_extension
            .get(&ext.trim_start_matches('.').to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All indexed extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        self.stats.extension_counts.keys().cloned().collect()
    }

    /// Apply the conjunctive filters in directory order.
    pub fn find(&self, criteria: &FindCriteria) -> Vec<String> {
        let limit = criteria.limit.unwrap_or(usize::MAX);
        let substring = criteria.substring.as_deref().map(normalize);
        let suffix = criteria.suffix.as_deref().map(normalize);

        let candidates: &[String] = match &criteria.extension {
            Some(ext) => self.files_with_extension(ext),
            None => &self.order,
        };

        let mut out = Vec::new();
        for name in candidates {
            if out.len() >= limit {
                break;
            }
            let norm = normalize(name);
            if let Some(needle) = &substring {
                if !norm.contains(needle.as_str()) {
                    continue;
                }
            }
            if let Some(suffix) = &suffix {
                if !norm.ends_with(suffix.as_str()) {
                    continue;
                }
            }
            if let Some(re) = &criteria.pattern {
                if !re.is_match(name) {
                    continue;
                }
            }
            out.push(name.clone());
        }
        out
    }
}
