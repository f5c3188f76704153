//! Per-file version and signature records, and change detection between builds.
//!
//! A file's *version* is the hash of its raw bytes; its *signature* is the hash
//! of its declaration output. Versions decide whether a file changed, signatures
//! decide whether the change is visible to the files that depend on it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skiff_common::ContentHash;

/// How a file is interpreted as a module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpliedFormat {
    /// CommonJS semantics.
    CommonJs,
    /// ECMAScript module semantics.
    Esm,
}

impl ImpliedFormat {
    /// Maps a legacy numeric module-kind code onto a format.
    ///
    /// Older snapshots store the numeric module kind (1 for CommonJS, 5 to 7
    /// and 99 for the ES module kinds) instead of the symbolic name.
    pub fn from_legacy_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(ImpliedFormat::CommonJs),
            5..=7 | 99 => Some(ImpliedFormat::Esm),
            _ => None,
        }
    }

    /// Returns the symbolic name used in the persisted form.
    pub fn as_str(self) -> &'static str {
        match self {
            ImpliedFormat::CommonJs => "commonjs",
            ImpliedFormat::Esm => "esm",
        }
    }

    /// Parses the symbolic name used in the persisted form.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "commonjs" => Some(ImpliedFormat::CommonJs),
            "esm" => Some(ImpliedFormat::Esm),
            _ => None,
        }
    }
}

/// Version state of a single file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileRecord {
    /// Hash of the file's raw bytes.
    pub version: ContentHash,
    /// Hash of the file's declaration output; `None` until the file checks cleanly once.
    pub signature: Option<ContentHash>,
    /// The file can change global declarations visible without an import.
    pub affects_global_scope: bool,
    /// Module interpretation of the file, if known.
    pub implied_format: Option<ImpliedFormat>,
    /// Persisted fields this encoder does not produce itself, carried through
    /// untouched so an older or newer writer's data survives a rebuild.
    pub original: Option<Map<String, Value>>,
}

impl FileRecord {
    /// Creates a record for freshly read content.
    pub fn new(version: ContentHash) -> Self {
        Self {
            version,
            signature: None,
            affects_global_scope: false,
            implied_format: None,
            original: None,
        }
    }
}

/// Result of comparing two [`FileVersionStore`]s.
///
/// Each list is sorted by path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionDiff {
    /// Files whose version matches the previous record.
    pub unchanged: Vec<String>,
    /// Files whose version differs from the previous record.
    pub changed: Vec<String>,
    /// Files with no previous record.
    pub added: Vec<String>,
    /// Files that only have a previous record.
    pub removed: Vec<String>,
}

impl VersionDiff {
    /// Returns `true` if nothing was changed, added, or removed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Map of [`FileRecord`]s keyed by project-relative path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileVersionStore {
    records: BTreeMap<String, FileRecord>,
}

impl FileVersionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes `text` and records it as the current version of `path`.
    ///
    /// An existing signature is kept: the propagator compares the recomputed
    /// signature against it.
    pub fn record_version(&mut self, path: &str, text: &[u8]) -> ContentHash {
        let version = ContentHash::from_bytes(text);
        self.records
            .entry(path.to_string())
            .and_modify(|r| r.version = version)
            .or_insert_with(|| FileRecord::new(version));
        version
    }

    /// Hashes declaration output and records it as the signature of `path`.
    ///
    /// The hash is returned even when `path` has no record.
    pub fn record_signature(&mut self, path: &str, declaration: &str) -> ContentHash {
        let signature = ContentHash::from_text(declaration);
        if let Some(record) = self.records.get_mut(path) {
            record.signature = Some(signature);
        }
        signature
    }

    /// Compares this store (current) against `previous` by version only.
    pub fn diff_against(&self, previous: &FileVersionStore) -> VersionDiff {
        let mut diff = VersionDiff::default();
        for (path, record) in &self.records {
            match previous.records.get(path) {
                Some(old) if old.version == record.version => diff.unchanged.push(path.clone()),
                Some(_) => diff.changed.push(path.clone()),
                None => diff.added.push(path.clone()),
            }
        }
        diff.removed = previous
            .records
            .keys()
            .filter(|p| !self.records.contains_key(*p))
            .cloned()
            .collect();
        diff
    }

    /// Returns the record for `path`.
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    /// Returns a mutable record for `path`.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut FileRecord> {
        self.records.get_mut(path)
    }

    /// Inserts or replaces a record.
    pub fn insert(&mut self, path: impl Into<String>, record: FileRecord) {
        self.records.insert(path.into(), record);
    }

    /// Removes and returns the record for `path`.
    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        self.records.remove(path)
    }

    /// Iterates over records in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.records.iter().map(|(p, r)| (p.as_str(), r))
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
