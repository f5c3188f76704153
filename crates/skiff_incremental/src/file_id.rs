//! Stable numeric file identifiers and the path table that assigns them.

use lasso::Rodeo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a file within one program or snapshot.
///
/// Ids are 0-based indices into the file table, assigned in discovery
/// order, and double as indices into `fileNames` in the persisted build info.
/// An id is only meaningful together with the [`FileTable`] that produced it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    /// Creates a `FileId` from a raw `u32` value.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` value of this `FileId`.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns the id as a vector index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// SAFETY: `FileId` wraps a `u32` which is always a valid `usize` on 32-bit and
// 64-bit platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for FileId {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(FileId)
    }
}

/// Interning table mapping project-relative paths to dense [`FileId`]s.
///
/// Backed by a single-threaded [`lasso::Rodeo`]: the table is only mutated by
/// the coordinating thread while a program is loaded or a snapshot decoded.
pub struct FileTable {
    rodeo: Rodeo<FileId>,
}

impl FileTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            rodeo: Rodeo::new(),
        }
    }

    /// Interns a path, returning its existing id or assigning the next one.
    pub fn get_or_insert(&mut self, path: &str) -> FileId {
        self.rodeo.get_or_intern(path)
    }

    /// Returns the id of an already interned path.
    pub fn get(&self, path: &str) -> Option<FileId> {
        self.rodeo.get(path)
    }

    /// Resolves an id back to its path.
    ///
    /// # Panics
    ///
    /// Panics if the id was not created by this table.
    pub fn path(&self, id: FileId) -> &str {
        self.rodeo.resolve(&id)
    }

    /// Resolves an id back to its path, or `None` if it is out of range.
    pub fn try_path(&self, id: FileId) -> Option<&str> {
        self.rodeo.try_resolve(&id)
    }

    /// Returns the number of files in the table.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` if the table holds no files.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// Iterates over `(id, path)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FileId, &str)> + '_ {
        self.rodeo.iter()
    }

    /// Iterates over all ids in order.
    pub fn ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.len() as u32).map(FileId)
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|(_, p)| p)).finish()
    }
}

impl PartialEq for FileTable {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for FileTable {}

impl<'a> FromIterator<&'a str> for FileTable {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut table = FileTable::new();
        for path in iter {
            table.get_or_insert(path);
        }
        table
    }
}
