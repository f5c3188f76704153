//! The persisted state of one build root between invocations.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde_json::{Map, Value};
use skiff_config::CompilerOptions;
use skiff_diagnostics::Diagnostic;

use crate::emit_kind::EmitKind;
use crate::file_id::{FileId, FileTable};
use crate::graph::DependencyGraph;
use crate::outputs::OutputPaths;
use crate::version::{FileRecord, FileVersionStore};

/// Everything the next build needs to know about this one.
///
/// Owned by the driver for the duration of one build: loaded (or created
/// empty), replaced by the planned successor, and persisted once the build
/// completes. All id-keyed maps use the ids of [`files`](Self::files).
#[derive(Debug, Default)]
pub struct BuildSnapshot {
    /// Program files in id order.
    pub files: FileTable,
    /// Version and signature records keyed by path.
    pub versions: FileVersionStore,
    /// Forward dependency edges between files.
    pub graph: DependencyGraph,
    /// Options the snapshot was built with.
    pub options: CompilerOptions,
    /// Persisted option keys this encoder does not recognize.
    pub unknown_options: Map<String, Value>,
    /// Declaration output of the last file (in id order) whose signature changed.
    pub latest_changed_dts_file: Option<String>,
    /// Artifacts planned or deferred but not yet written.
    pub pending_emit: BTreeMap<FileId, EmitKind>,
    /// Files that must be rechecked regardless of their version.
    pub pending_check: BTreeSet<FileId>,
    /// Diagnostics of the last check of each file, replayed when it is skipped.
    pub diagnostics: BTreeMap<FileId, Vec<Diagnostic>>,
    /// The program had error diagnostics when the snapshot was produced.
    pub errors: bool,
    /// Persisted top-level fields this encoder does not recognize.
    pub unknown_fields: Map<String, Value>,
}

impl BuildSnapshot {
    /// Creates an empty snapshot for a first build.
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Returns the id of `path`, if it is part of the snapshot.
    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.files.get(path)
    }

    /// Returns the record for `path`.
    pub fn record(&self, path: &str) -> Option<&FileRecord> {
        self.versions.get(path)
    }

    /// Returns the paths `path` depends on, or `None` if it has no edge data.
    pub fn dependencies_of(&self, path: &str) -> Option<Vec<&str>> {
        let id = self.file_id(path)?;
        let deps = self.graph.dependencies(id)?;
        Some(deps.iter().map(|d| self.files.path(*d)).collect())
    }

    /// Returns the paths that depend on `path`.
    pub fn dependents_of(&self, path: &str) -> Vec<&str> {
        match self.file_id(path) {
            Some(id) => self.graph.dependents(id).map(|d| self.files.path(d)).collect(),
            None => Vec::new(),
        }
    }

    /// Returns pending emit kinds for `path`.
    pub fn pending_emit_of(&self, path: &str) -> EmitKind {
        self.file_id(path)
            .and_then(|id| self.pending_emit.get(&id).copied())
            .unwrap_or_default()
    }

    /// Iterates over the paths of all files in id order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(_, p)| p)
    }

    /// Artifact paths of this snapshot's sources, under the options it was
    /// built with and under `current`.
    pub fn emitted_outputs(&self, current: &CompilerOptions) -> HashSet<String> {
        self.paths()
            .flat_map(|path| {
                [&self.options, current]
                    .into_iter()
                    .filter_map(move |options| OutputPaths::for_source(path, options))
            })
            .flat_map(|outputs| outputs.all().map(str::to_string))
            .collect()
    }

    /// Returns `true` if `other` describes the same files, hashes, edges and
    /// pending work, ignoring id assignment.
    pub fn equivalent(&self, other: &BuildSnapshot) -> bool {
        if self.versions != other.versions || self.options != other.options {
            return false;
        }
        if self.errors != other.errors {
            return false;
        }
        self.paths().all(|path| {
            self.dependencies_of(path).map(sorted) == other.dependencies_of(path).map(sorted)
                && self.pending_emit_of(path) == other.pending_emit_of(path)
        }) && self.files.len() == other.files.len()
    }
}

fn sorted(mut paths: Vec<&str>) -> Vec<&str> {
    paths.sort_unstable();
    paths
}
