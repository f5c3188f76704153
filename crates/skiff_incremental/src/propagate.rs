//! Affected-file propagation with early cutoff.
//!
//! Starting from the directly changed files, each file is rechecked and its
//! signature recomputed. Only a changed signature (or a checker fault) pulls
//! the file's dependents into the work set; an unchanged signature stops
//! propagation there. Every file is checked at most once per build, which
//! bounds the work even when the graph has cycles.
//!
//! Work is processed in waves. A wave holds the queued files with the lowest
//! dependency level, so no file is checked before the files it depends on
//! have their final signature for this build (files in one cycle share a
//! level). Waves are checked in parallel and merged in id order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rayon::prelude::*;
use skiff_common::{InternalError, SkiffResult};
use skiff_config::CompilerOptions;
use skiff_diagnostics::{Category, Diagnostic, DiagnosticCode};

use crate::cancel::CancellationToken;
use crate::error::BuildError;
use crate::file_id::FileId;
use crate::graph::DependencyGraph;
use crate::host::{CheckOutput, CheckRequest, Checker, CheckerFault, DependencySignature};
use crate::program::{Program, SourceFile};
use crate::version::FileVersionStore;

/// The checker failed internally on a file.
pub const CHECKER_FAULT: DiagnosticCode = DiagnosticCode::new(Category::Build, 5001);

/// Why a file was rechecked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckReason {
    /// No usable previous snapshot.
    FullBuild,
    /// Options that affect checking changed.
    OptionsChanged,
    /// A file declaring globals changed, was added or was removed.
    GlobalScopeChanged(String),
    /// The file is new to the program.
    Added,
    /// The file's content changed.
    ContentChanged,
    /// The file's references now resolve to different files.
    ReferencesChanged,
    /// A file this one depended on left the program.
    DependencyRemoved(String),
    /// The last check of this file failed.
    PreviouslyErrored,
    /// A dependency's signature changed in this build.
    DependencySignatureChanged(String),
    /// A dependency could not be checked in this build.
    DependencyErrored(String),
}

impl fmt::Display for CheckReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckReason::FullBuild => f.write_str("no previous build info"),
            CheckReason::OptionsChanged => f.write_str("compiler options changed"),
            CheckReason::GlobalScopeChanged(path) => write!(f, "global declarations in '{path}' changed"),
            CheckReason::Added => f.write_str("file added"),
            CheckReason::ContentChanged => f.write_str("content changed"),
            CheckReason::ReferencesChanged => f.write_str("references resolve differently"),
            CheckReason::DependencyRemoved(path) => write!(f, "dependency '{path}' was removed"),
            CheckReason::PreviouslyErrored => f.write_str("previous check failed"),
            CheckReason::DependencySignatureChanged(path) => {
                write!(f, "signature of '{path}' changed")
            }
            CheckReason::DependencyErrored(path) => write!(f, "dependency '{path}' failed to check"),
        }
    }
}

/// Outcome of rechecking one file.
#[derive(Clone, Debug)]
pub struct CheckedFile {
    /// Why the file was rechecked.
    pub reason: CheckReason,
    /// The recomputed signature differs from the stored one.
    pub signature_changed: bool,
    /// The checker failed on the file.
    pub errored: bool,
    /// Diagnostics from this check.
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a propagation run.
#[derive(Debug, Default)]
pub struct Propagation {
    /// Every rechecked file.
    pub checked: BTreeMap<FileId, CheckedFile>,
    /// Number of waves processed.
    pub waves: usize,
}

impl Propagation {
    /// Rechecked files, in id order.
    pub fn rechecked(&self) -> BTreeSet<FileId> {
        self.checked.keys().copied().collect()
    }

    /// Files whose signature changed, in id order.
    pub fn signature_changed(&self) -> impl Iterator<Item = FileId> + '_ {
        self.checked
            .iter()
            .filter(|(_, c)| c.signature_changed)
            .map(|(id, _)| *id)
    }

    /// Files the checker failed on, in id order.
    pub fn errored(&self) -> impl Iterator<Item = FileId> + '_ {
        self.checked
            .iter()
            .filter(|(_, c)| c.errored)
            .map(|(id, _)| *id)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    Queued,
    Done,
}

/// Pending files keyed by dependency level, plus the visited set.
struct WorkQueue {
    levels: Vec<u32>,
    visit: Vec<Visit>,
    reasons: Vec<Option<CheckReason>>,
    queue: BTreeSet<(u32, FileId)>,
}

impl WorkQueue {
    fn new(levels: Vec<u32>) -> Self {
        let file_count = levels.len();
        Self {
            levels,
            visit: vec![Visit::Unseen; file_count],
            reasons: vec![None; file_count],
            queue: BTreeSet::new(),
        }
    }

    /// Queues a file unless it was already queued or checked in this build.
    fn push(&mut self, file: FileId, reason: CheckReason) {
        let idx = file.index();
        if self.visit.get(idx) == Some(&Visit::Unseen) {
            self.visit[idx] = Visit::Queued;
            self.reasons[idx] = Some(reason);
            self.queue.insert((self.levels[idx], file));
        }
    }

    /// Removes every queued file at the lowest level and marks it checked.
    fn next_wave(&mut self) -> Option<(u32, Vec<(FileId, CheckReason)>)> {
        let &(level, _) = self.queue.first()?;
        let rest = self.queue.split_off(&(level + 1, FileId::from_raw(0)));
        let wave = std::mem::replace(&mut self.queue, rest)
            .into_iter()
            .map(|(_, file)| {
                let idx = file.index();
                self.visit[idx] = Visit::Done;
                let reason = self.reasons[idx]
                    .take()
                    .unwrap_or(CheckReason::ContentChanged);
                (file, reason)
            })
            .collect();
        Some((level, wave))
    }
}

/// Every wave finalizes at least one file, so more waves than files is a bug.
fn ensure_settling(waves: usize, file_count: usize) -> SkiffResult<()> {
    if waves > file_count {
        return Err(InternalError::new(format!(
            "propagation did not settle after {file_count} waves"
        )));
    }
    Ok(())
}

/// Drives rechecking of affected files.
pub struct AffectedFilePropagator<'a> {
    program: &'a Program,
    graph: &'a DependencyGraph,
    checker: &'a dyn Checker,
    options: &'a CompilerOptions,
    cancel: &'a CancellationToken,
}

impl<'a> AffectedFilePropagator<'a> {
    /// Creates a propagator over a loaded program and its dependency graph.
    pub fn new(
        program: &'a Program,
        graph: &'a DependencyGraph,
        checker: &'a dyn Checker,
        options: &'a CompilerOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            program,
            graph,
            checker,
            options,
            cancel,
        }
    }

    /// Rechecks `seeds` and everything their signature changes reach.
    ///
    /// `versions` must hold a record for every program file, carrying the
    /// previous signature where one exists; recomputed signatures are written
    /// back into it.
    pub fn run(
        &self,
        versions: &mut FileVersionStore,
        seeds: BTreeMap<FileId, CheckReason>,
    ) -> Result<Propagation, BuildError> {
        let file_count = self.program.len();
        let mut work = WorkQueue::new(self.graph.levels(file_count));
        for (file, reason) in seeds {
            work.push(file, reason);
        }

        let mut propagation = Propagation::default();
        while let Some((level, wave)) = work.next_wave() {
            self.cancel.check()?;
            propagation.waves += 1;
            ensure_settling(propagation.waves, file_count)?;
            tracing::debug!(target: "skiff.incremental", level, files = wave.len(), "checking wave");

            let store: &FileVersionStore = versions;
            let results: Vec<Option<Result<CheckOutput, CheckerFault>>> = wave
                .par_iter()
                .map(|(file, _)| {
                    if self.cancel.is_cancelled() {
                        None
                    } else {
                        Some(self.check_file(*file, store))
                    }
                })
                .collect();

            for ((file, reason), result) in wave.into_iter().zip(results) {
                let Some(result) = result else {
                    return Err(BuildError::Cancelled);
                };
                let checked = self.merge(file, reason, result, versions, &mut work)?;
                propagation.checked.insert(file, checked);
            }
        }

        tracing::debug!(
            target: "skiff.incremental",
            checked = propagation.checked.len(),
            waves = propagation.waves,
            "propagation finished"
        );
        Ok(propagation)
    }

    /// Records one file's result and queues its dependents if they are affected.
    fn merge(
        &self,
        file: FileId,
        reason: CheckReason,
        result: Result<CheckOutput, CheckerFault>,
        versions: &mut FileVersionStore,
        work: &mut WorkQueue,
    ) -> Result<CheckedFile, BuildError> {
        let source = self.source(file)?;

        match result {
            Ok(output) => {
                let previous = versions.get(&source.path).and_then(|r| r.signature);
                let signature = match &output.declaration {
                    Some(text) => versions.record_signature(&source.path, text),
                    None => {
                        if let Some(record) = versions.get_mut(&source.path) {
                            record.signature = Some(source.version);
                        }
                        source.version
                    }
                };
                let signature_changed = previous != Some(signature);
                if signature_changed {
                    for dependent in self.graph.dependents(file) {
                        work.push(
                            dependent,
                            CheckReason::DependencySignatureChanged(source.path.clone()),
                        );
                    }
                }
                tracing::trace!(
                    target: "skiff.incremental",
                    path = %source.path,
                    %reason,
                    signature_changed,
                    "checked"
                );
                Ok(CheckedFile {
                    reason,
                    signature_changed,
                    errored: false,
                    diagnostics: output.diagnostics,
                })
            }
            Err(fault) => {
                tracing::warn!(
                    target: "skiff.incremental",
                    path = %source.path,
                    error = %fault,
                    "checker fault"
                );
                for dependent in self.graph.dependents(file) {
                    work.push(
                        dependent,
                        CheckReason::DependencyErrored(source.path.clone()),
                    );
                }
                let diagnostic = Diagnostic::error(
                    CHECKER_FAULT,
                    format!("internal error while checking '{}': {fault}", source.path),
                )
                .in_file(&source.path);
                Ok(CheckedFile {
                    reason,
                    signature_changed: false,
                    errored: true,
                    diagnostics: vec![diagnostic],
                })
            }
        }
    }

    fn source(&self, file: FileId) -> SkiffResult<&'a SourceFile> {
        self.program
            .file(file)
            .ok_or_else(|| InternalError::new(format!("file {file} is not in the program")))
    }

    fn check_file(
        &self,
        file: FileId,
        versions: &FileVersionStore,
    ) -> Result<CheckOutput, CheckerFault> {
        let source = self
            .program
            .file(file)
            .ok_or_else(|| CheckerFault::new(format!("file {file} is not in the program")))?;
        let dependency_signatures = self
            .graph
            .dependencies(file)
            .map(|deps| {
                deps.iter()
                    .filter_map(|&dep| {
                        let path = self.program.file(dep)?.path.clone();
                        let signature = versions.get(&path).and_then(|r| r.signature);
                        Some(DependencySignature {
                            file: dep,
                            path,
                            signature,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        let request = CheckRequest {
            file,
            path: &source.path,
            text: &source.text,
            dependency_signatures,
            program: self.program,
            options: self.options,
        };
        tracing::trace!(target: "skiff.incremental", path = %source.path, "type checking");
        self.checker.type_check(&request)
    }
}
