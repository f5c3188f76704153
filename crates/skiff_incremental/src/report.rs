//! What a build did, for the CLI and for tests.

use std::fmt;

use skiff_diagnostics::Diagnostic;

use crate::emit_kind::ArtifactKind;
use crate::planner::Deferral;
use crate::propagate::CheckReason;

/// What happened to the previous build info.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// Decoded and used.
    Reused,
    /// No build info existed.
    Missing,
    /// Build info existed but could not be used.
    Discarded,
    /// Build info was skipped (`--force` or non-incremental).
    Ignored,
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SnapshotStatus::Reused => "reused",
            SnapshotStatus::Missing => "missing",
            SnapshotStatus::Discarded => "discarded",
            SnapshotStatus::Ignored => "ignored",
        })
    }
}

/// One rechecked file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckRecord {
    /// The file's path.
    pub path: String,
    /// Why it was rechecked.
    pub reason: CheckReason,
    /// Its signature changed.
    pub signature_changed: bool,
    /// The checker failed on it.
    pub errored: bool,
}

/// Result of one planned artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The output did not exist and was written.
    Created,
    /// The output existed with different bytes and was overwritten.
    Written,
    /// The output already had these bytes; nothing was written.
    Unchanged,
    /// The artifact could not be produced or written.
    Failed,
    /// Dry run: the artifact would be produced.
    Planned,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Written => "written",
            WriteOutcome::Unchanged => "unchanged",
            WriteOutcome::Failed => "failed",
            WriteOutcome::Planned => "planned",
        })
    }
}

/// One planned artifact and what became of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitRecord {
    /// The source file.
    pub source: String,
    /// The artifact kind.
    pub artifact: ArtifactKind,
    /// The output path.
    pub output: String,
    /// The outcome.
    pub outcome: WriteOutcome,
}

/// Summary of one build.
#[derive(Clone, Debug)]
pub struct BuildReport {
    /// What happened to the previous build info.
    pub snapshot: SnapshotStatus,
    /// Rechecked files in id order.
    pub checked: Vec<CheckRecord>,
    /// Paths whose signature changed, in id order.
    pub signature_changed: Vec<String>,
    /// Planned artifacts in plan order.
    pub emitted: Vec<EmitRecord>,
    /// Set when emit was withheld.
    pub deferred: Option<Deferral>,
    /// Every diagnostic of the program, including replayed ones.
    pub diagnostics: Vec<Diagnostic>,
    /// The build-info file was rewritten.
    pub build_info_written: bool,
    /// The declaration output of the last file whose signature changed.
    pub latest_changed_dts_file: Option<String>,
}

impl BuildReport {
    pub(crate) fn new(snapshot: SnapshotStatus) -> Self {
        Self {
            snapshot,
            checked: Vec::new(),
            signature_changed: Vec::new(),
            emitted: Vec::new(),
            deferred: None,
            diagnostics: Vec::new(),
            build_info_written: false,
            latest_changed_dts_file: None,
        }
    }

    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    /// Returns the paths of rechecked files.
    pub fn checked_paths(&self) -> Vec<&str> {
        self.checked.iter().map(|c| c.path.as_str()).collect()
    }

    /// Returns the outputs that were written to disk.
    pub fn written(&self) -> Vec<&str> {
        self.with_outcome(|o| matches!(o, WriteOutcome::Created | WriteOutcome::Written))
    }

    /// Returns the outputs whose bytes already matched.
    pub fn unchanged(&self) -> Vec<&str> {
        self.with_outcome(|o| o == WriteOutcome::Unchanged)
    }

    /// Returns the outputs that could not be produced.
    pub fn failed(&self) -> Vec<&str> {
        self.with_outcome(|o| o == WriteOutcome::Failed)
    }

    fn with_outcome(&self, keep: impl Fn(WriteOutcome) -> bool) -> Vec<&str> {
        self.emitted
            .iter()
            .filter(|e| keep(e.outcome))
            .map(|e| e.output.as_str())
            .collect()
    }

    /// Returns `true` if nothing was checked and no file was written.
    pub fn is_noop(&self) -> bool {
        self.checked.is_empty() && self.written().is_empty() && !self.build_info_written
    }
}

/// Result of comparing the project against its build info without building.
#[derive(Clone, Debug)]
pub struct StatusReport {
    /// What happened to the build info.
    pub snapshot: SnapshotStatus,
    /// Files whose content changed.
    pub changed: Vec<String>,
    /// Files new to the program.
    pub added: Vec<String>,
    /// Files no longer in the program.
    pub removed: Vec<String>,
    /// Options differ in a way that invalidates checks or outputs.
    pub options_changed: bool,
    /// Files with artifacts still owed from earlier builds.
    pub pending_emit: Vec<String>,
    /// Files whose last check failed.
    pub pending_check: Vec<String>,
}

impl StatusReport {
    /// Returns `true` if a build would have nothing to do.
    pub fn is_up_to_date(&self) -> bool {
        self.snapshot == SnapshotStatus::Reused
            && self.changed.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.options_changed
            && self.pending_emit.is_empty()
            && self.pending_check.is_empty()
    }
}

/// Files removed by a clean.
#[derive(Clone, Debug, Default)]
pub struct CleanReport {
    /// Removed paths, outputs first, build info last.
    pub removed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_diagnostics::{Category, DiagnosticCode};

    fn record(output: &str, outcome: WriteOutcome) -> EmitRecord {
        EmitRecord {
            source: "a.ts".to_string(),
            artifact: ArtifactKind::Js,
            output: output.to_string(),
            outcome,
        }
    }

    #[test]
    fn outcomes_are_grouped() {
        let mut report = BuildReport::new(SnapshotStatus::Reused);
        report.emitted = vec![
            record("a.js", WriteOutcome::Created),
            record("b.js", WriteOutcome::Unchanged),
            record("c.js", WriteOutcome::Written),
            record("d.js", WriteOutcome::Failed),
        ];
        assert_eq!(report.written(), vec!["a.js", "c.js"]);
        assert_eq!(report.unchanged(), vec!["b.js"]);
        assert_eq!(report.failed(), vec!["d.js"]);
        assert!(!report.is_noop());
    }

    #[test]
    fn errors_come_from_diagnostics() {
        let mut report = BuildReport::new(SnapshotStatus::Missing);
        assert!(!report.has_errors());
        assert!(report.is_noop());
        report.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::new(Category::Build, 1),
            "note",
        ));
        assert!(!report.has_errors());
        report.diagnostics.push(Diagnostic::error(
            DiagnosticCode::new(Category::Error, 2307),
            "missing",
        ));
        assert!(report.has_errors());
    }

    #[test]
    fn status_requires_a_reused_snapshot() {
        let status = StatusReport {
            snapshot: SnapshotStatus::Missing,
            changed: Vec::new(),
            added: Vec::new(),
            removed: Vec::new(),
            options_changed: false,
            pending_emit: Vec::new(),
            pending_check: Vec::new(),
        };
        assert!(!status.is_up_to_date());
        let status = StatusReport {
            snapshot: SnapshotStatus::Reused,
            ..status
        };
        assert!(status.is_up_to_date());
    }
}
