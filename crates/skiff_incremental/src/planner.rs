//! Decides which output artifacts each file must (re)write.

use std::collections::{BTreeMap, BTreeSet};

use skiff_config::CompilerOptions;

use crate::classify::OptionChanges;
use crate::emit_kind::{ArtifactKind, EmitKind};
use crate::file_id::FileId;
use crate::outputs::OutputPaths;
use crate::program::Program;

/// One output file to produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitAction {
    /// The source file.
    pub file: FileId,
    /// Its path.
    pub source: String,
    /// The artifact to write.
    pub artifact: ArtifactKind,
    /// Where the artifact goes.
    pub output: String,
}

/// Why planned artifacts were not turned into actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferral {
    /// `no_emit` is set.
    NoEmit,
    /// `no_emit_on_error` is set and the program has errors.
    Errors,
}

/// The planner's output.
#[derive(Clone, Debug, Default)]
pub struct EmitPlan {
    /// Actions in program order, artifacts in write order within a file.
    pub actions: Vec<EmitAction>,
    /// Every kind still owed per file, whether or not it became an action.
    pub pending: BTreeMap<FileId, EmitKind>,
    /// Set when pending kinds were recorded but no actions were created.
    pub deferred: Option<Deferral>,
}

impl EmitPlan {
    /// Returns `true` if nothing is owed.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Plans emit work from the recheck set, option changes and carried-over
/// pending kinds.
pub struct EmitPlanner<'a> {
    program: &'a Program,
    options: &'a CompilerOptions,
}

impl<'a> EmitPlanner<'a> {
    /// Creates a planner for a loaded program.
    pub fn new(program: &'a Program, options: &'a CompilerOptions) -> Self {
        Self { program, options }
    }

    /// Computes the plan.
    ///
    /// A file owes the kinds carried from the previous build and the kinds an
    /// emit-shape option flip makes pending everywhere. A rechecked file, or
    /// any file when the output location moved, owes every requested kind.
    /// Kinds the current options do not request are dropped.
    pub fn plan(
        &self,
        rechecked: &BTreeSet<FileId>,
        carried: &BTreeMap<FileId, EmitKind>,
        changes: &OptionChanges,
        has_errors: bool,
    ) -> EmitPlan {
        let requested = EmitKind::requested_by(self.options);
        let deferred = if self.options.no_emit {
            Some(Deferral::NoEmit)
        } else if self.options.no_emit_on_error && has_errors {
            Some(Deferral::Errors)
        } else {
            None
        };

        let mut plan = EmitPlan {
            deferred,
            ..EmitPlan::default()
        };
        for source in self.program.files() {
            let Some(outputs) = OutputPaths::for_source(&source.path, self.options) else {
                continue;
            };
            let mut kinds = carried.get(&source.id).copied().unwrap_or_default() | changes.emit_pending;
            if rechecked.contains(&source.id) || changes.output_location {
                kinds |= requested;
            }
            kinds &= requested;
            if kinds.is_empty() {
                continue;
            }
            plan.pending.insert(source.id, kinds);
            if deferred.is_some() {
                continue;
            }
            for artifact in kinds.artifacts() {
                plan.actions.push(EmitAction {
                    file: source.id,
                    source: source.path.clone(),
                    artifact,
                    output: outputs.get(artifact).to_string(),
                });
            }
        }

        tracing::debug!(
            target: "skiff.incremental",
            files = plan.pending.len(),
            actions = plan.actions.len(),
            deferred = ?plan.deferred,
            "planned emit"
        );
        plan
    }
}
