//! One build, split into planning and execution.
//!
//! [`plan_build`] loads the program, classifies it against the previous
//! snapshot, rechecks what changed and plans the emit work. Nothing is
//! written until [`BuildPlan::execute`], so a dry run is a plan that is never
//! executed.

use std::collections::BTreeMap;

use rayon::prelude::*;
use skiff_config::CompilerOptions;
use skiff_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::cancel::CancellationToken;
use crate::classify::{ChangeClassifier, ChangeSet};
use crate::codec::BuildInfoCodec;
use crate::emit_kind::EmitKind;
use crate::error::BuildError;
use crate::file_id::FileId;
use crate::fs::FileSystem;
use crate::host::{Checker, CheckerFault, EmitRequest, Emitter};
use crate::outputs::OutputPaths;
use crate::planner::{EmitAction, EmitPlan, EmitPlanner};
use crate::program::Program;
use crate::propagate::{AffectedFilePropagator, CheckReason, Propagation};
use crate::report::{BuildReport, CheckRecord, EmitRecord, SnapshotStatus, WriteOutcome};
use crate::snapshot::BuildSnapshot;
use crate::version::{FileRecord, FileVersionStore};

/// An output could not be written.
pub const WRITE_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Build, 5033);
/// The emitter failed on an artifact.
pub const EMIT_FAULT: DiagnosticCode = DiagnosticCode::new(Category::Build, 5034);

/// The collaborators a build runs against.
pub struct BuildHost<'a> {
    /// Source and output storage.
    pub fs: &'a dyn FileSystem,
    /// The type checker.
    pub checker: &'a dyn Checker,
    /// The code generator.
    pub emitter: &'a dyn Emitter,
    /// Checked between waves and between writes.
    pub cancel: CancellationToken,
}

impl<'a> BuildHost<'a> {
    /// Creates a host with a fresh cancellation token.
    pub fn new(fs: &'a dyn FileSystem, checker: &'a dyn Checker, emitter: &'a dyn Emitter) -> Self {
        Self {
            fs,
            checker,
            emitter,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` instead of a private token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A planned build, ready to execute.
#[derive(Debug)]
pub struct BuildPlan {
    program: Program,
    snapshot: BuildSnapshot,
    emit: EmitPlan,
    pub(crate) report: BuildReport,
}

/// An executed build and the snapshot to persist.
#[derive(Debug)]
pub struct CompletedBuild {
    /// What the build did.
    pub report: BuildReport,
    /// State for the next build. Artifacts not written are still pending.
    pub snapshot: BuildSnapshot,
    /// Cancellation stopped the write phase early.
    pub cancelled: bool,
}

/// Plans a build of `roots` against the encoded previous snapshot.
///
/// Undecodable `previous` bytes are a cache miss. Checks run here; no file
/// is written.
pub fn plan_build(
    host: &BuildHost<'_>,
    roots: &[String],
    options: &CompilerOptions,
    previous: Option<&[u8]>,
) -> Result<BuildPlan, BuildError> {
    let (previous, status) = match previous.map(BuildInfoCodec::decode) {
        None => (None, SnapshotStatus::Missing),
        Some(None) => (None, SnapshotStatus::Discarded),
        Some(Some(snapshot)) => (Some(snapshot), SnapshotStatus::Reused),
    };
    let previous = previous.as_ref();
    host.cancel.check()?;

    let outputs = previous
        .map(|p| p.emitted_outputs(options))
        .unwrap_or_default();
    let program = Program::load_excluding(host.fs, host.checker, roots, &outputs);
    let graph = program.dependency_graph();
    let mut versions = current_versions(&program, previous);
    let changes = ChangeClassifier::classify(previous, &versions, options);
    let seeds = seed_checks(&program, &changes, previous);
    tracing::debug!(
        target: "skiff.incremental",
        snapshot = %status,
        changed = changes.changed.len(),
        added = changes.added.len(),
        removed = changes.removed.len(),
        seeds = seeds.len(),
        "classified changes"
    );

    let propagation =
        AffectedFilePropagator::new(&program, &graph, host.checker, options, &host.cancel)
            .run(&mut versions, seeds)?;

    let diagnostics = file_diagnostics(&program, &propagation, previous);
    let sink = DiagnosticSink::new();
    sink.emit_all(program.diagnostics().iter().cloned());
    for diags in diagnostics.values() {
        sink.emit_all(diags.iter().cloned());
    }
    let has_errors = sink.has_errors();
    if has_errors {
        tracing::debug!(
            target: "skiff.incremental",
            files = ?sink.files_with_errors(),
            "program has errors"
        );
    }

    let emit = EmitPlanner::new(&program, options).plan(
        &propagation.rechecked(),
        &carried_pending(&program, previous),
        &changes.options,
        has_errors,
    );

    let latest_changed_dts_file = latest_changed_dts_file(&program, &propagation, options, previous);

    let path_of = |id: FileId| program.file(id).map(|f| f.path.clone());
    let mut report = BuildReport::new(status);
    report.checked = propagation
        .checked
        .iter()
        .filter_map(|(id, checked)| {
            Some(CheckRecord {
                path: path_of(*id)?,
                reason: checked.reason.clone(),
                signature_changed: checked.signature_changed,
                errored: checked.errored,
            })
        })
        .collect();
    report.signature_changed = propagation.signature_changed().filter_map(path_of).collect();
    report.deferred = emit.deferred;
    report.diagnostics = sink.take_all();
    report.latest_changed_dts_file = latest_changed_dts_file.clone();

    let snapshot = BuildSnapshot {
        files: program.file_table(),
        versions,
        graph,
        options: options.clone(),
        unknown_options: previous.map(|p| p.unknown_options.clone()).unwrap_or_default(),
        latest_changed_dts_file,
        pending_emit: emit.pending.clone(),
        pending_check: propagation.errored().collect(),
        diagnostics,
        errors: has_errors,
        unknown_fields: previous.map(|p| p.unknown_fields.clone()).unwrap_or_default(),
    };

    Ok(BuildPlan {
        program,
        snapshot,
        emit,
        report,
    })
}

impl BuildPlan {
    /// What the build will do, with no emit outcomes yet.
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Planned emit actions.
    pub fn actions(&self) -> &[EmitAction] {
        &self.emit.actions
    }

    /// The loaded program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The successor snapshot as planned, with every planned artifact pending.
    pub fn snapshot(&self) -> &BuildSnapshot {
        &self.snapshot
    }

    /// Encodes the planned snapshot.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, BuildError> {
        BuildInfoCodec::encode(&self.snapshot)
    }

    /// Finishes without writing: every action is reported as planned.
    pub fn into_dry_run(self) -> BuildReport {
        let mut report = self.report;
        report.emitted = self
            .emit
            .actions
            .into_iter()
            .map(|action| EmitRecord {
                source: action.source,
                artifact: action.artifact,
                output: action.output,
                outcome: WriteOutcome::Planned,
            })
            .collect();
        report
    }

    /// Produces and writes every planned artifact.
    ///
    /// Artifact text is generated in parallel and written in plan order.
    /// Outputs whose bytes already match are not rewritten. A failed write is
    /// a diagnostic and leaves its kind pending; it never stops the other
    /// writes.
    pub fn execute(self, host: &BuildHost<'_>) -> Result<CompletedBuild, BuildError> {
        let BuildPlan {
            program,
            mut snapshot,
            emit,
            mut report,
        } = self;
        host.cancel.check()?;

        let options = snapshot.options.clone();
        let texts: Vec<Option<Result<String, CheckerFault>>> = emit
            .actions
            .par_iter()
            .map(|action| {
                if host.cancel.is_cancelled() {
                    None
                } else {
                    Some(render(host, &program, &options, action))
                }
            })
            .collect();

        let sink = DiagnosticSink::new();
        let mut cancelled = false;
        for (action, text) in emit.actions.iter().zip(texts) {
            let Some(text) = text.filter(|_| !host.cancel.is_cancelled()) else {
                cancelled = true;
                break;
            };
            let result = match text {
                Ok(text) => write_output(host.fs, action, text.as_bytes()),
                Err(fault) => Err(Diagnostic::error(
                    EMIT_FAULT,
                    format!("cannot emit '{}': {fault}", action.output),
                )
                .in_file(&action.source)),
            };
            let outcome = match result {
                Ok(outcome) => {
                    clear_pending(&mut snapshot.pending_emit, action);
                    outcome
                }
                Err(diag) => {
                    tracing::warn!(
                        target: "skiff.incremental",
                        output = %action.output,
                        message = %diag.message,
                        "artifact not written"
                    );
                    sink.emit(diag);
                    WriteOutcome::Failed
                }
            };
            tracing::trace!(target: "skiff.incremental", output = %action.output, %outcome, "emit");
            report.emitted.push(EmitRecord {
                source: action.source.clone(),
                artifact: action.artifact,
                output: action.output.clone(),
                outcome,
            });
        }

        if sink.has_errors() {
            snapshot.errors = true;
        }
        report.diagnostics.extend(sink.take_all());
        if cancelled {
            tracing::debug!(
                target: "skiff.incremental",
                written = report.emitted.len(),
                planned = emit.actions.len(),
                "emit cancelled"
            );
        }
        Ok(CompletedBuild {
            report,
            snapshot,
            cancelled,
        })
    }
}

fn render(
    host: &BuildHost<'_>,
    program: &Program,
    options: &CompilerOptions,
    action: &EmitAction,
) -> Result<String, CheckerFault> {
    let source = program
        .file(action.file)
        .ok_or_else(|| CheckerFault::new(format!("file {} is not in the program", action.file)))?;
    let outputs = OutputPaths::for_source(&source.path, options)
        .ok_or_else(|| CheckerFault::new(format!("'{}' produces no outputs", source.path)))?;
    host.emitter.emit(&EmitRequest {
        file: source.id,
        path: &source.path,
        text: &source.text,
        artifact: action.artifact,
        outputs: &outputs,
        program,
        options,
    })
}

fn write_output(
    fs: &dyn FileSystem,
    action: &EmitAction,
    bytes: &[u8],
) -> Result<WriteOutcome, Diagnostic> {
    let existing = fs.read_file(&action.output).ok();
    if existing.as_deref() == Some(bytes) {
        return Ok(WriteOutcome::Unchanged);
    }
    fs.write_file(&action.output, bytes).map_err(|err| {
        Diagnostic::error(WRITE_FAILED, format!("cannot write '{}'", action.output))
            .in_file(&action.source)
            .with_note(err.to_string())
    })?;
    Ok(if existing.is_some() {
        WriteOutcome::Written
    } else {
        WriteOutcome::Created
    })
}

fn clear_pending(pending: &mut BTreeMap<FileId, EmitKind>, action: &EmitAction) {
    if let Some(kinds) = pending.get_mut(&action.file) {
        kinds.remove(action.artifact.produced_by());
        if kinds.is_empty() {
            pending.remove(&action.file);
        }
    }
}

/// Version records for the program, carrying signatures and preserved
/// fields from the previous snapshot by path.
fn current_versions(program: &Program, previous: Option<&BuildSnapshot>) -> FileVersionStore {
    let mut versions = FileVersionStore::new();
    for file in program.files() {
        let before = previous.and_then(|p| p.record(&file.path));
        let mut record = FileRecord::new(file.version);
        record.signature = before.and_then(|r| r.signature);
        record.affects_global_scope = file.scan.affects_global_scope;
        record.implied_format = file
            .scan
            .implied_format
            .or_else(|| before.and_then(|r| r.implied_format));
        record.original = before.and_then(|r| r.original.clone());
        versions.insert(file.path.clone(), record);
    }
    versions
}

/// Files that must be rechecked regardless of what propagation finds.
fn seed_checks(
    program: &Program,
    changes: &ChangeSet,
    previous: Option<&BuildSnapshot>,
) -> BTreeMap<FileId, CheckReason> {
    let Some(previous) = previous else {
        return program
            .files()
            .iter()
            .map(|f| (f.id, CheckReason::FullBuild))
            .collect();
    };

    let mut seeds = BTreeMap::new();
    let everything = if changes.options.semantic {
        Some(CheckReason::OptionsChanged)
    } else {
        changes
            .global_scope_change
            .clone()
            .map(CheckReason::GlobalScopeChanged)
    };
    if let Some(reason) = everything {
        for file in program.files() {
            seeds.insert(file.id, reason.clone());
        }
    }

    let id_of = |path: &str| program.file_by_path(path).map(|f| f.id);
    for id in changes.changed.iter().filter_map(|p| id_of(p)) {
        seeds.entry(id).or_insert(CheckReason::ContentChanged);
    }
    for id in changes.added.iter().filter_map(|p| id_of(p)) {
        seeds.entry(id).or_insert(CheckReason::Added);
    }
    for removed in &changes.removed {
        for id in previous.dependents_of(removed).into_iter().filter_map(id_of) {
            seeds
                .entry(id)
                .or_insert_with(|| CheckReason::DependencyRemoved(removed.clone()));
        }
    }
    for path in &changes.unchanged {
        let Some(file) = program.file_by_path(path) else {
            continue;
        };
        let mut now: Vec<&str> = file
            .dependencies()
            .into_iter()
            .filter_map(|d| program.file(d).map(|f| f.path.as_str()))
            .collect();
        now.sort_unstable();
        let before = previous.dependencies_of(path).map(|mut deps| {
            deps.sort_unstable();
            deps
        });
        if before.as_deref() != Some(now.as_slice()) {
            seeds.entry(file.id).or_insert(CheckReason::ReferencesChanged);
        }
    }
    for path in previous
        .pending_check
        .iter()
        .filter_map(|id| previous.files.try_path(*id))
    {
        if let Some(id) = id_of(path) {
            seeds.entry(id).or_insert(CheckReason::PreviouslyErrored);
        }
    }
    seeds
}

/// Diagnostics per file: fresh for rechecked files, replayed otherwise.
fn file_diagnostics(
    program: &Program,
    propagation: &Propagation,
    previous: Option<&BuildSnapshot>,
) -> BTreeMap<FileId, Vec<Diagnostic>> {
    program
        .files()
        .iter()
        .filter_map(|file| {
            let diags = match propagation.checked.get(&file.id) {
                Some(checked) => checked.diagnostics.clone(),
                None => previous
                    .and_then(|p| p.file_id(&file.path).and_then(|id| p.diagnostics.get(&id)))
                    .cloned()
                    .unwrap_or_default(),
            };
            (!diags.is_empty()).then_some((file.id, diags))
        })
        .collect()
}

fn carried_pending(program: &Program, previous: Option<&BuildSnapshot>) -> BTreeMap<FileId, EmitKind> {
    let Some(previous) = previous else {
        return BTreeMap::new();
    };
    program
        .files()
        .iter()
        .filter_map(|file| {
            let kinds = previous.pending_emit_of(&file.path);
            (!kinds.is_empty()).then_some((file.id, kinds))
        })
        .collect()
}

/// The previous value is carried over only while a program file still
/// emits that declaration.
fn latest_changed_dts_file(
    program: &Program,
    propagation: &Propagation,
    options: &CompilerOptions,
    previous: Option<&BuildSnapshot>,
) -> Option<String> {
    if !options.declaration {
        return None;
    }
    let dts_of = |path: &str| OutputPaths::for_source(path, options).map(|outputs| outputs.dts);
    propagation
        .signature_changed()
        .filter_map(|id| program.file(id))
        .filter_map(|file| dts_of(&file.path))
        .last()
        .or_else(|| {
            let carried = previous?.latest_changed_dts_file.as_deref()?;
            program
                .files()
                .iter()
                .any(|file| dts_of(&file.path).as_deref() == Some(carried))
                .then(|| carried.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::propagate::CHECKER_FAULT;
    use crate::testing::{FakeChecker, FakeEmitter};

    struct Env {
        fs: MemoryFs,
        checker: FakeChecker,
        emitter: FakeEmitter,
        options: CompilerOptions,
        roots: Vec<String>,
        info: Option<Vec<u8>>,
    }

    impl Env {
        fn new(files: &[(&str, &str)], roots: &[&str]) -> Self {
            Self {
                fs: MemoryFs::with_files(files.iter().copied()),
                checker: FakeChecker::new(),
                emitter: FakeEmitter::new(),
                options: CompilerOptions {
                    declaration: true,
                    ..CompilerOptions::default()
                },
                roots: roots.iter().map(|r| r.to_string()).collect(),
                info: None,
            }
        }

        fn build(&mut self) -> CompletedBuild {
            let host = BuildHost::new(&self.fs, &self.checker, &self.emitter);
            let plan = plan_build(&host, &self.roots, &self.options, self.info.as_deref()).unwrap();
            let done = plan.execute(&host).unwrap();
            self.info = Some(BuildInfoCodec::encode(&done.snapshot).unwrap());
            done
        }
    }

    fn reasons(report: &BuildReport) -> Vec<(String, CheckReason)> {
        report
            .checked
            .iter()
            .map(|c| (c.path.clone(), c.reason.clone()))
            .collect()
    }

    #[test]
    fn first_build_checks_and_emits_everything() {
        let mut env = Env::new(
            &[("a.ts", "export a"), ("b.ts", "import ./a\nexport b")],
            &["b.ts"],
        );
        let done = env.build();
        assert_eq!(done.report.snapshot, SnapshotStatus::Missing);
        assert_eq!(done.report.checked_paths(), vec!["b.ts", "a.ts"]);
        assert!(done.report.checked.iter().all(|c| c.reason == CheckReason::FullBuild));
        assert_eq!(done.report.written(), vec!["b.js", "b.d.ts", "a.js", "a.d.ts"]);
        assert_eq!(done.report.latest_changed_dts_file.as_deref(), Some("a.d.ts"));
        assert!(done.snapshot.pending_emit.is_empty());
        assert_eq!(env.fs.get_text("a.js").as_deref(), Some("// js a.ts\nexport a"));
    }

    #[test]
    fn unchanged_rebuild_does_nothing() {
        let mut env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        env.build();
        env.fs.reset_write_count();
        let done = env.build();
        assert_eq!(done.report.snapshot, SnapshotStatus::Reused);
        assert!(done.report.checked.is_empty());
        assert!(done.report.emitted.is_empty());
        assert_eq!(env.fs.write_count(), 0);
    }

    #[test]
    fn corrupt_snapshot_is_a_full_build() {
        let mut env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        env.info = Some(b"{ not json".to_vec());
        let done = env.build();
        assert_eq!(done.report.snapshot, SnapshotStatus::Discarded);
        assert_eq!(reasons(&done.report), vec![("a.ts".to_string(), CheckReason::FullBuild)]);
    }

    #[test]
    fn rechecked_file_with_same_output_is_unchanged() {
        let mut env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        env.build();
        env.fs.set("a.ts", "export a\nlocal");
        let done = env.build();
        assert_eq!(done.report.checked_paths(), vec!["a.ts"]);
        assert_eq!(done.report.written(), vec!["a.js"]);
        assert_eq!(done.report.unchanged(), vec!["a.d.ts"]);
        assert!(done.report.signature_changed.is_empty());
        assert_eq!(done.snapshot.latest_changed_dts_file.as_deref(), Some("a.d.ts"));
    }

    #[test]
    fn removed_dependency_rechecks_dependents() {
        let mut env = Env::new(
            &[("a.ts", "export a"), ("b.ts", "import ./a")],
            &["b.ts"],
        );
        env.build();
        env.fs.delete("a.ts");
        let done = env.build();
        assert_eq!(
            reasons(&done.report),
            vec![("b.ts".to_string(), CheckReason::DependencyRemoved("a.ts".to_string()))]
        );
        assert!(done.snapshot.file_id("a.ts").is_none());
        // The emitted declaration next to the deleted source is not a stand-in.
        assert!(done.snapshot.file_id("a.d.ts").is_none());
        assert!(env.fs.get("a.d.ts").is_some());
        assert_ne!(done.snapshot.latest_changed_dts_file.as_deref(), Some("a.d.ts"));
    }

    #[test]
    fn latest_declaration_of_removed_file_is_dropped() {
        let mut env = Env::new(
            &[("a.ts", "import ./b\nexport a"), ("b.ts", "export b")],
            &["a.ts"],
        );
        let first = env.build();
        assert_eq!(first.snapshot.latest_changed_dts_file.as_deref(), Some("b.d.ts"));
        env.fs.delete("b.ts");
        let done = env.build();
        assert_eq!(done.report.checked_paths(), vec!["a.ts"]);
        assert!(done.report.signature_changed.is_empty());
        assert_eq!(done.snapshot.latest_changed_dts_file, None);
        assert_eq!(done.report.latest_changed_dts_file, None);
    }

    #[test]
    fn new_resolution_rechecks_importer() {
        let mut env = Env::new(
            &[("a.d.ts", "export a"), ("b.ts", "import ./a")],
            &["b.ts", "a.d.ts"],
        );
        env.build();
        // `./a` now resolves to the source file instead of the declaration.
        env.fs.set("a.ts", "export a");
        let done = env.build();
        let reasons = reasons(&done.report);
        assert!(reasons.contains(&("b.ts".to_string(), CheckReason::ReferencesChanged)));
        assert!(reasons.contains(&("a.ts".to_string(), CheckReason::Added)));
    }

    #[test]
    fn global_change_rechecks_everything() {
        let mut env = Env::new(
            &[
                ("a.ts", "export a\nref globals.d.ts"),
                ("b.ts", "export b"),
                ("globals.d.ts", "global"),
            ],
            &["a.ts", "b.ts"],
        );
        env.build();
        env.fs.set("globals.d.ts", "global\nexport more");
        let done = env.build();
        assert_eq!(done.report.checked.len(), 3);
        assert!(done
            .report
            .checked
            .iter()
            .all(|c| c.reason == CheckReason::GlobalScopeChanged("globals.d.ts".to_string())));
    }

    #[test]
    fn semantic_option_change_rechecks_everything() {
        let mut env = Env::new(&[("a.ts", "export a"), ("b.ts", "export b")], &["a.ts", "b.ts"]);
        env.build();
        env.options.strict = true;
        let done = env.build();
        assert_eq!(done.report.checked.len(), 2);
        assert!(done.report.checked.iter().all(|c| c.reason == CheckReason::OptionsChanged));
        assert!(done.report.written().is_empty());
    }

    #[test]
    fn diagnostics_are_replayed_for_skipped_files() {
        let mut env = Env::new(
            &[("a.ts", "error bad thing"), ("b.ts", "export b")],
            &["a.ts", "b.ts"],
        );
        let first = env.build();
        assert!(first.report.has_errors());
        env.fs.set("b.ts", "export b2");
        let second = env.build();
        assert_eq!(second.report.checked_paths(), vec!["b.ts"]);
        assert_eq!(second.report.diagnostics, first.report.diagnostics);
        assert!(second.snapshot.errors);
    }

    #[test]
    fn failed_write_stays_pending_and_is_retried() {
        let mut env = Env::new(&[("a.ts", "export a"), ("b.ts", "export b")], &["a.ts", "b.ts"]);
        env.fs.fail_writes_to("a.js");
        let first = env.build();
        assert_eq!(first.report.failed(), vec!["a.js"]);
        assert_eq!(first.report.written(), vec!["a.d.ts", "b.js", "b.d.ts"]);
        assert_eq!(first.report.diagnostics[0].code, WRITE_FAILED);
        assert_eq!(first.snapshot.pending_emit_of("a.ts"), EmitKind::JS);

        env.fs.clear_failures();
        let second = env.build();
        assert!(second.report.checked.is_empty());
        assert_eq!(second.report.written(), vec!["a.js"]);
        assert!(second.snapshot.pending_emit.is_empty());
        assert!(!second.report.has_errors());
    }

    #[test]
    fn emitter_fault_is_reported_per_artifact() {
        let mut env = Env::new(&[("a.ts", "export a"), ("b.ts", "export b")], &["a.ts", "b.ts"]);
        env.emitter.fail_on("a.ts");
        let done = env.build();
        assert_eq!(done.report.failed(), vec!["a.js", "a.d.ts"]);
        assert_eq!(done.report.written(), vec!["b.js", "b.d.ts"]);
        assert!(done.report.diagnostics.iter().all(|d| d.code == EMIT_FAULT));
        assert_eq!(done.snapshot.pending_emit_of("a.ts"), EmitKind::JS | EmitKind::DTS);
    }

    #[test]
    fn checker_fault_is_rechecked_next_build() {
        let mut env = Env::new(&[("a.ts", "export a\nfault")], &["a.ts"]);
        let first = env.build();
        assert_eq!(first.report.diagnostics[0].code, CHECKER_FAULT);
        assert_eq!(first.snapshot.pending_check.len(), 1);

        let second = env.build();
        assert_eq!(
            reasons(&second.report),
            vec![("a.ts".to_string(), CheckReason::PreviouslyErrored)]
        );
    }

    #[test]
    fn no_emit_defers_until_enabled() {
        let mut env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        env.options.no_emit = true;
        let first = env.build();
        assert!(first.report.emitted.is_empty());
        assert_eq!(first.snapshot.pending_emit_of("a.ts"), EmitKind::JS | EmitKind::DTS);

        env.options.no_emit = false;
        let second = env.build();
        assert!(second.report.checked.is_empty());
        assert_eq!(second.report.written(), vec!["a.js", "a.d.ts"]);
    }

    #[test]
    fn source_map_flip_rewrites_js_family_only() {
        let mut env = Env::new(&[("a.ts", "export a"), ("b.ts", "export b")], &["a.ts", "b.ts"]);
        env.build();
        env.options.source_map = true;
        let done = env.build();
        assert!(done.report.checked.is_empty());
        assert_eq!(done.report.written(), vec!["a.js.map", "b.js.map"]);
        assert_eq!(done.report.unchanged(), vec!["a.js", "b.js"]);
        assert!(done
            .report
            .emitted
            .iter()
            .all(|e| !e.output.ends_with(".d.ts")));
    }

    #[test]
    fn dry_run_reports_plan_without_writing() {
        let env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        let host = BuildHost::new(&env.fs, &env.checker, &env.emitter);
        let plan = plan_build(&host, &env.roots, &env.options, None).unwrap();
        assert_eq!(plan.actions().len(), 2);
        let report = plan.into_dry_run();
        assert!(report.emitted.iter().all(|e| e.outcome == WriteOutcome::Planned));
        assert_eq!(env.fs.write_count(), 0);
    }

    #[test]
    fn cancelled_planning_fails() {
        let env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let host = BuildHost::new(&env.fs, &env.checker, &env.emitter).with_cancellation(cancel);
        let result = plan_build(&host, &env.roots, &env.options, None);
        assert!(matches!(result, Err(BuildError::Cancelled)));
    }

    #[test]
    fn cancelled_execution_keeps_everything_pending() {
        let env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        let cancel = CancellationToken::new();
        let host = BuildHost::new(&env.fs, &env.checker, &env.emitter)
            .with_cancellation(cancel.clone());
        let plan = plan_build(&host, &env.roots, &env.options, None).unwrap();
        let planned = plan.snapshot().pending_emit.clone();
        cancel.cancel();
        assert!(matches!(plan.execute(&host), Err(BuildError::Cancelled)));
        assert!(!planned.is_empty());
        assert_eq!(env.fs.write_count(), 0);
    }

    #[test]
    fn unknown_fields_survive_a_rebuild() {
        let mut env = Env::new(&[("a.ts", "export a")], &["a.ts"]);
        env.build();
        let mut doc: serde_json::Value =
            serde_json::from_slice(env.info.as_deref().unwrap()).unwrap();
        doc["futureField"] = serde_json::json!([1, 2]);
        env.info = Some(serde_json::to_vec(&doc).unwrap());
        env.fs.set("a.ts", "export a2");
        let done = env.build();
        assert_eq!(
            done.snapshot.unknown_fields.get("futureField"),
            Some(&serde_json::json!([1, 2]))
        );
    }
}
