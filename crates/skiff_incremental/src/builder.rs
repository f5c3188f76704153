//! Build, status and clean for a resolved project.

use std::collections::BTreeSet;
use std::path::PathBuf;

use skiff_config::ResolvedProject;

use crate::classify::ChangeClassifier;
use crate::codec::BuildInfoCodec;
use crate::driver::{plan_build, BuildHost, CompletedBuild};
use crate::emit_kind::EmitKind;
use crate::error::BuildError;
use crate::file_id::FileId;
use crate::lock::BuildLock;
use crate::outputs::OutputPaths;
use crate::program::Program;
use crate::report::{BuildReport, CleanReport, SnapshotStatus, StatusReport};
use crate::snapshot::BuildSnapshot;
use crate::version::{FileRecord, FileVersionStore};

/// Per-invocation build switches.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildFlags {
    /// Ignore the previous build info.
    pub force: bool,
    /// Plan and report without writing anything.
    pub dry_run: bool,
}

/// Runs builds against one set of collaborators.
pub struct Builder<'a> {
    host: BuildHost<'a>,
    lock_path: Option<PathBuf>,
}

impl<'a> Builder<'a> {
    /// Creates a builder without a cross-process lock.
    pub fn new(host: BuildHost<'a>) -> Self {
        Self {
            host,
            lock_path: None,
        }
    }

    /// Holds an exclusive lock on `path` for the duration of each build or clean.
    pub fn with_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// The collaborators builds run against.
    pub fn host(&self) -> &BuildHost<'a> {
        &self.host
    }

    fn lock(&self) -> Result<Option<BuildLock>, BuildError> {
        self.lock_path.as_deref().map(BuildLock::acquire).transpose()
    }

    fn read_build_info(&self, project: &ResolvedProject) -> Option<Vec<u8>> {
        self.host.fs.read_file(&project.build_info_path).ok()
    }

    fn load_program(&self, project: &ResolvedProject, previous: Option<&BuildSnapshot>) -> Program {
        let outputs = previous
            .map(|p| p.emitted_outputs(&project.options))
            .unwrap_or_default();
        Program::load_excluding(self.host.fs, self.host.checker, &project.root_files, &outputs)
    }

    /// Builds the project.
    ///
    /// The build info is rewritten only when its bytes change, so a rebuild
    /// with nothing to do writes no file at all. A build cancelled during the
    /// write phase returns [`BuildError::Cancelled`] and leaves the build info
    /// untouched, so the next build redoes the unfinished work.
    pub fn build(&self, project: &ResolvedProject, flags: BuildFlags) -> Result<BuildReport, BuildError> {
        let _lock = self.lock()?;
        let existing = self.read_build_info(project);
        let reuse = !flags.force && project.options.incremental;

        let mut plan = plan_build(
            &self.host,
            &project.root_files,
            &project.options,
            existing.as_deref().filter(|_| reuse),
        )?;
        if !reuse && existing.is_some() {
            plan.report.snapshot = SnapshotStatus::Ignored;
        }
        if flags.dry_run {
            return Ok(plan.into_dry_run());
        }

        let CompletedBuild {
            mut report,
            snapshot,
            cancelled,
        } = plan.execute(&self.host)?;
        if cancelled {
            return Err(BuildError::Cancelled);
        }

        if project.options.incremental {
            let bytes = BuildInfoCodec::encode(&snapshot)?;
            if existing.as_deref() != Some(bytes.as_slice()) {
                self.host
                    .fs
                    .write_file(&project.build_info_path, &bytes)
                    .map_err(|source| BuildError::Io {
                        path: project.build_info_path.clone(),
                        source,
                    })?;
                report.build_info_written = true;
            }
        }

        tracing::info!(
            target: "skiff.incremental",
            project = %project.name,
            checked = report.checked.len(),
            written = report.written().len(),
            unchanged = report.unchanged().len(),
            failed = report.failed().len(),
            build_info_written = report.build_info_written,
            "build finished"
        );
        Ok(report)
    }

    /// Compares the project against its build info without checking anything.
    pub fn status(&self, project: &ResolvedProject) -> Result<StatusReport, BuildError> {
        let (previous, snapshot) = match self.read_build_info(project) {
            None => (None, SnapshotStatus::Missing),
            Some(bytes) => match BuildInfoCodec::decode(&bytes) {
                Some(previous) => (Some(previous), SnapshotStatus::Reused),
                None => (None, SnapshotStatus::Discarded),
            },
        };

        let program = self.load_program(project, previous.as_ref());
        let mut versions = FileVersionStore::new();
        for file in program.files() {
            let mut record = FileRecord::new(file.version);
            record.affects_global_scope = file.scan.affects_global_scope;
            versions.insert(file.path.clone(), record);
        }
        let changes = ChangeClassifier::classify(previous.as_ref(), &versions, &project.options);

        let (pending_emit, pending_check) = match &previous {
            Some(previous) => pending_paths(previous),
            None => (Vec::new(), Vec::new()),
        };
        Ok(StatusReport {
            snapshot,
            changed: changes.changed,
            added: changes.added,
            removed: changes.removed,
            options_changed: changes.previous_available && !changes.options.is_empty(),
            pending_emit,
            pending_check,
        })
    }

    /// Removes every output the current options produce, then the build info.
    ///
    /// Sources are taken from the program and from the build info, so outputs
    /// of files that have since left the program are removed too.
    pub fn clean(&self, project: &ResolvedProject) -> Result<CleanReport, BuildError> {
        let _lock = self.lock()?;
        let previous = self
            .read_build_info(project)
            .and_then(|bytes| BuildInfoCodec::decode(&bytes));
        let program = self.load_program(project, previous.as_ref());

        let mut sources: BTreeSet<String> = program.files().iter().map(|f| f.path.clone()).collect();
        if let Some(previous) = &previous {
            sources.extend(previous.paths().map(str::to_string));
        }

        let artifacts: Vec<_> = EmitKind::requested_by(&project.options).artifacts().collect();
        let mut report = CleanReport::default();
        for source in &sources {
            let Some(outputs) = OutputPaths::for_source(source, &project.options) else {
                continue;
            };
            for artifact in &artifacts {
                self.remove(outputs.get(*artifact), &mut report)?;
            }
        }
        self.remove(&project.build_info_path, &mut report)?;
        tracing::info!(
            target: "skiff.incremental",
            project = %project.name,
            removed = report.removed.len(),
            "clean finished"
        );
        Ok(report)
    }

    fn remove(&self, path: &str, report: &mut CleanReport) -> Result<(), BuildError> {
        if !self.host.fs.exists(path) {
            return Ok(());
        }
        self.host
            .fs
            .remove_file(path)
            .map_err(|source| BuildError::Io {
                path: path.to_string(),
                source,
            })?;
        report.removed.push(path.to_string());
        Ok(())
    }
}

fn pending_paths(snapshot: &BuildSnapshot) -> (Vec<String>, Vec<String>) {
    let path = |id: &FileId| snapshot.files.try_path(*id).map(str::to_string);
    (
        snapshot.pending_emit.keys().filter_map(path).collect(),
        snapshot.pending_check.iter().filter_map(path).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::fs::MemoryFs;
    use crate::host::{CheckerFault, EmitRequest, Emitter};
    use crate::report::WriteOutcome;
    use crate::testing::{FakeChecker, FakeEmitter};
    use skiff_config::CompilerOptions;

    const INFO: &str = ".skiff/build-info.json";

    fn project(options: CompilerOptions) -> ResolvedProject {
        ResolvedProject {
            name: "app".to_string(),
            root_files: vec!["main.ts".to_string()],
            options,
            build_info_path: INFO.to_string(),
        }
    }

    fn declarations() -> CompilerOptions {
        CompilerOptions {
            declaration: true,
            ..CompilerOptions::default()
        }
    }

    fn files() -> MemoryFs {
        MemoryFs::with_files([
            ("main.ts", "import ./util\nexport main"),
            ("util.ts", "export util = 1"),
        ])
    }

    #[test]
    fn rebuild_without_changes_writes_nothing() {
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        let project = project(declarations());

        let first = builder.build(&project, BuildFlags::default()).unwrap();
        assert!(first.build_info_written);
        assert_eq!(first.written().len(), 4);
        assert!(fs.get(INFO).is_some());

        fs.reset_write_count();
        let second = builder.build(&project, BuildFlags::default()).unwrap();
        assert!(second.is_noop());
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn force_rechecks_but_keeps_identical_outputs() {
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        let project = project(declarations());
        builder.build(&project, BuildFlags::default()).unwrap();
        fs.reset_write_count();

        let forced = BuildFlags {
            force: true,
            ..BuildFlags::default()
        };
        let report = builder.build(&project, forced).unwrap();
        assert_eq!(report.snapshot, SnapshotStatus::Ignored);
        assert_eq!(report.checked.len(), 2);
        assert_eq!(report.unchanged().len(), 4);
        assert!(!report.build_info_written);
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        let dry = BuildFlags {
            dry_run: true,
            ..BuildFlags::default()
        };
        let report = builder.build(&project(declarations()), dry).unwrap();
        assert_eq!(report.emitted.len(), 4);
        assert!(report.emitted.iter().all(|e| e.outcome == WriteOutcome::Planned));
        assert_eq!(fs.write_count(), 0);
        assert!(fs.get(INFO).is_none());
    }

    #[test]
    fn non_incremental_builds_never_persist() {
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        let project = project(CompilerOptions {
            incremental: false,
            ..CompilerOptions::default()
        });
        builder.build(&project, BuildFlags::default()).unwrap();
        let second = builder.build(&project, BuildFlags::default()).unwrap();
        assert_eq!(second.snapshot, SnapshotStatus::Missing);
        assert_eq!(second.checked.len(), 2);
        assert!(fs.get(INFO).is_none());
    }

    #[test]
    fn status_tracks_changes() {
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        let project = project(declarations());

        let status = builder.status(&project).unwrap();
        assert_eq!(status.snapshot, SnapshotStatus::Missing);
        assert!(!status.is_up_to_date());

        builder.build(&project, BuildFlags::default()).unwrap();
        checker.take_checked();
        assert!(builder.status(&project).unwrap().is_up_to_date());

        fs.set("util.ts", "export util = 2");
        let status = builder.status(&project).unwrap();
        assert_eq!(status.changed, vec!["util.ts"]);
        assert!(!status.is_up_to_date());
        assert!(checker.take_checked().is_empty());
    }

    #[test]
    fn status_reports_option_changes() {
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        builder.build(&project(declarations()), BuildFlags::default()).unwrap();

        let status = builder
            .status(&project(CompilerOptions {
                declaration: true,
                source_map: true,
                ..CompilerOptions::default()
            }))
            .unwrap();
        assert!(status.options_changed);
    }

    #[test]
    fn clean_removes_outputs_and_build_info() {
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        let project = project(declarations());
        builder.build(&project, BuildFlags::default()).unwrap();

        let report = builder.clean(&project).unwrap();
        assert_eq!(
            report.removed,
            vec!["main.js", "main.d.ts", "util.js", "util.d.ts", INFO]
        );
        assert_eq!(fs.paths(), vec!["main.ts", "util.ts"]);
        assert!(builder.clean(&project).unwrap().removed.is_empty());
    }

    #[test]
    fn lock_is_taken_for_builds() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join(".skiff").join("build-info.json.lock");
        let fs = files();
        let (checker, emitter) = (FakeChecker::new(), FakeEmitter::new());
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter)).with_lock(&lock);
        builder.build(&project(declarations()), BuildFlags::default()).unwrap();
        builder.build(&project(declarations()), BuildFlags::default()).unwrap();
        assert!(lock.exists());
    }

    /// Cancels the build the first time it is asked for output.
    struct CancellingEmitter {
        inner: FakeEmitter,
        cancel: CancellationToken,
    }

    impl Emitter for CancellingEmitter {
        fn emit(&self, request: &EmitRequest<'_>) -> Result<String, CheckerFault> {
            self.cancel.cancel();
            self.inner.emit(request)
        }
    }

    #[test]
    fn cancelled_emit_leaves_build_info_untouched() {
        let fs = files();
        let checker = FakeChecker::new();
        let project = project(declarations());
        let emitter = FakeEmitter::new();
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        builder.build(&project, BuildFlags::default()).unwrap();
        let before = fs.get(INFO).unwrap();

        fs.set("util.ts", "export util = 2");
        fs.set("main.ts", "import ./util\nexport main = 2");
        let cancel = CancellationToken::new();
        let emitter = CancellingEmitter {
            inner: FakeEmitter::new(),
            cancel: cancel.clone(),
        };
        let builder =
            Builder::new(BuildHost::new(&fs, &checker, &emitter).with_cancellation(cancel));
        let result = builder.build(&project, BuildFlags::default());
        assert!(matches!(result, Err(BuildError::Cancelled)));
        assert_eq!(fs.get(INFO), Some(before));

        checker.take_checked();
        let emitter = FakeEmitter::new();
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter));
        let report = builder.build(&project, BuildFlags::default()).unwrap();
        let mut checked = checker.take_checked();
        checked.sort();
        assert_eq!(checked, vec!["main.ts", "util.ts"]);
        assert!(report.build_info_written);
        assert_eq!(fs.get_text("util.js").as_deref(), Some("// js util.ts\nexport util = 2"));
        assert!(fs.get_text("main.js").unwrap().contains("export main = 2"));
    }
}
