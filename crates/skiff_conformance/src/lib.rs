//! Conformance test helpers for the Skiff incremental build engine.
//!
//! A [`Workspace`] is an in-memory project built with the reference front
//! end. Tests edit sources between builds, then assert on what each build
//! checked and wrote, and compare the outputs against a from-scratch build
//! of the same sources.

#![warn(missing_docs)]

use std::collections::BTreeMap;

use skiff_check::{SkiffChecker, SkiffEmitter};
use skiff_config::{load_config_from_str, resolve_project, CompilerOptions, OptionOverrides, ResolvedProject};
use skiff_diagnostics::Diagnostic;
use skiff_incremental::{
    BuildError, BuildFlags, BuildHost, BuildInfoCodec, BuildReport, BuildSnapshot, Builder,
    CancellationToken, MemoryFs,
};

/// Options used by [`Workspace::new`]: outputs under `out/`, sources under
/// `src/`, declarations on.
pub fn default_options() -> CompilerOptions {
    CompilerOptions {
        out_dir: Some("out".to_string()),
        root_dir: Some("src".to_string()),
        declaration: true,
        ..CompilerOptions::default()
    }
}

/// An in-memory project and its build state.
pub struct Workspace {
    fs: MemoryFs,
    sources: BTreeMap<String, String>,
    project: ResolvedProject,
}

impl Workspace {
    /// Creates a workspace with [`default_options`].
    pub fn new(files: &[(&str, &str)], roots: &[&str]) -> Self {
        Self::with_options(files, roots, default_options())
    }

    /// Creates a workspace with explicit options.
    pub fn with_options(files: &[(&str, &str)], roots: &[&str], options: CompilerOptions) -> Self {
        let build_info_path = options.build_info_path().to_string();
        let project = ResolvedProject {
            name: "conformance".to_string(),
            root_files: roots.iter().map(|r| r.to_string()).collect(),
            options,
            build_info_path,
        };
        Self::from_project(files, project)
    }

    /// Creates a workspace configured by `skiff.toml` text.
    pub fn from_toml(files: &[(&str, &str)], config: &str) -> Self {
        let config = load_config_from_str(config).expect("valid configuration");
        let project =
            resolve_project(&config, &OptionOverrides::default()).expect("resolvable configuration");
        Self::from_project(files, project)
    }

    fn from_project(files: &[(&str, &str)], project: ResolvedProject) -> Self {
        let fs = MemoryFs::with_files(files.iter().copied());
        let sources = files
            .iter()
            .map(|(path, text)| (path.to_string(), text.to_string()))
            .collect();
        Self {
            fs,
            sources,
            project,
        }
    }

    /// The in-memory filesystem.
    pub fn fs(&self) -> &MemoryFs {
        &self.fs
    }

    /// The resolved project.
    pub fn project(&self) -> &ResolvedProject {
        &self.project
    }

    /// Changes options for the following builds.
    pub fn options_mut(&mut self) -> &mut CompilerOptions {
        &mut self.project.options
    }

    /// Replaces the root files.
    pub fn set_roots(&mut self, roots: &[&str]) {
        self.project.root_files = roots.iter().map(|r| r.to_string()).collect();
    }

    /// Writes or replaces a source file.
    pub fn write(&mut self, path: &str, text: &str) {
        self.fs.set(path, text);
        self.sources.insert(path.to_string(), text.to_string());
    }

    /// Deletes a source file.
    pub fn remove(&mut self, path: &str) {
        self.fs.delete(path);
        self.sources.remove(path);
    }

    /// Reads any file as text.
    pub fn read(&self, path: &str) -> Option<String> {
        self.fs.get_text(path)
    }

    /// Runs an incremental build, panicking if the build aborts.
    pub fn build(&self) -> BuildReport {
        self.try_build(BuildFlags::default()).expect("build completes")
    }

    /// Runs a build with explicit flags.
    pub fn try_build(&self, flags: BuildFlags) -> Result<BuildReport, BuildError> {
        self.try_build_with(flags, CancellationToken::new())
    }

    /// Runs a build that observes `cancel`.
    pub fn try_build_with(
        &self,
        flags: BuildFlags,
        cancel: CancellationToken,
    ) -> Result<BuildReport, BuildError> {
        let checker = SkiffChecker;
        let emitter = SkiffEmitter;
        let host = BuildHost::new(&self.fs, &checker, &emitter).with_cancellation(cancel);
        Builder::new(host).build(&self.project, flags)
    }

    /// The raw build-info document, if one was written.
    pub fn build_info(&self) -> Option<Vec<u8>> {
        self.fs.get(&self.project.build_info_path)
    }

    /// Replaces the build-info document.
    pub fn set_build_info(&self, bytes: &[u8]) {
        self.fs
            .set(&self.project.build_info_path, &String::from_utf8_lossy(bytes));
    }

    /// The decoded build info, if present and readable.
    pub fn snapshot(&self) -> Option<BuildSnapshot> {
        self.build_info()
            .and_then(|bytes| BuildInfoCodec::decode(&bytes))
    }

    /// Every file that is neither a source nor the build info.
    pub fn outputs(&self) -> BTreeMap<String, String> {
        self.fs
            .paths()
            .into_iter()
            .filter(|path| !self.sources.contains_key(path) && *path != self.project.build_info_path)
            .filter_map(|path| self.fs.get_text(&path).map(|text| (path, text)))
            .collect()
    }

    /// Builds the current sources from nothing in a fresh workspace.
    pub fn clean_rebuild(&self) -> Workspace {
        let files: Vec<(&str, &str)> = self
            .sources
            .iter()
            .map(|(path, text)| (path.as_str(), text.as_str()))
            .collect();
        let fresh = Workspace::from_project(&files, self.project.clone());
        fresh.build();
        fresh
    }

    /// Asserts that the last incremental build left every output and the
    /// persisted file state exactly as a from-scratch build produces them.
    pub fn assert_matches_clean_rebuild(&self) {
        let fresh = self.clean_rebuild();
        let ours = self.outputs();
        for (path, text) in fresh.outputs() {
            assert_eq!(
                ours.get(&path),
                Some(&text),
                "output {path} differs from a clean rebuild"
            );
        }
        let (Some(ours), Some(theirs)) = (self.snapshot(), fresh.snapshot()) else {
            panic!("both builds persist build info");
        };
        assert!(
            ours.equivalent(&theirs),
            "build info differs from a clean rebuild"
        );
    }
}

/// Sorted paths of the files a build checked.
pub fn checked(report: &BuildReport) -> Vec<&str> {
    let mut paths = report.checked_paths();
    paths.sort_unstable();
    paths
}

/// Sorted outputs a build wrote to disk.
pub fn written(report: &BuildReport) -> Vec<&str> {
    let mut paths = report.written();
    paths.sort_unstable();
    paths
}

/// `(path, code)` of every diagnostic, sorted.
pub fn diagnostic_codes(diagnostics: &[Diagnostic]) -> Vec<(String, String)> {
    let mut codes: Vec<(String, String)> = diagnostics
        .iter()
        .map(|d| (d.file().unwrap_or_default().to_string(), d.code.to_string()))
        .collect();
    codes.sort();
    codes
}
