//! Shared helpers for CLI commands: locating and loading the project,
//! wiring the builder to the host filesystem, and rendering diagnostics.

use std::path::{Path, PathBuf};

use skiff_check::{SkiffChecker, SkiffEmitter};
use skiff_config::{find_project_root, load_config_from_str, resolve_project, ResolvedProject, CONFIG_FILE};
use skiff_diagnostics::{Diagnostic, DiagnosticRenderer, JsonRenderer, TerminalRenderer};
use skiff_incremental::{BuildError, BuildHost, Builder, RealFs};

use crate::{GlobalArgs, ReportFormat};

/// A loaded project and the directory it lives in.
#[derive(Debug)]
pub struct Project {
    /// Directory containing `skiff.toml`; project paths are relative to it.
    pub root: PathBuf,
    /// Configuration after command-line overrides.
    pub resolved: ResolvedProject,
}

impl Project {
    /// Host path of the cross-process lock guarding the build info.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(format!("{}.lock", self.resolved.build_info_path))
    }

    /// Runs `f` with a builder over the host filesystem and the Skiff front end.
    pub fn with_builder<T>(
        &self,
        f: impl FnOnce(&Builder<'_>) -> Result<T, BuildError>,
    ) -> Result<T, BuildError> {
        let fs = RealFs::new(&self.root);
        let checker = SkiffChecker;
        let emitter = SkiffEmitter;
        let builder = Builder::new(BuildHost::new(&fs, &checker, &emitter)).with_lock(self.lock_path());
        f(&builder)
    }
}

/// Resolves the project directory and configuration file from global CLI args.
///
/// `--config` may name the file itself or its directory. Without it, the
/// nearest `skiff.toml` at or above the current directory is used.
pub fn locate_config(global: &GlobalArgs) -> Result<(PathBuf, PathBuf), Box<dyn std::error::Error>> {
    match &global.config {
        Some(config_path) => {
            let path = PathBuf::from(config_path);
            if path.is_dir() {
                let file = path.join(CONFIG_FILE);
                Ok((path, file))
            } else {
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                Ok((dir, path))
            }
        }
        None => {
            let root = find_project_root(&std::env::current_dir()?)?;
            let file = root.join(CONFIG_FILE);
            Ok((root, file))
        }
    }
}

/// Loads, validates and resolves the project selected by `global`.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let (root, file) = locate_config(global)?;
    tracing::debug!(target: "skiff.cli", config = %file.display(), "loading project");
    let text = std::fs::read_to_string(&file)
        .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let config = load_config_from_str(&text)?;
    let resolved = resolve_project(&config, &global.overrides)?;
    Ok(Project { root, resolved })
}

/// Renders diagnostics: text to stderr, JSON lines to stdout.
///
/// Returns the number of errors among them.
pub fn render_diagnostics(diagnostics: &[Diagnostic], format: ReportFormat, color: bool) -> usize {
    match format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(color);
            for diag in diagnostics {
                eprint!("{}", renderer.render(diag));
            }
        }
        ReportFormat::Json => {
            for diag in diagnostics {
                println!("{}", JsonRenderer.render(diag));
            }
        }
    }
    diagnostics.iter().filter(|d| d.severity.is_error()).count()
}

/// Displays a host path relative to the project for messages.
pub fn display_path(root: &Path, path: &str) -> String {
    root.join(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_config::OptionOverrides;
    use std::fs;
    use tempfile::TempDir;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
            overrides: OptionOverrides::default(),
        }
    }

    const CONFIG: &str = "[project]\nname = \"app\"\nfiles = [\"src/main.ts\"]\n";

    #[test]
    fn locate_config_from_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("skiff.toml");
        fs::write(&config_path, CONFIG).unwrap();

        let (root, file) = locate_config(&global(Some(config_path.to_str().unwrap().to_string()))).unwrap();
        assert_eq!(root, tmp.path());
        assert_eq!(file, config_path);
    }

    #[test]
    fn locate_config_from_dir() {
        let tmp = TempDir::new().unwrap();
        let (root, file) = locate_config(&global(Some(tmp.path().to_str().unwrap().to_string()))).unwrap();
        assert_eq!(root, tmp.path());
        assert_eq!(file, tmp.path().join("skiff.toml"));
    }

    #[test]
    fn load_project_applies_overrides() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("skiff.toml"), CONFIG).unwrap();
        let mut args = global(Some(tmp.path().to_str().unwrap().to_string()));
        args.overrides.declaration = Some(true);

        let project = load_project(&args).unwrap();
        assert_eq!(project.resolved.name, "app");
        assert_eq!(project.resolved.root_files, ["src/main.ts"]);
        assert!(project.resolved.options.declaration);
        assert!(project.lock_path().starts_with(tmp.path()));
        assert!(project.lock_path().to_str().unwrap().ends_with(".lock"));
    }

    #[test]
    fn load_project_reports_missing_config() {
        let tmp = TempDir::new().unwrap();
        let args = global(Some(tmp.path().to_str().unwrap().to_string()));
        let err = load_project(&args).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
