//! Project resolution: merging `skiff.toml` with command-line overrides.

use crate::error::ConfigError;
use crate::loader::validate_options;
use crate::types::{CompilerOptions, ProjectConfig};
use skiff_common::normalize_path;

/// Command-line flags that take precedence over `[compiler_options]`.
#[derive(Debug, Default, Clone)]
pub struct OptionOverrides {
    /// Overrides `declaration`.
    pub declaration: Option<bool>,
    /// Overrides `source_map`.
    pub source_map: Option<bool>,
    /// Overrides `no_emit`.
    pub no_emit: Option<bool>,
    /// Overrides `incremental`.
    pub incremental: Option<bool>,
}

/// A project ready to build: normalized root files and final options.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    /// The project name.
    pub name: String,
    /// Normalized, deduplicated root files in configuration order.
    pub root_files: Vec<String>,
    /// Options after applying overrides.
    pub options: CompilerOptions,
    /// Normalized build-info location.
    pub build_info_path: String,
}

/// Resolves a configuration by normalizing root paths and overlaying CLI flags.
///
/// Overrides are applied on top of the file settings and the result is
/// validated again, so `--source-map` on a project that uses
/// `inline_source_map` is rejected rather than silently producing both.
pub fn resolve_project(
    config: &ProjectConfig,
    overrides: &OptionOverrides,
) -> Result<ResolvedProject, ConfigError> {
    let mut options = config.compiler_options.clone();
    if let Some(v) = overrides.declaration {
        options.declaration = v;
    }
    if let Some(v) = overrides.source_map {
        options.source_map = v;
    }
    if let Some(v) = overrides.no_emit {
        options.no_emit = v;
    }
    if let Some(v) = overrides.incremental {
        options.incremental = v;
    }
    options.out_dir = options.out_dir.as_deref().map(normalize_path);
    options.root_dir = options.root_dir.as_deref().map(normalize_path);
    validate_options(&options)?;

    let mut root_files: Vec<String> = Vec::with_capacity(config.project.files.len());
    for file in &config.project.files {
        let normalized = normalize_path(file);
        if normalized.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "root file '{file}' is not a file path"
            )));
        }
        if !root_files.contains(&normalized) {
            root_files.push(normalized);
        }
    }

    let build_info_path = normalize_path(options.build_info_path());

    Ok(ResolvedProject {
        name: config.project.name.clone(),
        root_files,
        options,
        build_info_path,
    })
}
