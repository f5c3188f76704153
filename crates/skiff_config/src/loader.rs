//! Configuration file discovery, loading, and validation.

use crate::error::ConfigError;
use crate::types::{CompilerOptions, ProjectConfig};
use std::path::{Path, PathBuf};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "skiff.toml";

/// Walks up from `start` looking for the nearest directory containing `skiff.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotFound(start.display().to_string()));
        }
    }
}

/// Loads and validates `skiff.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `skiff.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.files.is_empty() {
        return Err(ConfigError::MissingField("project.files".to_string()));
    }
    validate_options(&config.compiler_options)
}

/// Rejects option combinations that cannot produce a consistent emit.
pub(crate) fn validate_options(options: &CompilerOptions) -> Result<(), ConfigError> {
    if options.source_map && options.inline_source_map {
        return Err(ConfigError::ValidationError(
            "'source_map' cannot be combined with 'inline_source_map'".to_string(),
        ));
    }
    if options.emit_declaration_only && !options.declaration {
        return Err(ConfigError::ValidationError(
            "'emit_declaration_only' requires 'declaration'".to_string(),
        ));
    }
    if options.declaration_map && !options.declaration {
        return Err(ConfigError::ValidationError(
            "'declaration_map' requires 'declaration'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModuleKind, Target};

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "app"
files = "src/main.ts"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "app");
        assert_eq!(config.project.files, vec!["src/main.ts"]);
        assert!(config.compiler_options.incremental);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "app"
version = "1.2.0"
files = ["src/a.ts", "src/b.ts"]

[compiler_options]
out_dir = "out"
root_dir = "src"
declaration = true
declaration_map = true
source_map = true
strict = true
target = "esnext"
module = "commonjs"
build_info_file = "out/app.buildinfo.json"
"#;
        let config = load_config_from_str(toml).unwrap();
        let opts = &config.compiler_options;
        assert_eq!(config.project.files.len(), 2);
        assert_eq!(opts.out_dir.as_deref(), Some("out"));
        assert!(opts.declaration && opts.declaration_map && opts.source_map && opts.strict);
        assert_eq!(opts.target, Target::EsNext);
        assert_eq!(opts.module, ModuleKind::CommonJs);
        assert_eq!(opts.build_info_path(), "out/app.buildinfo.json");
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
files = ["a.ts"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_files_errors() {
        let toml = r#"
[project]
name = "app"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "project.files"));
    }

    #[test]
    fn conflicting_source_maps_error() {
        let toml = r#"
[project]
name = "app"
files = ["a.ts"]

[compiler_options]
source_map = true
inline_source_map = true
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn declaration_only_requires_declaration() {
        let toml = r#"
[project]
name = "app"
files = ["a.ts"]

[compiler_options]
emit_declaration_only = true
"#;
        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_target_is_parse_error() {
        let toml = r#"
[project]
name = "app"
files = ["a.ts"]

[compiler_options]
target = "es3"
"#;
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ParseError(_)
        ));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn find_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"x\"\n").unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn find_root_fails_without_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_project_root(dir.path()),
            Err(ConfigError::NotFound(_))
        ));
    }
}
