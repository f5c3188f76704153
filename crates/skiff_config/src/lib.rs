//! Parsing and validation of `skiff.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`], then resolves it (normalized root files, command-line
//! overrides, build-info location) into a [`ResolvedProject`] ready for a build.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{find_project_root, load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_project, OptionOverrides, ResolvedProject};
pub use types::*;
