//! `skiff clean`: remove outputs and the build info.

use crate::project::{display_path, load_project};
use crate::GlobalArgs;

/// Runs the `skiff clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let report = project.with_builder(|builder| builder.clean(&project.resolved))?;
    if !global.quiet {
        for path in &report.removed {
            eprintln!("     Removed {}", display_path(&project.root, path));
        }
        eprintln!("    Cleaned {} ({} files)", project.resolved.name, report.removed.len());
    }
    Ok(0)
}
