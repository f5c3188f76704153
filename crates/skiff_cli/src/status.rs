//! `skiff status`: compare the project against its build info.

use skiff_incremental::{SnapshotStatus, StatusReport};

use crate::project::load_project;
use crate::GlobalArgs;

/// Runs the `skiff status` command.
///
/// Returns exit code 0 when a build would have nothing to do, 1 otherwise.
/// Nothing is checked or written.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let report = project.with_builder(|builder| builder.status(&project.resolved))?;
    if report.is_up_to_date() {
        if !global.quiet {
            eprintln!("   Up to date: {}", project.resolved.name);
        }
        return Ok(0);
    }
    for line in status_lines(&report) {
        println!("{line}");
    }
    Ok(1)
}

fn status_lines(report: &StatusReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.snapshot != SnapshotStatus::Reused {
        lines.push(format!("build info {}", report.snapshot));
    }
    if report.options_changed {
        lines.push("compiler options changed".to_string());
    }
    let groups = [
        ("changed", &report.changed),
        ("added", &report.added),
        ("removed", &report.removed),
        ("pending emit", &report.pending_emit),
        ("pending check", &report.pending_check),
    ];
    for (label, paths) in groups {
        lines.extend(paths.iter().map(|path| format!("{label}: {path}")));
    }
    lines
}
