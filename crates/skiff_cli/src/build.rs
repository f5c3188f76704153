//! `skiff build`: incremental check and emit.
//!
//! Loads the previous build info, rechecks the files affected by what
//! changed, writes the outputs whose content differs and persists the new
//! build info. `--dry` stops after planning.

use skiff_incremental::{BuildFlags, BuildReport, Deferral, WriteOutcome};

use crate::project::{load_project, render_diagnostics};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `skiff build` command.
///
/// Returns exit code 0 when the program has no errors, 1 otherwise.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    if !global.quiet {
        eprintln!(
            "   Building {} ({} root files)",
            project.resolved.name,
            project.resolved.root_files.len()
        );
    }

    let flags = BuildFlags {
        force: args.force,
        dry_run: args.dry,
    };
    let report = project.with_builder(|builder| builder.build(&project.resolved, flags))?;

    if args.explain && !global.quiet {
        for line in explain_lines(&report) {
            eprintln!("{line}");
        }
    }
    if args.dry {
        for line in plan_lines(&report) {
            println!("{line}");
        }
    }

    let errors = render_diagnostics(&report.diagnostics, args.format, global.color);
    if !global.quiet {
        eprintln!("{}", summary(&report, args.dry));
    }
    Ok(if errors > 0 { 1 } else { 0 })
}

/// One line per checked file with the reason it was checked.
fn explain_lines(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!("    Snapshot {}", report.snapshot)];
    for record in &report.checked {
        let mut line = format!("     Checked {}: {}", record.path, record.reason);
        if record.errored {
            line.push_str(" [checker failed]");
        } else if record.signature_changed {
            line.push_str(" [signature changed]");
        }
        lines.push(line);
    }
    lines
}

/// The planned artifacts of a dry run.
fn plan_lines(report: &BuildReport) -> Vec<String> {
    report
        .emitted
        .iter()
        .map(|record| format!("emit {} {} -> {}", record.artifact, record.source, record.output))
        .collect()
}

fn summary(report: &BuildReport, dry: bool) -> String {
    if report.is_noop() {
        return "    Finished: up to date".to_string();
    }
    let count = |outcome: WriteOutcome| report.emitted.iter().filter(|r| r.outcome == outcome).count();
    let mut line = if dry {
        format!(
            "    Planned: {} to check, {} outputs",
            report.checked.len(),
            count(WriteOutcome::Planned)
        )
    } else {
        format!(
            "    Finished: {} checked, {} written, {} unchanged",
            report.checked.len(),
            count(WriteOutcome::Created) + count(WriteOutcome::Written),
            count(WriteOutcome::Unchanged)
        )
    };
    let failed = count(WriteOutcome::Failed);
    if failed > 0 {
        line.push_str(&format!(", {failed} failed"));
    }
    match report.deferred {
        Some(Deferral::NoEmit) => line.push_str(" (emit disabled by no_emit)"),
        Some(Deferral::Errors) => line.push_str(" (emit withheld: program has errors)"),
        None => {}
    }
    line
}
