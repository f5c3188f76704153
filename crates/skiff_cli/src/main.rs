//! Skiff CLI: incremental builds of Skiff projects.
//!
//! `skiff build` checks and emits only what changed since the previous build,
//! `skiff clean` removes every output and the build info, and `skiff status`
//! reports whether a build would have anything to do.

#![warn(missing_docs)]

mod build;
mod clean;
mod project;
mod status;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use skiff_config::OptionOverrides;
use tracing_subscriber::EnvFilter;

/// Skiff, an incremental compiler for a small TypeScript-like language.
#[derive(Parser, Debug)]
#[command(name = "skiff", version, about = "Skiff incremental compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `skiff.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Emit declaration files regardless of `declaration`.
    #[arg(long, global = true)]
    pub declaration: bool,

    /// Emit `.js.map` files regardless of `source_map`.
    #[arg(long, global = true)]
    pub source_map: bool,

    /// Check without emitting anything.
    #[arg(long, global = true)]
    pub no_emit: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check and emit what changed since the last build.
    Build(BuildArgs),
    /// Remove build outputs and the build info.
    Clean,
    /// Report whether the project is up to date, without checking.
    Status,
}

/// Arguments for the `skiff build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Ignore the previous build info and rebuild everything.
    #[arg(long)]
    pub force: bool,

    /// Plan the build and print the actions without writing anything.
    #[arg(long)]
    pub dry: bool,

    /// Print why each file was checked.
    #[arg(long)]
    pub explain: bool,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// One JSON object per line.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
    /// Compiler options forced from the command line.
    pub overrides: OptionOverrides,
}

impl GlobalArgs {
    fn from_cli(cli: &Cli) -> Self {
        let color = match cli.color {
            ColorChoice::Auto => std::io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        let flag = |set: bool| set.then_some(true);
        Self {
            quiet: cli.quiet,
            verbose: cli.verbose,
            color,
            config: cli.config.clone(),
            overrides: OptionOverrides {
                declaration: flag(cli.declaration),
                source_map: flag(cli.source_map),
                no_emit: flag(cli.no_emit),
                incremental: None,
            },
        }
    }
}

/// Installs the stderr log subscriber. `SKIFF_LOG` takes an `EnvFilter`
/// directive and wins over `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SKIFF_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let global = GlobalArgs::from_cli(&cli);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Clean => clean::run(&global),
        Command::Status => status::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
