//! Command line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use unhammer::coordinator::{GlobalUsageState, ManifestError};
use unhammer::engine::{discover_targets, migrate_target, MigrationError, Severity};
use unhammer_core::tree::FileTree;

#[derive(Parser, Debug)]
#[command(
    name = "unhammer",
    version,
    about = "Migrates Angular-style TypeScript apps off implicit HammerJS gesture wiring"
)]
struct Cli {
    /// Project directory to migrate.
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Only migrate targets with this name (repeatable).
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Analyze and report without writing any files.
    #[arg(long)]
    dry_run: bool,

    /// Print the reports as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), MigrationError> {
    let mut tree = FileTree::load(&cli.project)?;
    let mut targets = discover_targets(&tree);
    if !cli.targets.is_empty() {
        targets.retain(|t| cli.targets.contains(&t.name));
    }
    if targets.is_empty() {
        println!("no migration targets found (no main.ts entry files)");
        return Ok(());
    }

    let mut global = GlobalUsageState::new();
    let mut reports = Vec::new();
    for target in &targets {
        reports.push(migrate_target(&mut tree, &mut global, target)?);
    }
    let manifest_changed = global.finalize(&mut tree)?;

    if cli.json {
        let out = serde_json::to_string_pretty(&reports).map_err(ManifestError::from)?;
        println!("{out}");
    } else {
        for report in &reports {
            println!("target {} -> {}", report.target, report.strategy);
            for file in &report.changed_files {
                println!("  changed {file}");
            }
            for diag in &report.diagnostics {
                let level = match diag.severity {
                    Severity::Info => "info",
                    Severity::Warning => "warning",
                };
                println!(
                    "  {} {}:{}:{} {}",
                    level, diag.file_path, diag.position.line, diag.position.character,
                    diag.message
                );
            }
        }
    }

    if manifest_changed {
        println!("removed hammerjs from package.json; reinstall node modules");
    }

    if cli.dry_run {
        println!("dry run, nothing written");
    } else {
        let written = tree.write_back(&cli.project)?;
        println!("{written} file(s) written");
    }
    Ok(())
}
