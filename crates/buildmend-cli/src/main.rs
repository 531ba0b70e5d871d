//! buildmend CLI
//!
//! The `buildmend` command runs a project's build, repairs the files its
//! diagnostics point at, and repeats until the build passes.
//!
//! ## Commands
//!
//! - `fix`: run the build/diagnose/repair loop on a project
//! - `parse`: parse a saved build log and print its diagnostics as JSON
//! - `report`: verify and print a saved repair report
//! - `restore`: roll files back to their pre-session backups

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{warn, Level};

use buildmend_build::{BuildCommand, CommandBuildRunner};
use buildmend_core::{
    read_report_file, restore_from_report, write_report_artifact, ConvergenceController,
    DiagnosticParser, FixGenerator, RepairMode, RepairPolicy, RepairReport, StrategySelector,
};
use buildmend_llm::{LlmClient, LlmOptions};

#[derive(Parser)]
#[command(name = "buildmend")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build, diagnose and repair generated UI component trees", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the build and repair diagnostics until it passes
    Fix {
        /// Project directory containing the build
        #[arg(env = "BUILDMEND_TARGET", default_value = ".")]
        target: PathBuf,

        /// Maximum number of build invocations
        #[arg(long, env = "BUILDMEND_MAX_RETRIES", default_value_t = 3)]
        max_retries: u32,

        /// Build timeout in seconds
        #[arg(long, env = "BUILDMEND_BUILD_TIMEOUT_SECS", default_value_t = 300)]
        timeout_secs: u64,

        /// Build command line (default: npm run build)
        #[arg(long)]
        build_cmd: Option<String>,

        /// Use deterministic rules only, even when a generator is configured
        #[arg(long)]
        rules_only: bool,

        /// Directory to write the repair report artifact into
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Parse a build log and print diagnostics as JSON
    Parse {
        /// Log file, or "-" for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// Verify and print a saved repair report
    Report {
        /// Path to repair-report.json
        path: PathBuf,
    },

    /// Restore every file in a report to its pre-session backup
    Restore {
        /// Path to repair-report.json
        report: PathBuf,

        /// Project directory the report was produced for
        #[arg(long, default_value = ".")]
        target: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    buildmend_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Fix {
            target,
            max_retries,
            timeout_secs,
            build_cmd,
            rules_only,
            report_dir,
        } => {
            cmd_fix(
                &target,
                max_retries,
                timeout_secs,
                build_cmd.as_deref(),
                rules_only,
                report_dir.as_deref(),
            )
            .await
        }
        Commands::Parse { input } => cmd_parse(&input),
        Commands::Report { path } => cmd_report(&path),
        Commands::Restore { report, target } => cmd_restore(&report, &target),
    }
}

async fn cmd_fix(
    target: &Path,
    max_retries: u32,
    timeout_secs: u64,
    build_cmd: Option<&str>,
    rules_only: bool,
    report_dir: Option<&Path>,
) -> Result<()> {
    let root = target
        .canonicalize()
        .with_context(|| format!("Target directory not found: {:?}", target))?;

    let command = match build_cmd {
        Some(line) => BuildCommand::from_command_line(line, &root),
        None => BuildCommand::npm_build(&root),
    }
    .with_timeout_ms(timeout_secs.saturating_mul(1000));
    if command.command.is_empty() {
        anyhow::bail!("Build command is empty");
    }

    let mode = if rules_only {
        RepairMode::RulesOnly
    } else {
        RepairMode::Auto
    };
    let generator: Option<Arc<dyn FixGenerator>> = match mode {
        RepairMode::RulesOnly => None,
        RepairMode::Auto => {
            let client = LlmClient::from_env(LlmOptions::default())
                .context("Failed to build text-generation client")?;
            if !client.is_enabled() {
                warn!("no text-generation credentials found; using repair rules only");
            }
            Some(Arc::new(client))
        }
    };

    println!("Running build for: {}", root.display());
    println!("Command: {}", command.command.join(" "));

    let controller = ConvergenceController::new(
        root.clone(),
        Arc::new(CommandBuildRunner::new(command)),
        StrategySelector::new(generator, mode),
        DiagnosticParser::default(),
        RepairPolicy {
            max_attempts: max_retries.max(1),
            mode,
        },
    );
    let report = controller.run().await;

    print_report(&report);

    if let Some(dir) = report_dir {
        let path = write_report_artifact(&report, dir)
            .with_context(|| format!("Failed to write report to {:?}", dir))?;
        println!("Report: {}", path.display());
    }

    if !report.success {
        anyhow::bail!("repair session failed: {:?}", report.stop_reason);
    }
    Ok(())
}

fn cmd_parse(input: &str) -> Result<()> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read build log from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read build log: {}", input))?
    };

    let diagnostics = DiagnosticParser::default().parse(&raw);
    println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    Ok(())
}

fn cmd_report(path: &Path) -> Result<()> {
    let report = read_report_file(path)
        .with_context(|| format!("Failed to read report: {:?}", path))?;
    println!("Report digest verified");
    print_report(&report);
    Ok(())
}

fn cmd_restore(report_path: &Path, target: &Path) -> Result<()> {
    let report = read_report_file(report_path)
        .with_context(|| format!("Failed to read report: {:?}", report_path))?;
    let root = target
        .canonicalize()
        .with_context(|| format!("Target directory not found: {:?}", target))?;
    let restored = restore_from_report(&report, &root)?;

    if restored.is_empty() {
        println!("Nothing to restore; the session applied no repairs.");
    }
    for file in &restored {
        println!("Restored {} from {}", file.file, file.backup_path.display());
    }
    Ok(())
}

fn print_report(report: &RepairReport) {
    println!();
    println!("Run:       {}", report.run_id);
    println!(
        "Result:    {} ({:?})",
        if report.success { "PASSED" } else { "FAILED" },
        report.stop_reason
    );
    println!("Attempts:  {}", report.attempts);
    println!("Duration:  {}ms", report.duration_ms());

    if !report.fixed_files.is_empty() {
        println!("\nRepaired:");
        for record in &report.fixed_files {
            println!("  {} [{}] {}", record.file, record.strategy, record.message);
        }
    }

    if let Some(errors) = report.errors.as_ref().filter(|e| !e.is_empty()) {
        println!("\nRemaining errors:");
        for diagnostic in errors {
            println!("  {}  {}", diagnostic.location(), diagnostic.message);
        }
    }

    if !report.unfixed.is_empty() {
        println!("\nUnfixed:");
        for unfixed in &report.unfixed {
            println!("  {}  {}", unfixed.diagnostic.location(), unfixed.reason);
        }
    }

    println!(
        "\nSummary:   {} fixed, {} unfixed",
        report.summary.total_fixed, report.summary.total_unfixed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fix_defaults() {
        let cli = Cli::try_parse_from(["buildmend", "fix", "/tmp/app"]).unwrap();
        match cli.command {
            Commands::Fix {
                target,
                rules_only,
                build_cmd,
                ..
            } => {
                assert_eq!(target, PathBuf::from("/tmp/app"));
                assert!(!rules_only);
                assert!(build_cmd.is_none());
            }
            _ => panic!("expected fix"),
        }
    }

    #[test]
    fn test_parse_reads_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("build.log");
        std::fs::write(&log, "./src/a.tsx\n1:1  Error: boom  some-rule\n").unwrap();
        cmd_parse(log.to_str().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_fix_rules_only_with_passing_build() {
        let dir = tempfile::tempdir().unwrap();
        let result = cmd_fix(dir.path(), 2, 10, Some("true"), true, Some(dir.path())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fix_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_fix(dir.path(), 2, 10, Some("false"), true, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("repair session failed"));
    }
}
