//! Command-line interface for desktidy.
//!
//! This module handles:
//! - Argument parsing (clap)
//! - Loading configuration and wiring the planner, executor and ledger
//! - Human-readable and JSON output
//! - Mapping outcomes to exit codes

use crate::config::{Config, StatePaths};
use crate::error::{OrganizeError, OrganizeResult};
use crate::executor::{ExecutionMode, ExecutionResult, Executor};
use crate::ledger::{Ledger, UndoReport};
use crate::output::OutputFormatter;
use crate::planner::{OperationStatus, Plan, PlanBuilder, resolve_source_dir};
use crate::report::Report;
use clap::{ArgAction, Parser};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Sort the files of a directory into category folders.
#[derive(Debug, Parser)]
#[command(name = "desktidy", version, about, long_about = None)]
pub struct Args {
    /// Directory to organize
    #[arg(long, short = 's', value_name = "PATH")]
    pub source: PathBuf,

    /// Show what would happen without moving anything
    #[arg(long, conflicts_with_all = ["preview", "undo"])]
    pub dry_run: bool,

    /// Print the move plan only
    #[arg(long, conflicts_with = "undo")]
    pub preview: bool,

    /// Reverse the most recent run
    #[arg(long)]
    pub undo: bool,

    /// Configuration file (defaults to .desktidyrc.toml, then ~/.config/desktidy/config.toml)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON instead of the human-readable summary
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn organize_command(&self) -> OrganizeCommand {
        if self.undo {
            OrganizeCommand::Undo
        } else if self.preview {
            OrganizeCommand::Preview
        } else {
            OrganizeCommand::Organize {
                dry_run: self.dry_run,
            }
        }
    }

    pub fn options(&self) -> RunOptions {
        RunOptions {
            config_path: self.config.clone(),
            json: self.json,
        }
    }

    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Organize files in a directory.
    Organize {
        /// If true, simulate the operation without making changes.
        dry_run: bool,
    },
    /// Print the plan without executing it.
    Preview,
    /// Undo the most recent organization.
    Undo,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

/// How a run that did not hit a fatal error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Some files could not be moved or restored.
    CompletedWithFailures,
}

impl RunOutcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunOutcome::Completed => ExitCode::SUCCESS,
            RunOutcome::CompletedWithFailures => ExitCode::from(2),
        }
    }
}

/// Runs a command against `source` with the given options.
///
/// Fatal errors (missing source directory, permission problems, nothing to
/// undo, invalid configuration, an aborted apply) are returned as `Err`.
///
/// ```no_run
/// use desktidy::cli::{OrganizeCommand, RunOptions, run_cli};
/// use std::path::Path;
///
/// let outcome = run_cli(
///     OrganizeCommand::Organize { dry_run: true },
///     Path::new("/home/user/Desktop"),
///     &RunOptions::default(),
/// );
/// ```
pub fn run_cli(
    command: OrganizeCommand,
    source: &Path,
    options: &RunOptions,
) -> OrganizeResult<RunOutcome> {
    let config = Config::load(options.config_path.as_deref())?;
    let source_dir = resolve_source_dir(source)?;
    let paths = config.state_paths(&source_dir);
    let ledger = Ledger::new(&paths.ledger);

    match command {
        OrganizeCommand::Undo => undo_organization(&ledger, options.json),
        OrganizeCommand::Preview => {
            let plan = plan_directory(&config, &source_dir, &paths)?;
            if options.json {
                print_json(&Report::from_plan(&plan))?;
            } else {
                print_plan(&plan);
            }
            Ok(RunOutcome::Completed)
        }
        OrganizeCommand::Organize { dry_run: true } => {
            let plan = plan_directory(&config, &source_dir, &paths)?;
            let result = Executor::new(&ledger).execute(plan, ExecutionMode::DryRun);
            if options.json {
                print_json(&Report::from_execution(&result))?;
            } else {
                print_dry_run(&result);
            }
            Ok(RunOutcome::Completed)
        }
        OrganizeCommand::Organize { dry_run: false } => {
            let plan = plan_directory(&config, &source_dir, &paths)?;
            apply_plan(plan, &ledger, &paths.report, options.json)
        }
    }
}

fn plan_directory(config: &Config, source_dir: &Path, paths: &StatePaths) -> OrganizeResult<Plan> {
    let categories = config.category_map()?;
    let filters = config.compile_filters()?;
    PlanBuilder::new(&categories)
        .with_filters(&filters)
        .control_file(&paths.ledger)
        .control_file(&paths.report)
        .build(source_dir)
}

fn apply_plan(
    plan: Plan,
    ledger: &Ledger,
    report_path: &Path,
    json: bool,
) -> OrganizeResult<RunOutcome> {
    let mut executor = Executor::new(ledger);
    if !json && !plan.is_empty() {
        executor = executor.with_progress(OutputFormatter::create_progress_bar(plan.len() as u64));
    }

    let mut result = executor.execute(plan, ExecutionMode::Apply);
    let report = Report::from_execution(&result);
    let report_written = report.write(report_path);

    if json {
        print_json(&report)?;
    } else {
        print_apply(&result, ledger);
    }

    let mut outcome = if result.failed_count() > 0 {
        RunOutcome::CompletedWithFailures
    } else {
        RunOutcome::Completed
    };

    if let Err(e) = report_written {
        OutputFormatter::error(&e.to_string());
        outcome = RunOutcome::CompletedWithFailures;
    }

    match result.aborted.take() {
        Some(e) => Err(e),
        None => Ok(outcome),
    }
}

fn undo_organization(ledger: &Ledger, json: bool) -> OrganizeResult<RunOutcome> {
    if !json {
        OutputFormatter::info("Undoing previous organization...");
    }

    let report = ledger.undo_last()?;

    if json {
        let value = json!({
            "run_id": report.run_id,
            "restored": report.restored,
            "conflicts": report.conflicts.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "failed": report.failed_restores.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "ledger_error": report.ledger_error.as_ref().map(ToString::to_string),
        });
        print_json(&value)?;
    } else {
        print_undo(&report);
    }

    Ok(if report.is_complete_success() {
        RunOutcome::Completed
    } else {
        RunOutcome::CompletedWithFailures
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> OrganizeResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| OrganizeError::ReportFormat {
        path: PathBuf::from("<stdout>"),
        source: e,
    })?;
    println!("{}", text);
    Ok(())
}

fn print_plan(plan: &Plan) {
    OutputFormatter::info(&format!("Preview of: {}", plan.source_dir.display()));

    if plan.is_empty() {
        OutputFormatter::plain("No files to organize.");
        return;
    }

    for op in &plan.operations {
        OutputFormatter::move_line(op, &plan.source_dir);
    }
    OutputFormatter::summary_table(&plan.operations);
}

fn print_dry_run(result: &ExecutionResult) {
    OutputFormatter::dry_run_notice(&format!("Analyzing: {}", result.source_dir.display()));

    if result.operations.is_empty() {
        OutputFormatter::plain("No files to organize.");
        return;
    }

    for op in &result.operations {
        OutputFormatter::move_line(op, &result.source_dir);
        if let Some(warning) = &op.warning {
            OutputFormatter::warning(&format!("   {}", warning));
        }
    }
    OutputFormatter::summary_table(&result.operations);
    OutputFormatter::dry_run_notice("No files were modified.");
}

fn print_apply(result: &ExecutionResult, ledger: &Ledger) {
    OutputFormatter::info(&format!("Organized: {}", result.source_dir.display()));

    if result.operations.is_empty() {
        OutputFormatter::plain("No files to organize.");
        return;
    }

    for op in &result.operations {
        match op.status {
            OperationStatus::Applied => OutputFormatter::move_line(op, &result.source_dir),
            OperationStatus::Failed => OutputFormatter::error(
                op.failure_reason
                    .as_deref()
                    .unwrap_or("move failed for an unknown reason"),
            ),
            OperationStatus::Planned | OperationStatus::Simulated => {}
        }
    }

    let applied: Vec<_> = result
        .operations
        .iter()
        .filter(|op| op.status == OperationStatus::Applied)
        .cloned()
        .collect();
    OutputFormatter::summary_table(&applied);

    if result.aborted.is_some() {
        OutputFormatter::warning(&format!(
            "Stopped early; {} file(s) were not attempted.",
            result.count(OperationStatus::Planned)
        ));
    }
    if result.failed_count() > 0 {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be organized. See errors above.",
            result.failed_count()
        ));
    }
    if result.applied_count() > 0 {
        OutputFormatter::success(&format!(
            "History saved to {}. Run with --undo to revert.",
            ledger.path().display()
        ));
    }
}

fn print_undo(report: &UndoReport) {
    OutputFormatter::success(&format!("Restored: {}", report.restored));

    if !report.conflicts.is_empty() {
        OutputFormatter::warning(&format!("Conflicts: {}", report.conflicts.len()));
        for conflict in &report.conflicts {
            OutputFormatter::plain(&format!("    - {}", conflict));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::error(&format!("Failed: {}", report.failed_restores.len()));
        for failure in &report.failed_restores {
            OutputFormatter::error(&format!("    - {}", failure));
        }
    }

    if let Some(e) = &report.ledger_error {
        OutputFormatter::error(&e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_commands() {
        let args = Args::parse_from(["desktidy", "--source", "/tmp/desk"]);
        assert_eq!(args.organize_command(), OrganizeCommand::Organize { dry_run: false });

        let args = Args::parse_from(["desktidy", "-s", "/tmp/desk", "--dry-run"]);
        assert_eq!(args.organize_command(), OrganizeCommand::Organize { dry_run: true });

        let args = Args::parse_from(["desktidy", "-s", "/tmp/desk", "--preview"]);
        assert_eq!(args.organize_command(), OrganizeCommand::Preview);

        let args = Args::parse_from(["desktidy", "-s", "/tmp/desk", "--undo"]);
        assert_eq!(args.organize_command(), OrganizeCommand::Undo);
    }

    #[test]
    fn test_source_is_required() {
        assert!(Args::try_parse_from(["desktidy", "--dry-run"]).is_err());
    }

    #[test]
    fn test_modes_conflict() {
        assert!(Args::try_parse_from(["desktidy", "-s", "x", "--dry-run", "--undo"]).is_err());
        assert!(Args::try_parse_from(["desktidy", "-s", "x", "--preview", "--undo"]).is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        let quiet = Args::parse_from(["desktidy", "-s", "x"]);
        assert_eq!(quiet.log_level(), "warn");
        let loud = Args::parse_from(["desktidy", "-s", "x", "-vv"]);
        assert_eq!(loud.log_level(), "debug");
    }
}
