//! Plan execution.
//!
//! Runs a [`Plan`] either as a dry run (checks only, nothing touched) or for
//! real, creating category folders and moving files. Applied moves are
//! written to the [`Ledger`] one at a time so an interrupted run can still be
//! undone up to the point it reached.

use crate::error::{OrganizeError, OrganizeResult};
use crate::ledger::{Ledger, RunStamp};
use crate::planner::{MoveOperation, OperationStatus, Plan, SkippedEntry};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// How a plan is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    DryRun,
    Apply,
}

/// Outcome of executing a plan.
#[derive(Debug)]
pub struct ExecutionResult {
    pub mode: ExecutionMode,
    pub source_dir: PathBuf,
    pub operations: Vec<MoveOperation>,
    pub skipped: Vec<SkippedEntry>,
    /// Set for apply runs.
    pub run: Option<RunStamp>,
    /// Fatal error that stopped the run early. Operations after the failure
    /// point keep their `planned` status.
    pub aborted: Option<OrganizeError>,
}

impl ExecutionResult {
    pub fn count(&self, status: OperationStatus) -> usize {
        self.operations
            .iter()
            .filter(|op| op.status == status)
            .count()
    }

    pub fn applied_count(&self) -> usize {
        self.count(OperationStatus::Applied)
    }

    pub fn failed_count(&self) -> usize {
        self.count(OperationStatus::Failed)
    }

    /// True when every operation reached its final status without failures.
    pub fn is_complete_success(&self) -> bool {
        self.aborted.is_none() && self.failed_count() == 0
    }
}

/// Executes plans against the filesystem.
pub struct Executor<'a> {
    ledger: &'a Ledger,
    progress: Option<ProgressBar>,
}

impl<'a> Executor<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            progress: None,
        }
    }

    /// Reports per-operation progress on `progress` while applying.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Executes `plan` in `mode`.
    ///
    /// A dry run marks every operation `simulated` and only attaches warnings.
    /// Apply processes operations strictly in plan order; per-file failures
    /// are recorded and skipped, while losing access to the source directory
    /// or failing to write the ledger aborts the rest of the plan.
    pub fn execute(&self, plan: Plan, mode: ExecutionMode) -> ExecutionResult {
        match mode {
            ExecutionMode::DryRun => self.simulate(plan),
            ExecutionMode::Apply => self.apply(plan),
        }
    }

    fn simulate(&self, plan: Plan) -> ExecutionResult {
        let Plan {
            source_dir,
            mut operations,
            skipped,
        } = plan;

        for op in &mut operations {
            op.warning = predict_problem(op);
            if let Some(warning) = &op.warning {
                log::warn!("{}: {}", op.source.display(), warning);
            }
            op.status = OperationStatus::Simulated;
        }

        ExecutionResult {
            mode: ExecutionMode::DryRun,
            source_dir,
            operations,
            skipped,
            run: None,
            aborted: None,
        }
    }

    fn apply(&self, plan: Plan) -> ExecutionResult {
        let Plan {
            source_dir,
            mut operations,
            skipped,
        } = plan;
        let run = self.ledger.start_run();
        let mut aborted = None;
        log::info!(
            "applying {} move(s) in {} as run {}",
            operations.len(),
            source_dir.display(),
            run.id
        );

        for op in &mut operations {
            if let Some(pb) = &self.progress {
                pb.set_message(file_name_of(&op.source));
            }

            match self.apply_one(&source_dir, &run, op) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    aborted = Some(e);
                    break;
                }
                Err(e) => {
                    log::warn!("{}", e);
                    op.status = OperationStatus::Failed;
                    op.failure_reason = Some(e.to_string());
                }
            }

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        if let Some(e) = &aborted {
            log::error!("run {} aborted: {}", run.id, e);
        }
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        ExecutionResult {
            mode: ExecutionMode::Apply,
            source_dir,
            operations,
            skipped,
            run: Some(run),
            aborted,
        }
    }

    /// Moves one file and records it. Directory and ledger errors are fatal;
    /// a failed move only concerns `op`.
    fn apply_one(
        &self,
        source_dir: &Path,
        run: &RunStamp,
        op: &mut MoveOperation,
    ) -> OrganizeResult<()> {
        fs::metadata(source_dir).map_err(|e| OrganizeError::from_dir_io(source_dir, e))?;

        move_file(op)?;
        op.status = OperationStatus::Applied;
        log::info!("moved {} -> {}", op.source.display(), op.destination.display());

        self.ledger.record(run, std::slice::from_ref(op))?;
        Ok(())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Checks what would go wrong if `op` were applied now, without touching disk.
fn predict_problem(op: &MoveOperation) -> Option<String> {
    if fs::symlink_metadata(&op.source).is_err() {
        return Some("source file no longer exists".to_string());
    }

    if let Some(category_dir) = op.destination.parent()
        && let Ok(metadata) = fs::metadata(category_dir)
        && !metadata.is_dir()
    {
        return Some(format!(
            "cannot create folder {}: a file with that name exists",
            category_dir.display()
        ));
    }

    if fs::symlink_metadata(&op.destination).is_ok() {
        return Some(format!(
            "destination {} is already occupied",
            op.destination.display()
        ));
    }

    None
}

/// Creates the category folder if needed, then moves the file without ever
/// replacing an existing destination.
fn move_file(op: &MoveOperation) -> OrganizeResult<()> {
    let failed = |reason: String| OrganizeError::MoveFailed {
        from: op.source.clone(),
        to: op.destination.clone(),
        reason,
    };

    let category_dir = op
        .destination
        .parent()
        .ok_or_else(|| failed("destination has no parent folder".to_string()))?;

    match fs::create_dir(category_dir) {
        Ok(()) => log::debug!("created {}", category_dir.display()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && category_dir.is_dir() => {}
        Err(e) => {
            return Err(failed(format!(
                "cannot create folder {}: {}",
                category_dir.display(),
                e
            )));
        }
    }

    if fs::symlink_metadata(&op.destination).is_ok() {
        return Err(failed("destination already exists".to_string()));
    }

    fs::rename(&op.source, &op.destination).map_err(|e| failed(e.to_string()))
}
