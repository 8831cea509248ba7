//! JSON summary of a plan or an execution.

use crate::error::{OrganizeError, OrganizeResult};
use crate::executor::{ExecutionMode, ExecutionResult};
use crate::planner::{MoveOperation, OperationStatus, Plan, SkippedEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    Preview,
    DryRun,
    Apply,
}

impl From<ExecutionMode> for ReportMode {
    fn from(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::DryRun => ReportMode::DryRun,
            ExecutionMode::Apply => ReportMode::Apply,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub planned: usize,
    pub simulated: usize,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReportTotals {
    fn tally(operations: &[MoveOperation], skipped: usize) -> Self {
        let count = |status| operations.iter().filter(|op| op.status == status).count();
        Self {
            planned: count(OperationStatus::Planned),
            simulated: count(OperationStatus::Simulated),
            applied: count(OperationStatus::Applied),
            failed: count(OperationStatus::Failed),
            skipped,
        }
    }
}

/// Snapshot of the last plan and the final status of each operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub source_dir: PathBuf,
    pub mode: ReportMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub totals: ReportTotals,
    pub operations: Vec<MoveOperation>,
    #[serde(default)]
    pub skipped: Vec<SkippedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl Report {
    /// Report for a plan that is only being previewed.
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            generated_at: Utc::now(),
            source_dir: plan.source_dir.clone(),
            mode: ReportMode::Preview,
            run_id: None,
            totals: ReportTotals::tally(&plan.operations, plan.skipped.len()),
            operations: plan.operations.clone(),
            skipped: plan.skipped.clone(),
            aborted: None,
        }
    }

    /// Report for an executed (or simulated) plan.
    pub fn from_execution(result: &ExecutionResult) -> Self {
        Self {
            generated_at: Utc::now(),
            source_dir: result.source_dir.clone(),
            mode: result.mode.into(),
            run_id: result.run.as_ref().map(|run| run.id.clone()),
            totals: ReportTotals::tally(&result.operations, result.skipped.len()),
            operations: result.operations.clone(),
            skipped: result.skipped.clone(),
            aborted: result.aborted.as_ref().map(ToString::to_string),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report to `path`, replacing any previous report.
    pub fn write(&self, path: &Path) -> OrganizeResult<()> {
        let json = self.to_json().map_err(|e| OrganizeError::ReportFormat {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| OrganizeError::ReportWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::debug!("wrote report to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> OrganizeResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| OrganizeError::ReportRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| OrganizeError::ReportFormat {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
