//! Persistent history of applied moves, and undo.
//!
//! The ledger is a JSON file holding every applied move tagged with the run
//! that made it. Runs are appended; undo reverses only the most recent run and
//! then drops its records.

use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::Category;
use crate::planner::{MoveOperation, OperationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::NamedTempFile;

const LEDGER_VERSION: u32 = 1;

static RUN_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Identifies one apply run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStamp {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

impl RunStamp {
    /// Creates a stamp for a run starting now.
    ///
    /// The id combines the start time, the process id and a per-process
    /// sequence number, so ids never repeat.
    pub fn now() -> Self {
        let timestamp = Utc::now();
        let sequence = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let id = format!(
            "{}-{}-{}",
            timestamp.format("%Y%m%dT%H%M%S%.6fZ"),
            std::process::id(),
            sequence
        );
        Self { id, timestamp }
    }
}

/// One applied move as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub category: Category,
}

/// On-disk layout of the ledger file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFile {
    #[serde(default = "ledger_version")]
    pub version: u32,
    #[serde(default)]
    pub records: Vec<LedgerRecord>,
}

fn ledger_version() -> u32 {
    LEDGER_VERSION
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            records: Vec::new(),
        }
    }
}

impl LedgerFile {
    /// The run id of the most recently appended record.
    pub fn last_run_id(&self) -> Option<&str> {
        self.records.last().map(|record| record.run_id.as_str())
    }

    /// Records of the most recent run, in the order they were applied.
    pub fn last_run_records(&self) -> Vec<LedgerRecord> {
        match self.last_run_id() {
            Some(run_id) => self
                .records
                .iter()
                .filter(|record| record.run_id == run_id)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Outcome of undoing one run.
#[derive(Debug)]
pub struct UndoReport {
    pub run_id: String,
    pub restored: usize,
    /// Records skipped because the filesystem no longer matches the ledger.
    pub conflicts: Vec<OrganizeError>,
    /// Records whose move back failed.
    pub failed_restores: Vec<OrganizeError>,
    /// Set when the undone run could not be removed from the ledger.
    pub ledger_error: Option<OrganizeError>,
}

impl UndoReport {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            restored: 0,
            conflicts: Vec::new(),
            failed_restores: Vec::new(),
            ledger_error: None,
        }
    }

    pub fn total_processed(&self) -> usize {
        self.restored + self.conflicts.len() + self.failed_restores.len()
    }

    /// Returns true if every record was restored and the ledger was updated.
    pub fn is_complete_success(&self) -> bool {
        self.conflicts.is_empty() && self.failed_restores.is_empty() && self.ledger_error.is_none()
    }
}

/// Reads and writes the move history stored at one path.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Starts a new run. Nothing is written until a move is recorded.
    pub fn start_run(&self) -> RunStamp {
        RunStamp::now()
    }

    /// Loads the ledger, or `None` if the file does not exist.
    pub fn load(&self) -> OrganizeResult<Option<LedgerFile>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OrganizeError::LedgerRead {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(Some(LedgerFile::default()));
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| OrganizeError::LedgerFormat {
                path: self.path.clone(),
                source: e,
            })
    }

    /// Writes the ledger, removing the file once it holds no records.
    ///
    /// The new content is written to a temporary file and renamed over the
    /// ledger, so readers only ever see the previous or the new version.
    fn save(&self, file: &LedgerFile) -> OrganizeResult<()> {
        let write_error = |source: io::Error| OrganizeError::LedgerWrite {
            path: self.path.clone(),
            source,
        };

        if file.records.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(write_error(e)),
                _ => Ok(()),
            };
        }

        let json = serde_json::to_string_pretty(file)
            .map_err(|e| write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        // Stage next to the ledger so the final rename stays on one filesystem.
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(json.as_bytes()).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged
            .persist(&self.path)
            .map_err(|e| write_error(e.error))?;
        Ok(())
    }

    /// Appends the applied operations under `run`.
    ///
    /// Operations in any other status are ignored. Returns the number of
    /// records written.
    pub fn record(&self, run: &RunStamp, operations: &[MoveOperation]) -> OrganizeResult<usize> {
        let new_records: Vec<LedgerRecord> = operations
            .iter()
            .filter(|op| op.status == OperationStatus::Applied)
            .map(|op| LedgerRecord {
                run_id: run.id.clone(),
                timestamp: run.timestamp,
                source_path: op.source.clone(),
                destination_path: op.destination.clone(),
                category: op.category,
            })
            .collect();

        if new_records.is_empty() {
            return Ok(0);
        }

        let mut file = self.load()?.unwrap_or_default();
        let count = new_records.len();
        file.records.extend(new_records);
        self.save(&file)?;

        log::info!(
            "recorded {} move(s) for run {} in {}",
            count,
            run.id,
            self.path.display()
        );
        Ok(count)
    }

    /// Reverses the most recent run.
    ///
    /// Records are processed in reverse apply order. A record whose moved
    /// file is gone, or whose original location is occupied, is reported as a
    /// conflict and skipped. The run is removed from the ledger afterwards,
    /// whatever the outcome of the individual records.
    pub fn undo_last(&self) -> OrganizeResult<UndoReport> {
        let mut file = self.load()?.unwrap_or_default();
        let records = file.last_run_records();
        let Some(run_id) = records.first().map(|record| record.run_id.clone()) else {
            return Err(OrganizeError::NoHistory {
                ledger: self.path.clone(),
            });
        };

        log::info!("undoing run {} ({} record(s))", run_id, records.len());
        let mut report = UndoReport::new(run_id.clone());

        for record in records.iter().rev() {
            match restore_record(record) {
                Ok(()) => report.restored += 1,
                Err(e @ OrganizeError::UndoConflict { .. }) => {
                    log::warn!("{}", e);
                    report.conflicts.push(e);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    report.failed_restores.push(e);
                }
            }
        }

        file.records.retain(|record| record.run_id != run_id);
        if let Err(e) = self.save(&file) {
            log::warn!("could not remove run {} from ledger: {}", run_id, e);
            report.ledger_error = Some(e);
        }

        Ok(report)
    }
}

/// Moves one recorded file back to where it came from.
fn restore_record(record: &LedgerRecord) -> OrganizeResult<()> {
    let moved = &record.destination_path;
    let original = &record.source_path;

    match fs::symlink_metadata(moved) {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => {
            return Err(OrganizeError::UndoConflict {
                path: moved.clone(),
                reason: "no longer a regular file".to_string(),
            });
        }
        Err(_) => {
            return Err(OrganizeError::UndoConflict {
                path: moved.clone(),
                reason: "file not found at recorded location".to_string(),
            });
        }
    }

    if fs::symlink_metadata(original).is_ok() {
        return Err(OrganizeError::UndoConflict {
            path: original.clone(),
            reason: "original location is occupied".to_string(),
        });
    }

    let move_failed = |reason: String| OrganizeError::MoveFailed {
        from: moved.clone(),
        to: original.clone(),
        reason,
    };

    if let Some(parent) = original.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| move_failed(e.to_string()))?;
    }

    fs::rename(moved, original).map_err(|e| move_failed(e.to_string()))?;
    log::info!("restored {} -> {}", moved.display(), original.display());
    Ok(())
}
