//! Error types shared by the planner, executor and ledger.

use crate::config::ConfigError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while planning, moving or undoing.
///
/// Directory-level variants abort a run. `MoveFailed` and `UndoConflict`
/// describe a single file and are collected into results instead of being
/// returned.
#[derive(Error, Debug)]
pub enum OrganizeError {
    /// The source directory does not exist or is not a directory.
    #[error("Source directory not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The source directory exists but cannot be accessed.
    #[error("Permission denied for {}: {source}", path.display())]
    Permission { path: PathBuf, source: io::Error },

    /// Listing the source directory failed for another reason.
    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    /// A single file could not be moved into its category folder.
    #[error("Failed to move {} to {}: {reason}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    /// Undo was requested but the ledger has nothing recorded.
    #[error("No recorded moves to undo in {}", ledger.display())]
    NoHistory { ledger: PathBuf },

    /// A single ledger record could not be reversed safely.
    #[error("Undo conflict at {}: {reason}", path.display())]
    UndoConflict { path: PathBuf, reason: String },

    #[error("Failed to read ledger {}: {source}", path.display())]
    LedgerRead { path: PathBuf, source: io::Error },

    #[error("Failed to write ledger {}: {source}", path.display())]
    LedgerWrite { path: PathBuf, source: io::Error },

    #[error("Invalid ledger format in {}: {source}", path.display())]
    LedgerFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write report {}: {source}", path.display())]
    ReportWrite { path: PathBuf, source: io::Error },

    #[error("Failed to read report {}: {source}", path.display())]
    ReportRead { path: PathBuf, source: io::Error },

    #[error("Invalid report format in {}: {source}", path.display())]
    ReportFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OrganizeError {
    /// Classifies an I/O error raised while accessing a directory.
    pub fn from_dir_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Self::SourceNotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => Self::Permission {
                path: path.to_path_buf(),
                source: error,
            },
            _ => Self::ReadDir {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Returns true for errors that stop a whole run rather than one file.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MoveFailed { .. } | Self::UndoConflict { .. })
    }
}

/// Result type for organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_io_not_found_maps_to_source_not_found() {
        let err = OrganizeError::from_dir_io(
            Path::new("/missing"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, OrganizeError::SourceNotFound { .. }));
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_dir_io_permission_denied() {
        let err = OrganizeError::from_dir_io(
            Path::new("/locked"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, OrganizeError::Permission { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_per_file_errors_are_not_fatal() {
        let err = OrganizeError::MoveFailed {
            from: PathBuf::from("a.txt"),
            to: PathBuf::from("Documents/a.txt"),
            reason: "busy".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Failed to move a.txt to Documents/a.txt: busy");
    }
}
