//! desktidy - sort a directory's files into category folders
//!
//! The library builds a move plan from a directory's top-level files,
//! executes or simulates it, and keeps a ledger of applied moves so the most
//! recent run can be undone. Configuration adds file filters, extra extension
//! mappings and the ledger/report locations.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod file_category;
pub mod ledger;
pub mod output;
pub mod planner;
pub mod report;

pub use config::{CompiledFilters, Config, ConfigError};
pub use error::{OrganizeError, OrganizeResult};
pub use executor::{ExecutionMode, ExecutionResult, Executor};
pub use file_category::{Category, CategoryMap};
pub use ledger::{Ledger, LedgerRecord, RunStamp, UndoReport};
pub use planner::{MoveOperation, OperationStatus, Plan, PlanBuilder, build_plan};
pub use report::Report;

pub use cli::{OrganizeCommand, RunOptions, RunOutcome, run_cli};
