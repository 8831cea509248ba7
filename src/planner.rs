//! Move planning.
//!
//! Scans the immediate entries of a directory and turns every regular file
//! into a [`MoveOperation`] towards its category folder. Nothing is created or
//! moved here; the [`Plan`] is handed to the executor.

use crate::config::{CompiledFilters, DEFAULT_LOG_FILE, DEFAULT_REPORT_FILE};
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::{Category, CategoryMap};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// A file found directly inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: OsString,
    /// Lowercased extension including the leading dot, or empty.
    pub extension: String,
    pub path: PathBuf,
}

impl Entry {
    fn new(path: PathBuf) -> Self {
        let name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        Self {
            name,
            extension,
            path,
        }
    }
}

/// Lifecycle of a move operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Planned,
    Simulated,
    Applied,
    Failed,
}

/// A single planned or executed file move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: Category,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Problem predicted by a dry run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl MoveOperation {
    fn planned(source: PathBuf, destination: PathBuf, category: Category) -> Self {
        Self {
            source,
            destination,
            category,
            status: OperationStatus::Planned,
            failure_reason: None,
            warning: None,
        }
    }
}

/// Why an entry was left out of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Directory,
    ControlFile,
    Filtered,
    NotRegularFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// The ordered moves for one invocation.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Canonical path of the directory being organized.
    pub source_dir: PathBuf,
    pub operations: Vec<MoveOperation>,
    pub skipped: Vec<SkippedEntry>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// Canonicalizes `source_dir` and checks that it is a directory.
pub fn resolve_source_dir(source_dir: &Path) -> OrganizeResult<PathBuf> {
    let canonical =
        fs::canonicalize(source_dir).map_err(|e| OrganizeError::from_dir_io(source_dir, e))?;
    if !canonical.is_dir() {
        return Err(OrganizeError::SourceNotFound {
            path: source_dir.to_path_buf(),
        });
    }
    Ok(canonical)
}

/// Builds move plans for a directory.
pub struct PlanBuilder<'a> {
    categories: &'a CategoryMap,
    filters: Option<&'a CompiledFilters>,
    control_files: Vec<PathBuf>,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(categories: &'a CategoryMap) -> Self {
        Self {
            categories,
            filters: None,
            control_files: Vec::new(),
        }
    }

    /// Applies configured filter rules to every candidate file.
    pub fn with_filters(mut self, filters: &'a CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Marks a file owned by this tool (ledger, report) so it is never moved.
    ///
    /// Relative paths are taken relative to the source directory.
    pub fn control_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.control_files.push(path.into());
        self
    }

    /// Control file locations with their parent folder canonicalized, so they
    /// compare equal to entries listed from the canonical source directory.
    fn resolved_control_files(&self, source_dir: &Path) -> HashSet<PathBuf> {
        self.control_files
            .iter()
            .map(|control| canonical_location(&source_dir.join(control)))
            .collect()
    }

    /// Scans `source_dir` and returns the plan.
    ///
    /// Entries are processed sorted by file name, so the same directory state
    /// always yields the same plan, including collision suffixes.
    pub fn build(&self, source_dir: &Path) -> OrganizeResult<Plan> {
        let source_dir = resolve_source_dir(source_dir)?;

        let read_dir =
            fs::read_dir(&source_dir).map_err(|e| OrganizeError::from_dir_io(&source_dir, e))?;
        let mut dir_entries = read_dir
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OrganizeError::from_dir_io(&source_dir, e))?;
        dir_entries.sort_by_key(|entry| entry.file_name());

        let mut operations = Vec::new();
        let mut skipped = Vec::new();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let control_files = self.resolved_control_files(&source_dir);

        for dir_entry in dir_entries {
            let path = dir_entry.path();
            let file_type = dir_entry
                .file_type()
                .map_err(|e| OrganizeError::from_dir_io(&path, e))?;

            let skip = if file_type.is_dir() {
                Some(SkipReason::Directory)
            } else if !file_type.is_file() {
                Some(SkipReason::NotRegularFile)
            } else if control_files.contains(&path) {
                Some(SkipReason::ControlFile)
            } else if let Some(filters) = self.filters
                && !filters.should_include(&dir_entry.file_name().to_string_lossy())
            {
                Some(SkipReason::Filtered)
            } else {
                None
            };

            if let Some(reason) = skip {
                log::debug!("skipping {} ({:?})", path.display(), reason);
                skipped.push(SkippedEntry { path, reason });
                continue;
            }

            let entry = Entry::new(path);
            let category = self.categories.classify(&entry.extension);
            let category_dir = source_dir.join(category.dir_name());
            let destination = free_destination(&category_dir, &entry, &claimed);

            log::debug!(
                "planned {} -> {}",
                entry.path.display(),
                destination.display()
            );
            claimed.insert(destination.clone());
            operations.push(MoveOperation::planned(entry.path, destination, category));
        }

        Ok(Plan {
            source_dir,
            operations,
            skipped,
        })
    }
}

/// Builds a plan with the standard categories, no filters and the default
/// ledger and report names treated as control files.
pub fn build_plan(source_dir: &Path) -> OrganizeResult<Plan> {
    let categories = CategoryMap::default();
    PlanBuilder::new(&categories)
        .control_file(DEFAULT_LOG_FILE)
        .control_file(DEFAULT_REPORT_FILE)
        .build(source_dir)
}

/// Resolves symlinks in the parent of `path` and keeps the file name as is.
///
/// The file itself may not exist yet (a ledger before the first run).
fn canonical_location(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Picks the first destination in `category_dir` that is neither on disk nor
/// already claimed, trying `name.ext`, then `name_1.ext`, `name_2.ext`, ...
fn free_destination(category_dir: &Path, entry: &Entry, claimed: &HashSet<PathBuf>) -> PathBuf {
    let candidate = category_dir.join(&entry.name);
    if !claimed.contains(&candidate) && !is_occupied(&candidate) {
        return candidate;
    }

    let entry_path = Path::new(&entry.name);
    let stem = entry_path.file_stem().unwrap_or(entry.name.as_os_str());
    let extension = entry_path.extension();

    (1u64..)
        .map(|counter| {
            let mut name = stem.to_os_string();
            name.push(format!("_{counter}"));
            if let Some(ext) = extension {
                name.push(".");
                name.push(ext);
            }
            category_dir.join(name)
        })
        .find(|candidate| !claimed.contains(candidate) && !is_occupied(candidate))
        .unwrap_or_else(|| category_dir.join(&entry.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn relative(plan: &Plan, path: &Path) -> String {
        path.strip_prefix(&plan.source_dir)
            .expect("path outside source dir")
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn destinations(plan: &Plan) -> Vec<String> {
        plan.operations
            .iter()
            .map(|op| relative(plan, &op.destination))
            .collect()
    }

    #[test]
    fn test_entry_extension_is_lowercased_with_dot() {
        let entry = Entry::new(PathBuf::from("/tmp/Photo.JPG"));
        assert_eq!(entry.extension, ".jpg");
        assert_eq!(entry.name, OsString::from("Photo.JPG"));

        let bare = Entry::new(PathBuf::from("/tmp/Makefile"));
        assert_eq!(bare.extension, "");

        let hidden = Entry::new(PathBuf::from("/tmp/.bashrc"));
        assert_eq!(hidden.extension, "");
    }

    #[test]
    fn test_build_plan_basic_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("b.txt"), "text").unwrap();
        fs::write(base.join("a.png"), "image").unwrap();
        fs::write(base.join("c"), "bare").unwrap();

        let plan = build_plan(base).unwrap();

        assert_eq!(
            destinations(&plan),
            vec!["Images/a.png", "Documents/b.txt", "Other/c"]
        );
        assert!(
            plan.operations
                .iter()
                .all(|op| op.status == OperationStatus::Planned)
        );
        assert_eq!(plan.operations[2].category, Category::Other);
    }

    #[test]
    fn test_build_plan_has_no_side_effects() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.png"), "image").unwrap();

        build_plan(base).unwrap();

        assert!(base.join("a.png").exists());
        assert!(!base.join("Images").exists());
    }

    #[test]
    fn test_collision_with_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("Images")).unwrap();
        fs::write(base.join("Images").join("x.jpg"), "old").unwrap();
        fs::write(base.join("x.jpg"), "new").unwrap();
        fs::write(base.join("y.jpg"), "other").unwrap();

        let plan = build_plan(base).unwrap();

        assert_eq!(destinations(&plan), vec!["Images/x_1.jpg", "Images/y.jpg"]);
    }

    #[test]
    fn test_collision_counter_skips_taken_suffixes() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        let images = base.join("Images");
        fs::create_dir(&images).unwrap();
        fs::write(images.join("x.jpg"), "1").unwrap();
        fs::write(images.join("x_1.jpg"), "2").unwrap();
        fs::write(base.join("x.jpg"), "3").unwrap();

        let plan = build_plan(base).unwrap();

        assert_eq!(destinations(&plan), vec!["Images/x_2.jpg"]);
    }

    #[test]
    fn test_collision_within_plan() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        // "notes" takes Other/notes_1 before "notes_1" is planned.
        fs::write(base.join("notes"), "1").unwrap();
        fs::write(base.join("notes_1"), "2").unwrap();
        fs::create_dir(base.join("Other")).unwrap();
        fs::write(base.join("Other").join("notes"), "existing").unwrap();

        let plan = build_plan(base).unwrap();
        let dests = destinations(&plan);

        assert_eq!(dests, vec!["Other/notes_1", "Other/notes_1_1"]);
    }

    #[test]
    fn test_skips_directories_and_control_files() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("Projects")).unwrap();
        fs::create_dir(base.join("Images")).unwrap();
        fs::write(base.join("Images").join("old.png"), "old").unwrap();
        fs::write(base.join(DEFAULT_LOG_FILE), "{}").unwrap();
        fs::write(base.join(DEFAULT_REPORT_FILE), "{}").unwrap();
        fs::write(base.join("song.mp3"), "audio").unwrap();

        let plan = build_plan(base).unwrap();

        assert_eq!(destinations(&plan), vec!["Audio/song.mp3"]);
        let reasons: Vec<_> = plan.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons.iter().filter(|r| **r == SkipReason::Directory).count(),
            2
        );
        assert_eq!(
            reasons
                .iter()
                .filter(|r| **r == SkipReason::ControlFile)
                .count(),
            2
        );
    }

    #[test]
    fn test_filters_are_applied() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join(".hidden.txt"), "secret").unwrap();
        fs::write(base.join("visible.txt"), "hello").unwrap();

        let categories = CategoryMap::default();
        let filters = Config::default().compile_filters().unwrap();
        let plan = PlanBuilder::new(&categories)
            .with_filters(&filters)
            .build(base)
            .unwrap();

        assert_eq!(destinations(&plan), vec!["Documents/visible.txt"]);
        assert_eq!(plan.skipped[0].reason, SkipReason::Filtered);
    }

    #[test]
    fn test_missing_source_dir() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let result = build_plan(&missing);
        assert!(matches!(result, Err(OrganizeError::SourceNotFound { .. })));
    }

    #[test]
    fn test_source_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let result = build_plan(&file);
        assert!(matches!(result, Err(OrganizeError::SourceNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_moved() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink(base.join("real.txt"), base.join("link.txt")).unwrap();

        let plan = build_plan(base).unwrap();

        assert_eq!(destinations(&plan), vec!["Documents/real.txt"]);
        assert_eq!(plan.skipped[0].reason, SkipReason::NotRegularFile);
    }

    #[cfg(unix)]
    #[test]
    fn test_control_file_reached_through_symlink_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        let desk = temp_dir.path().join("desk");
        fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &desk).unwrap();
        fs::write(real.join("history.json"), "{}").unwrap();
        fs::write(real.join("notes.txt"), "x").unwrap();

        let categories = CategoryMap::default();
        let plan = PlanBuilder::new(&categories)
            .control_file(desk.join("history.json"))
            .build(&desk)
            .unwrap();

        assert_eq!(destinations(&plan), vec!["Documents/notes.txt"]);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, SkipReason::ControlFile);
    }

    #[test]
    fn test_control_file_not_yet_created_resolves_to_its_folder() {
        let temp_dir = TempDir::new().unwrap();
        let canonical = fs::canonicalize(temp_dir.path()).unwrap();

        assert_eq!(
            canonical_location(&temp_dir.path().join("log.json")),
            canonical.join("log.json")
        );
    }
}
