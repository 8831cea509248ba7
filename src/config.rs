//! Configuration loading and file filtering.
//!
//! Configuration is optional TOML. Every section has defaults, so an empty
//! file (or no file at all) is valid:
//!
//! ```toml
//! [files]
//! log = ".desktidy_log.json"
//! report = "desktidy_report.json"
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db", "desktop.ini"]
//! patterns = ["*.part", "~$*"]
//! extensions = ["tmp", "crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [categories]
//! Images = ["heic", "tiff"]
//! Code = ["rs", "toml"]
//! ```
//!
//! Relative `files` paths are resolved against the directory being organized,
//! which keeps one ledger per directory.

use crate::file_category::{Category, CategoryMap};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file looked up in the working directory.
pub const LOCAL_CONFIG_NAME: &str = ".desktidyrc.toml";

/// Default ledger file name, relative to the organized directory.
pub const DEFAULT_LOG_FILE: &str = ".desktidy_log.json";

/// Default report file name, relative to the organized directory.
pub const DEFAULT_REPORT_FILE: &str = "desktidy_report.json";

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration in {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("Unknown category '{0}' in [categories]")]
    UnknownCategory(String),

    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub files: FileNames,

    #[serde(default)]
    pub filters: FilterRules,

    /// Extra extension mappings keyed by category folder name.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

/// Locations of the files this tool keeps next to the organized files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNames {
    #[serde(default = "default_log_file")]
    pub log: PathBuf,

    #[serde(default = "default_report_file")]
    pub report: PathBuf,
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_report_file() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_FILE)
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            log: default_log_file(),
            report: default_report_file(),
        }
    }
}

/// Filter rules deciding which files are left where they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files starting with "." are organized. Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist that overrides every exclude rule.
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    #[serde(default)]
    pub filenames: Vec<String>,

    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions without the dot, matched case-insensitively.
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Absolute locations of the ledger and report for one organized directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub ledger: PathBuf,
    pub report: PathBuf,
}

impl Config {
    /// Load configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given (must exist)
    /// 2. `.desktidyrc.toml` in the current directory
    /// 3. `~/.config/desktidy/config.toml`
    /// 4. built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("desktidy")
                .join("config.toml");
            if home_config.is_file() {
                return Self::load_from_file(&home_config);
            }
        }

        log::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_toml(&content).map_err(|reason| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Compile filter rules into matchers.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }

    /// Build the extension table, applying `[categories]` overrides.
    pub fn category_map(&self) -> Result<CategoryMap, ConfigError> {
        let overrides = self
            .categories
            .iter()
            .map(|(name, extensions)| {
                Category::from_dir_name(name)
                    .map(|category| (category, extensions.clone()))
                    .ok_or_else(|| ConfigError::UnknownCategory(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CategoryMap::with_overrides(&overrides))
    }

    /// Resolve ledger and report locations for `source_dir`.
    pub fn state_paths(&self, source_dir: &Path) -> StatePaths {
        StatePaths {
            ledger: source_dir.join(&self.files.log),
            report: source_dir.join(&self.files.report),
        }
    }
}

/// Filter rules with patterns pre-compiled for matching.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Check whether a file name should be organized.
    ///
    /// Include patterns win; otherwise hidden files, exact names, extensions,
    /// glob patterns and regexes are checked in that order.
    pub fn should_include(&self, file_name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(file_name)) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name) {
            return false;
        }

        if let Some(ext) = Path::new(file_name).extension()
            && self
                .exclude_extensions
                .contains(&ext.to_string_lossy().to_lowercase())
        {
            return false;
        }

        if self.exclude_patterns.iter().any(|p| p.matches(file_name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters_with(exclude: ExcludeRules) -> CompiledFilters {
        let config = Config {
            filters: FilterRules {
                enable_hidden_files: true,
                exclude,
                include: IncludeRules::default(),
            },
            ..Default::default()
        };
        config.compile_filters().unwrap()
    }

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert!(!config.filters.enable_hidden_files);
        assert_eq!(config.files.log, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.files.report, PathBuf::from(DEFAULT_REPORT_FILE));
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.files.log, PathBuf::from(DEFAULT_LOG_FILE));
        assert!(!config.filters.enable_hidden_files);
    }

    #[test]
    fn test_parse_full_toml() {
        let config = Config::from_toml(
            r#"
            [files]
            log = "history.json"

            [filters]
            enable_hidden_files = true

            [filters.exclude]
            extensions = ["tmp"]

            [categories]
            Images = ["heic"]
            "#,
        )
        .unwrap();

        assert_eq!(config.files.log, PathBuf::from("history.json"));
        assert_eq!(config.files.report, PathBuf::from(DEFAULT_REPORT_FILE));
        assert!(config.filters.enable_hidden_files);
        assert_eq!(config.filters.exclude.extensions, vec!["tmp"]);

        let map = config.category_map().unwrap();
        assert_eq!(map.classify(".heic"), Category::Images);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(Config::from_toml("[filters\nenable_hidden_files = 1").is_err());
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let config = Config::from_toml("[categories]\nPictures = [\"png\"]").unwrap();
        assert!(matches!(
            config.category_map(),
            Err(ConfigError::UnknownCategory(name)) if name == "Pictures"
        ));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let result = Config::load(Some(Path::new("/no/such/desktidy.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_state_paths_resolve_relative_to_source() {
        let config = Config::default();
        let paths = config.state_paths(Path::new("/home/user/Desktop"));
        assert_eq!(
            paths.ledger,
            PathBuf::from("/home/user/Desktop/.desktidy_log.json")
        );
        assert_eq!(
            paths.report,
            PathBuf::from("/home/user/Desktop/desktidy_report.json")
        );
    }

    #[test]
    fn test_hidden_files_excluded_by_default() {
        let compiled = Config::default().compile_filters().unwrap();
        assert!(!compiled.should_include(".DS_Store"));
        assert!(compiled.should_include("notes.txt"));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = filters_with(ExcludeRules {
            filenames: vec!["desktop.ini".to_string()],
            ..Default::default()
        });
        assert!(!compiled.should_include("desktop.ini"));
        assert!(compiled.should_include("desktop.ini.bak"));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let compiled = filters_with(ExcludeRules {
            extensions: vec![".crdownload".to_string(), "tmp".to_string()],
            ..Default::default()
        });
        assert!(!compiled.should_include("movie.mp4.crdownload"));
        assert!(!compiled.should_include("scratch.TMP"));
        assert!(compiled.should_include("movie.mp4"));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let compiled = filters_with(ExcludeRules {
            patterns: vec!["*.part".to_string(), "~$*".to_string()],
            ..Default::default()
        });
        assert!(!compiled.should_include("video.mkv.part"));
        assert!(!compiled.should_include("~$report.docx"));
        assert!(compiled.should_include("report.docx"));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = filters_with(ExcludeRules {
            regex: vec![r"^Screenshot \d{4}".to_string()],
            ..Default::default()
        });
        assert!(!compiled.should_include("Screenshot 2024-01-01.png"));
        assert!(compiled.should_include("photo.png"));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let config = Config {
            filters: FilterRules {
                enable_hidden_files: false,
                exclude: ExcludeRules {
                    extensions: vec!["log".to_string()],
                    ..Default::default()
                },
                include: IncludeRules {
                    patterns: vec![".keep*".to_string(), "build.log".to_string()],
                },
            },
            ..Default::default()
        };
        let compiled = config.compile_filters().unwrap();

        assert!(compiled.should_include(".keepme"));
        assert!(compiled.should_include("build.log"));
        assert!(!compiled.should_include("other.log"));
        assert!(!compiled.should_include(".hidden"));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = Config {
            filters: FilterRules {
                exclude: ExcludeRules {
                    regex: vec!["[invalid(".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            bad_regex.compile_filters(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = Config {
            filters: FilterRules {
                exclude: ExcludeRules {
                    patterns: vec!["[unclosed".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            bad_glob.compile_filters(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }
}
