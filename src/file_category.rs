//! Extension-based file categorization.
//!
//! This module maps file extensions to broad categories (e.g. "Images",
//! "Documents"). Every category owns a folder of the same name inside the
//! organized directory. Anything not in the table lands in [`Category::Other`].
//!
//! # Examples
//!
//! ```
//! use desktidy::file_category::{Category, CategoryMap};
//!
//! let map = CategoryMap::default();
//! assert_eq!(map.classify(".png"), Category::Images);
//! assert_eq!(map.classify("TXT"), Category::Documents);
//! assert_eq!(map.classify(""), Category::Other);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Represents a broad file category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Image files (PNG, JPG, GIF, etc.)
    Images,
    /// Document files (PDF, DOCX, TXT, etc.)
    Documents,
    /// Archive files (ZIP, TAR, 7Z, etc.)
    Archives,
    /// Source code and markup (Python, JavaScript, HTML, etc.)
    Code,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Video files (MP4, MKV, MOV, etc.)
    Video,
    /// Unknown or extensionless files
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 7] = [
        Category::Images,
        Category::Documents,
        Category::Archives,
        Category::Code,
        Category::Audio,
        Category::Video,
        Category::Other,
    ];

    /// Returns the folder name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use desktidy::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "Images");
    /// assert_eq!(Category::Other.dir_name(), "Other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Documents => "Documents",
            Category::Archives => "Archives",
            Category::Code => "Code",
            Category::Audio => "Audio",
            Category::Video => "Video",
            Category::Other => "Other",
        }
    }

    /// Looks up a category by its folder name, ignoring case.
    ///
    /// ```
    /// use desktidy::file_category::Category;
    ///
    /// assert_eq!(Category::from_dir_name("images"), Some(Category::Images));
    /// assert_eq!(Category::from_dir_name("Downloads"), None);
    /// ```
    pub fn from_dir_name(name: &str) -> Option<Category> {
        Self::ALL
            .into_iter()
            .find(|c| c.dir_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Normalizes an extension: lowercase, no leading dot.
fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// Maps file extensions to categories.
///
/// Built once at startup from the standard table plus any configured
/// overrides, then only read.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    extension_map: HashMap<String, Category>,
}

impl CategoryMap {
    /// Creates a new `CategoryMap` with the standard mappings.
    pub fn new() -> Self {
        let mut map = Self {
            extension_map: HashMap::new(),
        };
        map.populate_standard_mappings();
        map
    }

    /// Creates the standard map with additional extension mappings layered on top.
    ///
    /// Overrides are applied in order, so a later entry can move a standard
    /// extension into another category.
    pub fn with_overrides(overrides: &[(Category, Vec<String>)]) -> Self {
        let mut map = Self::new();
        for (category, extensions) in overrides {
            for ext in extensions {
                map.add_extension_mapping(ext, *category);
            }
        }
        map
    }

    fn populate_standard_mappings(&mut self) {
        const STANDARD: &[(Category, &[&str])] = &[
            (
                Category::Images,
                &["png", "jpg", "jpeg", "gif", "bmp", "svg", "webp"],
            ),
            (
                Category::Documents,
                &["pdf", "docx", "doc", "xlsx", "xls", "pptx", "txt", "md"],
            ),
            (Category::Archives, &["zip", "tar", "gz", "rar", "7z"]),
            (
                Category::Code,
                &[
                    "py", "js", "ts", "java", "c", "cpp", "h", "html", "css", "json",
                ],
            ),
            (Category::Audio, &["mp3", "wav", "flac", "aac"]),
            (Category::Video, &["mp4", "mkv", "mov", "avi"]),
        ];

        for (category, extensions) in STANDARD {
            for ext in *extensions {
                self.add_extension_mapping(ext, *category);
            }
        }
    }

    fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        let ext = normalize_extension(ext);
        if !ext.is_empty() {
            self.extension_map.insert(ext, category);
        }
    }

    /// Maps a file extension to its category.
    ///
    /// Accepts extensions with or without the leading dot, in any case.
    /// Unknown and empty extensions map to [`Category::Other`].
    ///
    /// # Examples
    ///
    /// ```
    /// use desktidy::file_category::{Category, CategoryMap};
    ///
    /// let map = CategoryMap::default();
    /// assert_eq!(map.classify(".JPEG"), Category::Images);
    /// assert_eq!(map.classify("xyz"), Category::Other);
    /// ```
    pub fn classify(&self, extension: &str) -> Category {
        self.extension_map
            .get(&normalize_extension(extension))
            .copied()
            .unwrap_or(Category::Other)
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::new()
    }
}
