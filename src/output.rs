//! Output formatting and styling.
//!
//! All human-readable CLI output goes through [`OutputFormatter`] so that
//! colors and symbols are consistent. Machine-readable output (`--json`)
//! bypasses it entirely.

use crate::file_category::Category;
use crate::planner::MoveOperation;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use desktidy::output::OutputFormatter;
    /// OutputFormatter::success("Moved 3 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints one planned move as `name -> Category/new_name`.
    pub fn move_line(op: &MoveOperation, source_dir: &Path) {
        let from = op
            .source
            .strip_prefix(source_dir)
            .unwrap_or(&op.source)
            .display()
            .to_string();
        let to = op
            .destination
            .strip_prefix(source_dir)
            .unwrap_or(&op.destination)
            .display()
            .to_string();
        println!(" - {} {} {}", from, "→".dimmed(), to.cyan());
    }

    /// Creates a progress bar for applying `total` moves.
    ///
    /// Falls back to the default bar style if the template is rejected.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a table of file counts per category.
    pub fn summary_table(operations: &[MoveOperation]) {
        let mut category_counts: BTreeMap<Category, usize> = BTreeMap::new();
        for op in operations {
            *category_counts.entry(op.category).or_insert(0) += 1;
        }

        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(|category| category.dir_name().len())
            .max()
            .unwrap_or(0)
            .max("Category".len());

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in &category_counts {
            println!(
                "{:<width$} | {} {}",
                category.dir_name(),
                count.to_string().green(),
                Self::files_word(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            operations.len().to_string().green().bold(),
            Self::files_word(operations.len()),
            width = width
        );
    }

    fn files_word(count: usize) -> &'static str {
        if count == 1 { "file" } else { "files" }
    }
}
