//! Ignore-aware substring search across the working tree.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use ignore::WalkBuilder;

use crate::ToolError;

/// Limits for a codebase search pass.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_results: usize,
    pub max_matches_per_file: usize,
    pub max_file_size_bytes: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 200,
            max_matches_per_file: 25,
            max_file_size_bytes: 2_000_000,
        }
    }
}

/// Searches file contents for a query string, honoring gitignore rules.
#[derive(Debug, Clone, Default)]
pub struct CodebaseSearch {
    config: SearchConfig,
}

impl CodebaseSearch {
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Produce a textual match report: files with line numbers and the
    /// matching line content.
    pub fn search(&self, working_dir: &Path, query: &str) -> Result<String, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::BadArgs {
                message: "query must not be empty".to_string(),
            });
        }

        let walker = WalkBuilder::new(working_dir)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut report = String::new();
        let mut total_matches = 0usize;
        let mut matched_files = 0usize;
        let mut truncated = false;

        'files: for entry in walker {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if entry
                .metadata()
                .is_ok_and(|meta| meta.len() > self.config.max_file_size_bytes)
            {
                continue;
            }
            // Binary files fail UTF-8 decoding and are skipped.
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };

            let mut file_matches = 0usize;
            for (idx, line) in content.lines().enumerate() {
                if !line.contains(query) {
                    continue;
                }
                if file_matches == 0 {
                    if matched_files > 0 {
                        report.push('\n');
                    }
                    let display = path.strip_prefix(working_dir).unwrap_or(path);
                    let _ = writeln!(report, "{}:", display.display());
                    matched_files += 1;
                }
                let _ = writeln!(report, "  {}: {}", idx + 1, line.trim_end());
                file_matches += 1;
                total_matches += 1;
                if total_matches >= self.config.max_results {
                    truncated = true;
                    break 'files;
                }
                if file_matches >= self.config.max_matches_per_file {
                    break;
                }
            }
        }

        if total_matches == 0 {
            return Ok(format!("No matches found for \"{query}\""));
        }

        let mut out = format!(
            "Found {total_matches} match(es) for \"{query}\" in {matched_files} file(s):\n\n"
        );
        out.push_str(&report);
        if truncated {
            let _ = write!(out, "\n[truncated at {} matches]", self.config.max_results);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{CodebaseSearch, SearchConfig};
    use std::fs;

    #[test]
    fn reports_matches_with_file_and_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn alpha() {}\nfn beta() {}\n").unwrap();
        fs::write(dir.path().join("b.rs"), "// beta lives here\n").unwrap();

        let search = CodebaseSearch::default();
        let report = search.search(dir.path(), "beta").unwrap();

        assert!(report.contains("a.rs:"));
        assert!(report.contains("2: fn beta() {}"));
        assert!(report.contains("b.rs:"));
        assert!(report.contains("Found 2 match(es)"));
    }

    #[test]
    fn no_matches_yields_a_readable_report() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();

        let search = CodebaseSearch::default();
        let report = search.search(dir.path(), "nonexistent_symbol").unwrap();
        assert_eq!(report, "No matches found for \"nonexistent_symbol\"");
    }

    #[test]
    fn empty_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let search = CodebaseSearch::default();
        assert!(search.search(dir.path(), "   ").is_err());
    }

    #[test]
    fn result_cap_truncates_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let body = "needle\n".repeat(50);
        fs::write(dir.path().join("big.txt"), body).unwrap();

        let search = CodebaseSearch::new(SearchConfig {
            max_results: 5,
            max_matches_per_file: 100,
            max_file_size_bytes: 2_000_000,
        });
        let report = search.search(dir.path(), "needle").unwrap();
        assert!(report.contains("[truncated at 5 matches]"));
    }
}
