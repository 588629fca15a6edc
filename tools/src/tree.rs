//! Depth-limited directory tree honoring ignore rules.

use std::fmt::Write as _;
use std::path::Path;

use ignore::WalkBuilder;

use crate::{ToolError, sandbox};

/// Default traversal depth below the root.
const DEFAULT_MAX_DEPTH: usize = 3;

/// Render an indented tree of `path` (default: the working directory) down
/// to `max_depth` levels, honoring gitignore rules.
pub fn directory_structure(
    working_dir: &Path,
    path: Option<&str>,
    max_depth: Option<usize>,
) -> Result<String, ToolError> {
    let root = match path {
        Some(raw) => sandbox::resolve(raw, working_dir)?,
        None => working_dir.to_path_buf(),
    };
    if !root.is_dir() {
        return Err(ToolError::ExecutionFailed {
            tool: "directory_structure".to_string(),
            message: format!("not a directory: {}", root.display()),
        });
    }
    let max_depth = max_depth.unwrap_or(DEFAULT_MAX_DEPTH).max(1);

    let walker = WalkBuilder::new(&root)
        .max_depth(Some(max_depth))
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(|entry| entry.file_name() != ".git")
        .sort_by_file_path(std::cmp::Ord::cmp)
        .build();

    let root_name = root
        .file_name()
        .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned());
    let mut out = format!("{root_name}/\n");
    let mut entries = 0usize;

    for entry in walker {
        let Ok(entry) = entry else { continue };
        let depth = entry.depth();
        if depth == 0 {
            continue;
        }
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        let name = entry.file_name().to_string_lossy();
        let indent = "  ".repeat(depth);
        let suffix = if is_dir { "/" } else { "" };
        let _ = writeln!(out, "{indent}{name}{suffix}");
        entries += 1;
    }

    if entries == 0 {
        out.push_str("  (empty)\n");
    }
    Ok(out)
}
