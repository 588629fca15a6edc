//! Path validation for model-supplied target paths.
//!
//! Pure and I/O-free: every path is checked and resolved lexically before any
//! service performs so much as a metadata read. Callers pass the
//! canonicalized working directory; a path that survives [`resolve`] is a
//! descendant of it.

use std::path::{Component, Path, PathBuf};

use crate::ToolError;

/// Characters rejected in the final path component.
const INVALID_BASENAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Validate a model-supplied path and resolve it under `working_dir`.
///
/// Rejects parent-directory traversal anywhere in the path, absolute paths
/// that do not land inside `working_dir`, and basenames containing
/// `< > : " | ? *`. Relative paths resolve against `working_dir`.
pub fn resolve(raw: &str, working_dir: &Path) -> Result<PathBuf, ToolError> {
    let input = Path::new(raw);

    if input
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ToolError::PathRejected {
            reason: "path cannot contain \"..\" (directory traversal)".to_string(),
        });
    }

    if let Some(name) = input.file_name().and_then(|n| n.to_str())
        && name.contains(INVALID_BASENAME_CHARS)
    {
        return Err(ToolError::PathRejected {
            reason: "filename contains invalid characters".to_string(),
        });
    }

    let resolved = if input.is_absolute() {
        normalize(input)
    } else {
        normalize(&working_dir.join(input))
    };

    if !resolved.starts_with(working_dir) {
        return Err(ToolError::PathRejected {
            reason: "path escapes the working directory".to_string(),
        });
    }

    Ok(resolved)
}

/// Lexical normalization: drops `.` components. `..` never survives to this
/// point, so no component popping is needed.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
