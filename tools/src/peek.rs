//! Surrounding-lines context reader.

use std::fs;
use std::path::Path;

use crate::{ToolError, sandbox};

/// Lines shown on each side of the target line.
const CONTEXT_RADIUS: usize = 20;

/// Report the lines surrounding `line` (1-based) in `file`, with the target
/// line marked.
pub fn code_context(working_dir: &Path, file: &str, line: usize) -> Result<String, ToolError> {
    let path = sandbox::resolve(file, working_dir)?;
    if !path.is_file() {
        return Err(ToolError::NotFound { path });
    }
    let text = fs::read_to_string(&path).map_err(|e| ToolError::ExecutionFailed {
        tool: "code_context".to_string(),
        message: format!("failed to read {file}: {e}"),
    })?;

    let lines: Vec<&str> = text.split('\n').collect();
    if line < 1 || line > lines.len() {
        return Err(ToolError::BadArgs {
            message: format!("line {line} is out of range (file has {} lines)", lines.len()),
        });
    }

    let start = line.saturating_sub(CONTEXT_RADIUS).max(1);
    let end = line.saturating_add(CONTEXT_RADIUS).min(lines.len());
    let width = end.to_string().len();

    let mut out = format!("{file} lines {start}-{end}:\n");
    for number in start..=end {
        let marker = if number == line { '>' } else { ' ' };
        out.push_str(&format!(
            "{marker}{number:>width$}: {}\n",
            lines[number - 1]
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::code_context;
    use std::fs;

    #[test]
    fn marks_the_target_line() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let body: String = (1..=60).map(|n| format!("line {n}\n")).collect();
        fs::write(root.join("big.txt"), body).unwrap();

        let report = code_context(&root, "big.txt", 30).unwrap();
        assert!(report.contains(">30: line 30"));
        assert!(report.contains(" 10: line 10"));
        assert!(report.contains(" 50: line 50"));
        assert!(!report.contains("line 9\n "));
    }

    #[test]
    fn clamps_at_file_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("small.txt"), "a\nb\nc").unwrap();

        let report = code_context(&root, "small.txt", 1).unwrap();
        assert!(report.starts_with("small.txt lines 1-3:"));
    }

    #[test]
    fn out_of_range_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("small.txt"), "a\nb").unwrap();

        assert!(code_context(&root, "small.txt", 99).is_err());
        assert!(code_context(&root, "small.txt", 0).is_err());
    }
}
