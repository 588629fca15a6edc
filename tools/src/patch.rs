//! Line-based patch engine with backup and restore-on-failure.
//!
//! A patch request is validated as a whole against the file's current line
//! count before anything is touched; mutation happens only after a backup is
//! durably written, and any application failure restores the original bytes
//! before the call returns. The file on disk is never observably
//! inconsistent.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backup::BackupStore;
use crate::sandbox;

/// Edit action for a single change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchAction {
    Replace,
    Insert,
    Delete,
}

impl PatchAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PatchAction::Replace => "replace",
            PatchAction::Insert => "insert",
            PatchAction::Delete => "delete",
        }
    }
}

/// One line-range edit.
///
/// Line numbers are 1-based. `line_end` defaults to `line_start` for
/// replace/delete and is ignored for insert. `content` is required for
/// replace/insert and forbidden for delete; embedded `\n` expands into
/// multiple lines at the target position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchChange {
    pub action: PatchAction,
    pub line_start: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PatchChange {
    /// Effective end of the edited range.
    fn effective_end(&self) -> usize {
        self.line_end.unwrap_or(self.line_start)
    }

    fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A full patch request: one file, an ordered set of changes.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRequest {
    pub file: String,
    pub changes: Vec<PatchChange>,
}

/// Outcome of a patch application.
#[derive(Debug)]
pub struct PatchResult {
    pub success: bool,
    pub message: String,
    /// Present iff a backup was written, i.e. validation passed.
    pub backup_path: Option<PathBuf>,
    pub applied_changes: usize,
    pub failed_changes: Vec<PatchChange>,
}

impl PatchResult {
    /// A request rejected before any mutation: no backup, nothing applied.
    fn rejected(message: String, changes: &[PatchChange]) -> Self {
        Self {
            success: false,
            message,
            backup_path: None,
            applied_changes: 0,
            failed_changes: changes.to_vec(),
        }
    }
}

/// Outcome of an explicit rollback.
#[derive(Debug, Serialize)]
pub struct RollbackResult {
    pub success: bool,
    pub message: String,
}

/// Applies validated line edits to files, with a backup per application.
#[derive(Debug, Clone)]
pub struct PatchEngine {
    backups: BackupStore,
}

impl PatchEngine {
    #[must_use]
    pub fn new(backups: BackupStore) -> Self {
        Self { backups }
    }

    #[must_use]
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Apply a patch request.
    ///
    /// Every failure mode comes back inside the [`PatchResult`]; this never
    /// returns an error and never leaves the target half-patched.
    pub fn apply(&self, working_dir: &Path, request: &PatchRequest) -> PatchResult {
        let path = match sandbox::resolve(&request.file, working_dir) {
            Ok(path) => path,
            Err(err) => {
                return PatchResult::rejected(format!("Invalid path: {err}"), &request.changes);
            }
        };

        if !path.is_file() {
            return PatchResult::rejected(
                format!("File does not exist: {}", request.file),
                &request.changes,
            );
        }

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                return PatchResult::rejected(
                    format!("Failed to read {}: {err}", request.file),
                    &request.changes,
                );
            }
        };

        // Split on '\n' rather than lines(): the trailing segment after a
        // final newline is addressable, and an empty file is one empty line.
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let total_lines = lines.len();

        let errors = validate_changes(&request.changes, total_lines);
        if !errors.is_empty() {
            return PatchResult::rejected(
                format!("Validation failed:\n{}", errors.join("\n")),
                &request.changes,
            );
        }

        let backup_path = match self.backups.create_backup(&path) {
            Ok(backup) => backup,
            Err(err) => {
                return PatchResult::rejected(
                    format!("Failed to create backup: {err}"),
                    &request.changes,
                );
            }
        };

        let failed_changes = apply_changes(&mut lines, &request.changes);

        if failed_changes.is_empty() {
            if let Err(err) = fs::write(&path, lines.join("\n")) {
                return self.restore_after_failure(
                    &path,
                    backup_path,
                    format!("Failed to write {}: {err}.", request.file),
                    request.changes.clone(),
                );
            }
            let applied = request.changes.len();
            tracing::info!(file = %path.display(), changes = applied, "patch applied");
            PatchResult {
                success: true,
                message: format!("Successfully applied {applied} changes to {}", request.file),
                backup_path: Some(backup_path),
                applied_changes: applied,
                failed_changes: Vec::new(),
            }
        } else {
            self.restore_after_failure(
                &path,
                backup_path,
                format!(
                    "Patch failed. {} changes could not be applied.",
                    failed_changes.len()
                ),
                failed_changes,
            )
        }
    }

    /// Restore `original` from `backup`, then delete the backup (one-shot:
    /// a backup can be rolled back at most once).
    pub fn rollback(&self, backup: &Path, original: &Path) -> RollbackResult {
        if !self.backups.contains(backup) {
            return RollbackResult {
                success: false,
                message: format!(
                    "Not a backup file: {} (outside {})",
                    backup.display(),
                    self.backups.dir().display()
                ),
            };
        }
        if let Err(err) = self.backups.restore(backup, original) {
            return RollbackResult {
                success: false,
                message: format!("Rollback failed: {err}"),
            };
        }
        if let Err(err) = self.backups.discard(backup) {
            tracing::warn!(backup = %backup.display(), %err, "restored but failed to remove backup");
        }
        tracing::info!(file = %original.display(), "rolled back from backup");
        RollbackResult {
            success: true,
            message: format!("Successfully rolled back {} from backup", original.display()),
        }
    }

    /// Undo a partial application so the on-disk file matches its pre-patch
    /// bytes. The backup is kept for a later explicit rollback.
    fn restore_after_failure(
        &self,
        path: &Path,
        backup_path: PathBuf,
        mut message: String,
        failed_changes: Vec<PatchChange>,
    ) -> PatchResult {
        match self.backups.restore(&backup_path, path) {
            Ok(()) => message.push_str(" File restored from backup."),
            Err(err) => {
                tracing::error!(file = %path.display(), %err, "failed to restore after patch failure");
                message.push_str(&format!(" Restore from backup ALSO failed: {err}"));
            }
        }
        PatchResult {
            success: false,
            message,
            backup_path: Some(backup_path),
            applied_changes: 0,
            failed_changes,
        }
    }
}

/// Validate one change against the pre-edit line count.
fn validate_change(change: &PatchChange, total_lines: usize) -> Option<String> {
    if change.line_start < 1 || change.line_start > total_lines + 1 {
        return Some(format!(
            "Invalid lineStart: {}. Must be between 1 and {}",
            change.line_start,
            total_lines + 1
        ));
    }

    if matches!(change.action, PatchAction::Replace | PatchAction::Delete) {
        let end = change.effective_end();
        if end < change.line_start {
            return Some(format!(
                "Invalid range: lineEnd ({end}) must be >= lineStart ({})",
                change.line_start
            ));
        }
        if end > total_lines {
            return Some(format!("Invalid lineEnd: {end}. Must be <= {total_lines}"));
        }
    }

    match change.action {
        PatchAction::Delete => {
            if !change.content_str().is_empty() {
                return Some("Delete operation should not have content".to_string());
            }
        }
        PatchAction::Replace | PatchAction::Insert => {
            if change.content_str().is_empty() {
                return Some(format!("{} operation requires content", change.action.as_str()));
            }
        }
    }

    None
}

/// Validate the whole request; all errors are reported, not just the first.
fn validate_changes(changes: &[PatchChange], total_lines: usize) -> Vec<String> {
    changes
        .iter()
        .enumerate()
        .filter_map(|(idx, change)| {
            validate_change(change, total_lines).map(|err| format!("Change {}: {err}", idx + 1))
        })
        .collect()
}

/// Apply validated changes against the in-memory line buffer, returning the
/// changes that could not be spliced.
///
/// Changes are applied in descending `line_start` order. Each splice only
/// shifts lines at or after its own start, so edits at higher line numbers
/// never invalidate the line numbers of edits still to come; ascending order
/// would drift every reference after the first insert or delete. Overlapping
/// ranges are unsupported input: whichever splice runs first wins and a later
/// change whose own range has become invalid fails individually.
fn apply_changes(lines: &mut Vec<String>, changes: &[PatchChange]) -> Vec<PatchChange> {
    let mut ordered: Vec<&PatchChange> = changes.iter().collect();
    ordered.sort_by(|a, b| b.line_start.cmp(&a.line_start));

    let mut failed = Vec::new();
    for change in ordered {
        if !splice(lines, change) {
            failed.push(change.clone());
        }
    }
    failed
}

/// Returns false when the splice would run out of range. Defensive: cannot
/// happen for a validated request with disjoint ranges, but covers ranges
/// invalidated by a prior in-memory edit.
fn splice(lines: &mut Vec<String>, change: &PatchChange) -> bool {
    if change.line_start == 0 {
        return false;
    }
    let start = change.line_start - 1;

    match change.action {
        PatchAction::Replace => {
            let count = change.effective_end() - change.line_start + 1;
            if start + count > lines.len() {
                return false;
            }
            lines.splice(
                start..start + count,
                change.content_str().split('\n').map(str::to_string),
            );
        }
        PatchAction::Insert => {
            if start > lines.len() {
                return false;
            }
            lines.splice(
                start..start,
                change.content_str().split('\n').map(str::to_string),
            );
        }
        PatchAction::Delete => {
            let count = change.effective_end() - change.line_start + 1;
            if start + count > lines.len() {
                return false;
            }
            lines.drain(start..start + count);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{PatchAction, PatchChange, PatchEngine, PatchRequest};
    use crate::ToolError;
    use crate::backup::BackupStore;
    use std::fs;
    use std::path::PathBuf;

    fn change(
        action: PatchAction,
        line_start: usize,
        line_end: Option<usize>,
        content: Option<&str>,
    ) -> PatchChange {
        PatchChange {
            action,
            line_start,
            line_end,
            content: content.map(str::to_string),
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        engine: PatchEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().canonicalize().unwrap();
            let engine = PatchEngine::new(BackupStore::new(root.join(".backups")));
            Self {
                _dir: dir,
                root,
                engine,
            }
        }

        fn write(&self, name: &str, lines: &[&str]) -> PathBuf {
            let path = self.root.join(name);
            fs::write(&path, lines.join("\n")).unwrap();
            path
        }

        fn read_lines(&self, name: &str) -> Vec<String> {
            fs::read_to_string(self.root.join(name))
                .unwrap()
                .split('\n')
                .map(str::to_string)
                .collect()
        }

        fn apply(&self, file: &str, changes: Vec<PatchChange>) -> super::PatchResult {
            self.engine.apply(
                &self.root,
                &PatchRequest {
                    file: file.to_string(),
                    changes,
                },
            )
        }
    }

    #[test]
    fn replace_single_line() {
        let fx = Fixture::new();
        fx.write("f.txt", &["a", "b", "c"]);

        let result = fx.apply(
            "f.txt",
            vec![change(PatchAction::Replace, 2, Some(2), Some("B"))],
        );

        assert!(result.success, "{}", result.message);
        assert_eq!(result.applied_changes, 1);
        assert_eq!(fx.read_lines("f.txt"), ["a", "B", "c"]);
    }

    #[test]
    fn insert_past_last_line_appends() {
        let fx = Fixture::new();
        fx.write("f.txt", &["x"]);

        let result = fx.apply("f.txt", vec![change(PatchAction::Insert, 2, None, Some("y"))]);

        assert!(result.success);
        assert_eq!(fx.read_lines("f.txt"), ["x", "y"]);
    }

    #[test]
    fn insert_two_past_the_end_is_rejected() {
        let fx = Fixture::new();
        fx.write("f.txt", &["x"]);

        let result = fx.apply("f.txt", vec![change(PatchAction::Insert, 3, None, Some("y"))]);

        assert!(!result.success);
        assert!(result.backup_path.is_none());
        assert!(result.message.contains("Invalid lineStart: 3"));
        assert_eq!(fx.read_lines("f.txt"), ["x"]);
    }

    #[test]
    fn delete_a_range() {
        let fx = Fixture::new();
        fx.write("f.txt", &["one", "two", "three", "four"]);

        let result = fx.apply("f.txt", vec![change(PatchAction::Delete, 2, Some(3), None)]);

        assert!(result.success);
        assert_eq!(fx.read_lines("f.txt"), ["one", "four"]);
    }

    #[test]
    fn multiline_content_expands_at_target() {
        let fx = Fixture::new();
        fx.write("f.txt", &["a", "b"]);

        let result = fx.apply(
            "f.txt",
            vec![change(PatchAction::Replace, 2, None, Some("b1\nb2\nb3"))],
        );

        assert!(result.success);
        assert_eq!(fx.read_lines("f.txt"), ["a", "b1", "b2", "b3"]);
    }

    #[test]
    fn changes_are_applied_in_descending_order() {
        let fx = Fixture::new();
        fx.write("f.txt", &["1", "2", "3", "4", "5"]);

        // Submitted ascending: an insert at line 2 plus a replace of line 4.
        // Line 4 refers to the original numbering, so the engine must splice
        // top-down for both to land.
        let result = fx.apply(
            "f.txt",
            vec![
                change(PatchAction::Insert, 2, None, Some("1.5")),
                change(PatchAction::Replace, 4, None, Some("FOUR")),
            ],
        );

        assert!(result.success);
        assert_eq!(result.applied_changes, 2);
        assert_eq!(fx.read_lines("f.txt"), ["1", "1.5", "2", "3", "FOUR", "5"]);
    }

    #[test]
    fn empty_file_counts_as_one_line() {
        let fx = Fixture::new();
        fx.write("f.txt", &[""]);

        let result = fx.apply(
            "f.txt",
            vec![change(PatchAction::Insert, 1, None, Some("first"))],
        );

        assert!(result.success);
        assert_eq!(fx.read_lines("f.txt"), ["first", ""]);
    }

    #[test]
    fn missing_file_reports_not_found_without_backup() {
        let fx = Fixture::new();

        let result = fx.apply(
            "ghost.txt",
            vec![change(PatchAction::Insert, 1, None, Some("x"))],
        );

        assert!(!result.success);
        assert!(result.message.contains("File does not exist"));
        assert!(result.backup_path.is_none());
        assert_eq!(result.failed_changes.len(), 1);
    }

    #[test]
    fn traversal_path_is_rejected_before_io() {
        let fx = Fixture::new();

        let result = fx.apply(
            "../etc/passwd",
            vec![change(PatchAction::Insert, 1, None, Some("x"))],
        );

        assert!(!result.success);
        assert!(result.message.contains("Invalid path"));
        assert!(result.backup_path.is_none());
    }

    #[test]
    fn all_validation_errors_are_reported_together() {
        let fx = Fixture::new();
        fx.write("f.txt", &["a", "b"]);

        let result = fx.apply(
            "f.txt",
            vec![
                change(PatchAction::Replace, 1, Some(9), Some("x")),
                change(PatchAction::Delete, 2, None, Some("forbidden")),
                change(PatchAction::Insert, 2, None, None),
            ],
        );

        assert!(!result.success);
        assert!(result.message.contains("Change 1: Invalid lineEnd: 9"));
        assert!(result.message.contains("Change 2: Delete operation should not have content"));
        assert!(result.message.contains("Change 3: insert operation requires content"));
        // No mutation, no backup.
        assert!(result.backup_path.is_none());
        assert_eq!(fx.read_lines("f.txt"), ["a", "b"]);
        assert!(!fx.engine.backups().dir().exists());
    }

    #[test]
    fn delete_tolerates_explicit_empty_content() {
        let fx = Fixture::new();
        fx.write("f.txt", &["a", "b"]);

        let result = fx.apply("f.txt", vec![change(PatchAction::Delete, 2, None, Some(""))]);

        assert!(result.success);
        assert_eq!(fx.read_lines("f.txt"), ["a"]);
    }

    #[test]
    fn overlapping_ranges_restore_the_original_file() {
        let fx = Fixture::new();
        fx.write("f.txt", &["a", "b", "c"]);

        // Both validate against the original three lines, but the delete of
        // lines 2-3 runs first (descending) and shrinks the buffer, so the
        // replace of 1-3 can no longer be spliced. The engine must put the
        // original bytes back and report only the failing change.
        let result = fx.apply(
            "f.txt",
            vec![
                change(PatchAction::Replace, 1, Some(3), Some("X")),
                change(PatchAction::Delete, 2, Some(3), None),
            ],
        );

        assert!(!result.success);
        assert_eq!(result.applied_changes, 0);
        assert_eq!(result.failed_changes.len(), 1);
        assert_eq!(result.failed_changes[0].action, PatchAction::Replace);
        assert_eq!(fx.read_lines("f.txt"), ["a", "b", "c"]);
        // The backup is kept for a later explicit rollback.
        let backup = result.backup_path.expect("backup path");
        assert!(backup.is_file());
    }

    #[test]
    fn successful_patch_keeps_its_backup_for_rollback() {
        let fx = Fixture::new();
        let original = fx.write("f.txt", &["old"]);

        let result = fx.apply(
            "f.txt",
            vec![change(PatchAction::Replace, 1, None, Some("new"))],
        );
        assert!(result.success);
        let backup = result.backup_path.expect("backup path");
        assert!(backup.is_file());

        let rollback = fx.engine.rollback(&backup, &original);
        assert!(rollback.success, "{}", rollback.message);
        assert_eq!(fx.read_lines("f.txt"), ["old"]);
        // One-shot: the backup is gone, a second rollback fails.
        assert!(!backup.exists());
        let again = fx.engine.rollback(&backup, &original);
        assert!(!again.success);
        assert!(again.message.contains("Not found"));
    }

    #[test]
    fn rollback_rejects_paths_outside_the_store() {
        let fx = Fixture::new();
        let original = fx.write("f.txt", &["keep"]);
        let stray = fx.write("stray.txt", &["not a backup"]);

        let result = fx.engine.rollback(&stray, &original);
        assert!(!result.success);
        assert!(result.message.contains("Not a backup file"));
        assert_eq!(fx.read_lines("f.txt"), ["keep"]);
    }

    #[test]
    fn trailing_newline_is_preserved_through_a_patch() {
        let fx = Fixture::new();
        let path = fx.root.join("f.txt");
        fs::write(&path, "a\nb\n").unwrap();

        // Three addressable lines: "a", "b", "".
        let result = fx.apply(
            "f.txt",
            vec![change(PatchAction::Replace, 2, None, Some("B"))],
        );

        assert!(result.success);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nB\n");
    }

    #[test]
    fn not_found_error_mentions_the_backup_path() {
        let fx = Fixture::new();
        let store = fx.engine.backups();
        let missing = store.dir().join("nope.backup-x");
        let err = store.restore(&missing, &fx.root.join("f.txt")).unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
