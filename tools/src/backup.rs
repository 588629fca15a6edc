//! Byte-identical file snapshots backing the patch engine.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ToolError;

/// Creates and restores byte-identical snapshots of single files.
///
/// The backup directory is injected at construction so tests can point it at
/// a temporary directory; production uses [`BackupStore::default_dir`].
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default per-user backup directory: `~/.spectre/backups`.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".spectre")
            .join("backups")
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot `file` into the backup directory.
    ///
    /// The directory is created lazily on first use. Names follow
    /// `<basename>.backup-<timestamp>`; if a second snapshot of the same file
    /// lands on the same millisecond a numeric suffix keeps the name unique.
    pub fn create_backup(&self, file: &Path) -> Result<PathBuf, ToolError> {
        fs::create_dir_all(&self.dir).map_err(|e| ToolError::ExecutionFailed {
            tool: "backup".to_string(),
            message: format!(
                "failed to create backup directory {}: {e}",
                self.dir.display()
            ),
        })?;

        let basename = file
            .file_name()
            .map_or_else(|| "unnamed".to_string(), |n| n.to_string_lossy().into_owned());
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
        let mut candidate = self.dir.join(format!("{basename}.backup-{timestamp}"));
        let mut counter = 1u32;
        while candidate.exists() {
            candidate = self
                .dir
                .join(format!("{basename}.backup-{timestamp}-{counter}"));
            counter += 1;
        }

        fs::copy(file, &candidate).map_err(|e| ToolError::ExecutionFailed {
            tool: "backup".to_string(),
            message: format!("failed to back up {}: {e}", file.display()),
        })?;
        tracing::debug!(file = %file.display(), backup = %candidate.display(), "backup created");
        Ok(candidate)
    }

    /// Copy `backup` back over `original`, byte for byte.
    pub fn restore(&self, backup: &Path, original: &Path) -> Result<(), ToolError> {
        if !backup.is_file() {
            return Err(ToolError::NotFound {
                path: backup.to_path_buf(),
            });
        }
        fs::copy(backup, original).map_err(|e| ToolError::ExecutionFailed {
            tool: "backup".to_string(),
            message: format!("failed to restore {}: {e}", original.display()),
        })?;
        tracing::debug!(backup = %backup.display(), original = %original.display(), "restored from backup");
        Ok(())
    }

    /// Remove a backup file.
    ///
    /// Used by explicit rollback after a successful restore. The patch
    /// engine's own failure recovery never discards: the backup stays so a
    /// later rollback remains possible.
    pub fn discard(&self, backup: &Path) -> Result<(), ToolError> {
        fs::remove_file(backup).map_err(|e| ToolError::ExecutionFailed {
            tool: "backup".to_string(),
            message: format!("failed to remove backup {}: {e}", backup.display()),
        })
    }

    /// Whether `path` points into this store's directory.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::BackupStore;
    use crate::ToolError;
    use std::fs;

    #[test]
    fn backup_then_restore_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("data.bin");
        let payload = b"line one\nline two\n\xf0\x9f\x92\xbe";
        fs::write(&file, payload).unwrap();

        let backup = store.create_backup(&file).unwrap();
        fs::write(&file, "clobbered").unwrap();
        store.restore(&backup, &file).unwrap();

        assert_eq!(fs::read(&file).unwrap(), payload);
    }

    #[test]
    fn backup_directory_is_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let backups = dir.path().join("nested").join("backups");
        let store = BackupStore::new(backups.clone());
        assert!(!backups.exists());

        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();
        store.create_backup(&file).unwrap();
        assert!(backups.is_dir());
    }

    #[test]
    fn repeated_backups_of_one_file_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();

        let first = store.create_backup(&file).unwrap();
        let second = store.create_backup(&file).unwrap();
        let third = store.create_backup(&file).unwrap();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(first.is_file() && second.is_file() && third.is_file());
    }

    #[test]
    fn backup_names_carry_the_original_basename() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("main.rs");
        fs::write(&file, "fn main() {}").unwrap();

        let backup = store.create_backup(&file).unwrap();
        let name = backup.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("main.rs.backup-"), "got {name}");
    }

    #[test]
    fn restore_of_missing_backup_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let err = store
            .restore(&dir.path().join("ghost"), &dir.path().join("a.txt"))
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[test]
    fn discard_removes_the_backup_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();

        let backup = store.create_backup(&file).unwrap();
        store.discard(&backup).unwrap();
        assert!(!backup.exists());
    }
}
