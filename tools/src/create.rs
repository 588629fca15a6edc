//! File and directory creation with overwrite semantics.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ToolError, sandbox};

/// What kind of filesystem item to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Directory,
}

impl ItemKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Directory => "directory",
        }
    }
}

/// Request to create a single file or directory.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// File content; ignored for directories. Defaults to empty.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

/// Outcome of a single creation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CreateItemResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<PathBuf>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
}

impl CreateItemResult {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            created: None,
            kind: None,
        }
    }

    fn created(message: String, path: PathBuf, kind: ItemKind) -> Self {
        Self {
            success: true,
            message,
            created: Some(path),
            kind: Some(kind),
        }
    }
}

/// Creates files and directories inside the working directory.
///
/// Stateless; every method validates paths first and performs no I/O on a
/// rejected path. Batch operations attempt every item and report each result
/// independently so the caller can tell exactly which of N items succeeded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateService;

impl CreateService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn create_item(&self, working_dir: &Path, request: &CreateItemRequest) -> CreateItemResult {
        let resolved = match sandbox::resolve(&request.path, working_dir) {
            Ok(path) => path,
            Err(err) => return CreateItemResult::failure(format!("Invalid path: {err}")),
        };

        match self.create_resolved(working_dir, &resolved, request) {
            Ok(result) => result,
            Err(err) => CreateItemResult::failure(format!(
                "Failed to create {}: {err}",
                request.kind.as_str()
            )),
        }
    }

    fn create_resolved(
        &self,
        working_dir: &Path,
        resolved: &Path,
        request: &CreateItemRequest,
    ) -> io::Result<CreateItemResult> {
        let existing = fs::symlink_metadata(resolved).ok();

        if let Some(meta) = &existing
            && !request.overwrite
        {
            let existing_kind = if meta.is_dir() { "directory" } else { "file" };
            return Ok(CreateItemResult::failure(format!(
                "{existing_kind} already exists at: {}\nWorking directory: {}\nRequested: {}\nUse overwrite to replace.",
                resolved.display(),
                working_dir.display(),
                request.path
            )));
        }

        match request.kind {
            ItemKind::Directory => {
                // Overwriting a file with a directory removes the file first;
                // creating an already-existing directory is not an error once
                // the conflict check has passed.
                if let Some(meta) = &existing
                    && !meta.is_dir()
                {
                    fs::remove_file(resolved)?;
                }
                fs::create_dir_all(resolved)?;
                tracing::info!(path = %resolved.display(), "directory created");
                Ok(CreateItemResult::created(
                    format!(
                        "Directory created successfully: {} at {}",
                        request.path,
                        resolved.display()
                    ),
                    resolved.to_path_buf(),
                    ItemKind::Directory,
                ))
            }
            ItemKind::File => {
                if let Some(parent) = resolved.parent() {
                    fs::create_dir_all(parent)?;
                }
                if let Some(meta) = &existing
                    && meta.is_dir()
                {
                    fs::remove_dir_all(resolved)?;
                }
                let content = request.content.as_deref().unwrap_or("");
                fs::write(resolved, content)?;
                tracing::info!(path = %resolved.display(), bytes = content.len(), "file created");
                let detail = if content.is_empty() {
                    " (empty)".to_string()
                } else {
                    format!(" ({} characters)", content.chars().count())
                };
                Ok(CreateItemResult::created(
                    format!(
                        "File created successfully: {} at {}{detail}",
                        request.path,
                        resolved.display()
                    ),
                    resolved.to_path_buf(),
                    ItemKind::File,
                ))
            }
        }
    }

    /// Create several items; every item is attempted regardless of earlier
    /// failures.
    pub fn create_multiple_items(
        &self,
        working_dir: &Path,
        requests: &[CreateItemRequest],
    ) -> Vec<CreateItemResult> {
        requests
            .iter()
            .map(|request| self.create_item(working_dir, request))
            .collect()
    }

    /// Create a whole scaffold from a path-to-kind mapping. Directories are
    /// created before any file (then lexicographic path order), so a file
    /// never races ahead of a parent directory listed in the same request.
    pub fn create_project_structure(
        &self,
        working_dir: &Path,
        structure: impl IntoIterator<Item = (String, ItemKind)>,
    ) -> Vec<CreateItemResult> {
        let mut requests: Vec<CreateItemRequest> = structure
            .into_iter()
            .map(|(path, kind)| CreateItemRequest {
                path,
                kind,
                content: matches!(kind, ItemKind::File).then(String::new),
                overwrite: false,
            })
            .collect();

        requests.sort_by(|a, b| {
            let rank = |kind: ItemKind| match kind {
                ItemKind::Directory => 0,
                ItemKind::File => 1,
            };
            rank(a.kind).cmp(&rank(b.kind)).then(a.path.cmp(&b.path))
        });

        self.create_multiple_items(working_dir, &requests)
    }

    /// Create several directories at once.
    pub fn create_directory_scaffold(
        &self,
        working_dir: &Path,
        paths: &[String],
    ) -> Vec<CreateItemResult> {
        let requests: Vec<CreateItemRequest> = paths
            .iter()
            .map(|path| CreateItemRequest {
                path: path.clone(),
                kind: ItemKind::Directory,
                content: None,
                overwrite: false,
            })
            .collect();
        self.create_multiple_items(working_dir, &requests)
    }

    /// Create several empty files at once; content comes later via patching.
    pub fn create_empty_files(&self, working_dir: &Path, paths: &[String]) -> Vec<CreateItemResult> {
        let requests: Vec<CreateItemRequest> = paths
            .iter()
            .map(|path| CreateItemRequest {
                path: path.clone(),
                kind: ItemKind::File,
                content: Some(String::new()),
                overwrite: false,
            })
            .collect();
        self.create_multiple_items(working_dir, &requests)
    }
}
