//! Built-in tool executors and their model-facing schemas.
//!
//! Tool names and parameter shapes are the wire contract the model sees;
//! descriptions tell it when to reach for each operation. Enforcement lives
//! in the services, not in these schemas.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::backup::BackupStore;
use crate::create::{CreateItemRequest, CreateService, ItemKind};
use crate::patch::{PatchEngine, PatchRequest, PatchResult};
use crate::search::CodebaseSearch;
use crate::{ToolCtx, ToolError, ToolExecutor, ToolRegistry, parse_args, peek, tree};

/// Register the full tool vocabulary against one backup store.
pub fn register_builtins(
    registry: &mut ToolRegistry,
    backups: BackupStore,
) -> Result<(), ToolError> {
    let engine = PatchEngine::new(backups);
    registry.register(Box::new(SearchCodebaseTool::default()))?;
    registry.register(Box::new(CodeContextTool))?;
    registry.register(Box::new(PatchFileTool {
        engine: engine.clone(),
    }))?;
    registry.register(Box::new(RollbackPatchTool { engine }))?;
    registry.register(Box::new(DirectoryStructureTool))?;
    registry.register(Box::new(CreateItemTool::default()))?;
    registry.register(Box::new(CreateMultipleItemsTool::default()))?;
    registry.register(Box::new(CreateProjectStructureTool::default()))?;
    registry.register(Box::new(CreateDirectoryScaffoldTool::default()))?;
    registry.register(Box::new(CreateEmptyFilesTool::default()))?;
    Ok(())
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::ExecutionFailed {
        tool: "serialize".to_string(),
        message: e.to_string(),
    })
}

#[derive(Default)]
struct SearchCodebaseTool {
    search: CodebaseSearch,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

impl ToolExecutor for SearchCodebaseTool {
    fn name(&self) -> &'static str {
        "search_codebase"
    }

    fn description(&self) -> &'static str {
        "Search the codebase for code patterns, functions, variables, or text. \
         Returns matching lines with file paths and line numbers."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to find in file contents (function names, identifiers, comments, or any string)"
                }
            },
            "required": ["query"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: SearchArgs = parse_args(args)?;
        self.search.search(&ctx.working_dir, &typed.query)
    }
}

struct CodeContextTool;

#[derive(Debug, Deserialize)]
struct ContextArgs {
    file: String,
    line: usize,
}

impl ToolExecutor for CodeContextTool {
    fn name(&self) -> &'static str {
        "code_context"
    }

    fn description(&self) -> &'static str {
        "Show the code surrounding a specific line of a file: 20 lines before \
         and after, with the target line marked."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file": {
                    "type": "string",
                    "description": "Path to the file, relative to the project root"
                },
                "line": {
                    "type": "integer",
                    "description": "1-based line number to center the context on"
                }
            },
            "required": ["file", "line"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: ContextArgs = parse_args(args)?;
        peek::code_context(&ctx.working_dir, &typed.file, typed.line)
    }
}

struct PatchFileTool {
    engine: PatchEngine,
}

impl ToolExecutor for PatchFileTool {
    fn name(&self) -> &'static str {
        "patch_file"
    }

    fn description(&self) -> &'static str {
        "Apply targeted line-based patches to a file: replace, insert, or delete \
         line ranges. Validates every change first, writes a backup, and restores \
         the original on failure. Each change has: action (replace/insert/delete), \
         lineStart (1-based), lineEnd (optional), content (not for delete)."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file": {
                    "type": "string",
                    "description": "Path to the file to patch, relative to the project root"
                },
                "changes": {
                    "type": "array",
                    "description": "Patch operations. Each item has: action (replace/insert/delete), lineStart (1-based line number), lineEnd (optional, for multi-line ranges), content (new text; forbidden for delete)"
                }
            },
            "required": ["file", "changes"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let request: PatchRequest = parse_args(args)?;
        let result = self.engine.apply(&ctx.working_dir, &request);
        Ok(format_patch_result(&request, &result))
    }
}

/// Render a patch outcome for the model: what landed or what failed, plus the
/// backup path so a later rollback_patch call is possible.
fn format_patch_result(request: &PatchRequest, result: &PatchResult) -> String {
    let mut out = String::new();
    if result.success {
        let _ = writeln!(
            out,
            "Applied {} change(s) to {}",
            result.applied_changes, request.file
        );
        for change in &request.changes {
            let _ = writeln!(out, "- {} at line {}", change.action.as_str(), change.line_start);
        }
    } else {
        let _ = writeln!(out, "Patch failed: {}", result.message);
        if !result.failed_changes.is_empty() {
            let _ = writeln!(out, "Failed changes:");
            for change in &result.failed_changes {
                let _ = writeln!(out, "- {} at line {}", change.action.as_str(), change.line_start);
            }
        }
    }
    if let Some(backup) = &result.backup_path {
        let _ = write!(out, "Backup: {}", backup.display());
    }
    out.trim_end().to_string()
}

struct RollbackPatchTool {
    engine: PatchEngine,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollbackArgs {
    backup_path: String,
    original_path: String,
}

impl ToolExecutor for RollbackPatchTool {
    fn name(&self) -> &'static str {
        "rollback_patch"
    }

    fn description(&self) -> &'static str {
        "Restore a file to its state before a patch_file operation, using the \
         backup path returned by that call. The backup is deleted after a \
         successful rollback."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "backupPath": {
                    "type": "string",
                    "description": "Backup file path returned by patch_file"
                },
                "originalPath": {
                    "type": "string",
                    "description": "Path of the file to restore"
                }
            },
            "required": ["backupPath", "originalPath"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: RollbackArgs = parse_args(args)?;
        // The original must live inside the project; the backup must live
        // inside the store (checked by the engine).
        let original = crate::sandbox::resolve(&typed.original_path, &ctx.working_dir)?;
        let result = self
            .engine
            .rollback(std::path::Path::new(&typed.backup_path), &original);
        to_pretty_json(&result)
    }
}

struct DirectoryStructureTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeArgs {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    max_depth: Option<usize>,
}

impl ToolExecutor for DirectoryStructureTool {
    fn name(&self) -> &'static str {
        "directory_structure"
    }

    fn description(&self) -> &'static str {
        "Show a tree of files and directories, honoring gitignore rules. \
         Defaults to the project root, 3 levels deep."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (optional, defaults to the project root)"
                },
                "maxDepth": {
                    "type": "integer",
                    "description": "Maximum depth to traverse (optional, defaults to 3)"
                }
            },
            "required": []
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: TreeArgs = parse_args(args)?;
        tree::directory_structure(&ctx.working_dir, typed.path.as_deref(), typed.max_depth)
    }
}

#[derive(Default)]
struct CreateItemTool {
    service: CreateService,
}

impl ToolExecutor for CreateItemTool {
    fn name(&self) -> &'static str {
        "create_item"
    }

    fn description(&self) -> &'static str {
        "Create a file or directory in the project. Parent directories are \
         created automatically; set overwrite to replace an existing item."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Where to create the item, relative to the project root"
                },
                "type": {
                    "type": "string",
                    "description": "Kind of item: 'file' or 'directory'"
                },
                "content": {
                    "type": "string",
                    "description": "File content (files only). Optional, defaults to empty."
                },
                "overwrite": {
                    "type": "boolean",
                    "description": "Replace an existing item. Defaults to false."
                }
            },
            "required": ["path", "type"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let request: CreateItemRequest = parse_args(args)?;
        let result = self.service.create_item(&ctx.working_dir, &request);
        to_pretty_json(&result)
    }
}

#[derive(Default)]
struct CreateMultipleItemsTool {
    service: CreateService,
}

#[derive(Debug, Deserialize)]
struct MultipleItemsArgs {
    items: Vec<CreateItemRequest>,
}

impl ToolExecutor for CreateMultipleItemsTool {
    fn name(&self) -> &'static str {
        "create_multiple_items"
    }

    fn description(&self) -> &'static str {
        "Create several files and directories in one operation. Every item is \
         attempted; results are reported per item."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "description": "Items to create. Each has path, type, and optionally content and overwrite."
                }
            },
            "required": ["items"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: MultipleItemsArgs = parse_args(args)?;
        let results = self
            .service
            .create_multiple_items(&ctx.working_dir, &typed.items);
        to_pretty_json(&results)
    }
}

#[derive(Default)]
struct CreateProjectStructureTool {
    service: CreateService,
}

#[derive(Debug, Deserialize)]
struct StructureArgs {
    structure: HashMap<String, ItemKind>,
}

impl ToolExecutor for CreateProjectStructureTool {
    fn name(&self) -> &'static str {
        "create_project_structure"
    }

    fn description(&self) -> &'static str {
        "Create a whole project skeleton: directories and empty files only. \
         Add content afterwards with patch_file to avoid oversized arguments."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "structure": {
                    "type": "object",
                    "description": "Mapping of path to 'directory' or 'file'. Files are created empty."
                }
            },
            "required": ["structure"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: StructureArgs = parse_args(args)?;
        let results = self
            .service
            .create_project_structure(&ctx.working_dir, typed.structure);
        to_pretty_json(&results)
    }
}

#[derive(Default)]
struct CreateDirectoryScaffoldTool {
    service: CreateService,
}

#[derive(Debug, Deserialize)]
struct PathsArgs {
    paths: Vec<String>,
}

impl ToolExecutor for CreateDirectoryScaffoldTool {
    fn name(&self) -> &'static str {
        "create_directory_scaffold"
    }

    fn description(&self) -> &'static str {
        "Create several directories at once."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "description": "Directory paths to create"
                }
            },
            "required": ["paths"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: PathsArgs = parse_args(args)?;
        let results = self
            .service
            .create_directory_scaffold(&ctx.working_dir, &typed.paths);
        to_pretty_json(&results)
    }
}

#[derive(Default)]
struct CreateEmptyFilesTool {
    service: CreateService,
}

impl ToolExecutor for CreateEmptyFilesTool {
    fn name(&self) -> &'static str {
        "create_empty_files"
    }

    fn description(&self) -> &'static str {
        "Create several empty files at once; fill them in afterwards with \
         patch_file."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "description": "File paths to create as empty files"
                }
            },
            "required": ["paths"]
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let typed: PathsArgs = parse_args(args)?;
        let results = self
            .service
            .create_empty_files(&ctx.working_dir, &typed.paths);
        to_pretty_json(&results)
    }
}
