//! Tool execution layer: registry, dispatch, and the file-mutation services.
//!
//! Every operation the model can invoke lives behind the [`ToolExecutor`]
//! trait. The [`dispatch`] boundary parses the model-issued call, routes it
//! by name, and converts every failure into a result string: tool calls come
//! from an untrusted model, so nothing that happens in here may escape as an
//! error to the conversation loop, and nothing in here is fatal to the
//! process.

pub mod backup;
pub mod builtins;
pub mod create;
pub mod patch;
pub mod peek;
pub mod sandbox;
pub mod search;
pub mod tree;

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

use spectre_types::{ToolCall, ToolDefinition, ToolResult};

/// Error types for tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Bad tool args: {message}")]
    BadArgs { message: String },
    #[error("{reason}")]
    PathRejected { reason: String },
    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("Duplicate tool registered: {name}")]
    DuplicateTool { name: String },
    #[error("{tool}: {message}")]
    ExecutionFailed { tool: String, message: String },
}

/// Decode a typed argument struct out of the call's JSON arguments.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|e| ToolError::BadArgs {
        message: e.to_string(),
    })
}

/// Per-call execution context.
///
/// `working_dir` is the canonicalized project root every path in a tool call
/// is validated against.
#[derive(Debug, Clone)]
pub struct ToolCtx {
    pub working_dir: PathBuf,
}

impl ToolCtx {
    #[must_use]
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }
}

/// A callable operation: name, model-facing schema, and the execution body.
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    fn execute(&self, args: &Value, ctx: &ToolCtx) -> Result<String, ToolError>;
}

/// Immutable registry of the callable operations.
///
/// Populated once at startup; [`definitions`](Self::definitions) is the
/// action vocabulary handed to the model.
#[derive(Default)]
pub struct ToolRegistry {
    executors: HashMap<String, Box<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn register(&mut self, executor: Box<dyn ToolExecutor>) -> Result<(), ToolError> {
        let name = executor.name().to_string();
        if self.executors.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.executors.insert(name, executor);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&dyn ToolExecutor, ToolError> {
        self.executors
            .get(name)
            .map(std::convert::AsRef::as_ref)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .executors
            .values()
            .map(|exec| ToolDefinition::new(exec.name(), exec.description(), exec.schema()))
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

/// Execute a model-issued tool call.
///
/// The outer contract: this always returns a [`ToolResult`] whose content is
/// a readable string, regardless of what the underlying service does. Parse
/// failures, unknown names, and service errors all become descriptive text
/// the model can react to.
pub fn dispatch(registry: &ToolRegistry, ctx: &ToolCtx, call: &ToolCall) -> ToolResult {
    let args = match structured_arguments(&call.arguments) {
        Ok(args) => args,
        Err(err) => {
            tracing::warn!(tool = %call.name, %err, "failed to parse tool arguments");
            return ToolResult::error(
                &call.id,
                &call.name,
                format!("Failed to parse tool arguments: {err}"),
            );
        }
    };

    let executor = match registry.lookup(&call.name) {
        Ok(executor) => executor,
        Err(_) => {
            tracing::warn!(tool = %call.name, "unknown tool requested");
            return ToolResult::error(&call.id, &call.name, format!("Unknown tool: {}", call.name));
        }
    };

    tracing::debug!(tool = %call.name, id = %call.id, "executing tool call");
    match executor.execute(&args, ctx) {
        Ok(output) => ToolResult::success(&call.id, &call.name, output),
        Err(err) => {
            tracing::warn!(tool = %call.name, %err, "tool execution failed");
            ToolResult::error(&call.id, &call.name, format!("Tool execution failed: {err}"))
        }
    }
}

/// Arguments arrive either as structured JSON or as a JSON-encoded string;
/// normalize to the structured form.
fn structured_arguments(raw: &Value) -> Result<Value, serde_json::Error> {
    match raw {
        Value::String(encoded) => serde_json::from_str(encoded),
        other => Ok(other.clone()),
    }
}
