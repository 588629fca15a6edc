//! Shared wire types for the Spectre chat loop and tool layer.
//!
//! These types mirror the OpenAI-compatible chat-completions wire format:
//! messages carry a role and text content, assistant messages may carry tool
//! calls, and tool-role messages answer a specific `tool_call_id`.

use serde::{Deserialize, Serialize};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by the assistant, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For `Role::Tool` messages: the id of the call this answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// A tool-role message answering `tool_call_id` with a result string.
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Whether the assistant asked for at least one tool invocation.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call requested by the model.
///
/// `arguments` is kept as raw JSON: providers deliver it either as an
/// already-structured object or as a JSON-encoded string. The dispatcher
/// owns decoding it, so a malformed payload surfaces as a tool result
/// rather than a deserialization failure here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (used to match results).
    pub id: String,
    /// Name of the tool being called.
    pub name: String,
    /// Arguments as delivered by the provider: object or JSON string.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result of executing a tool call.
///
/// Always textual: the dispatcher converts every failure into a descriptive
/// string so the model can read and react to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    #[must_use]
    pub fn success(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Convert into the tool-role message fed back to the model.
    #[must_use]
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::tool_result(self.tool_call_id, self.content)
    }
}

/// A tool the model may call: name, human description, JSON parameter schema.
///
/// Declared once at startup and never mutated; the schema is descriptive
/// (the services re-validate everything they receive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, Role, ToolCall};
    use serde_json::json;

    #[test]
    fn tool_result_message_carries_call_id() {
        let msg = ChatMessage::tool_result("call_1", "ok");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn plain_messages_skip_empty_tool_fields() {
        let serialized = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(serialized, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn tool_call_arguments_may_be_string_or_object() {
        let as_string = ToolCall::new("1", "patch_file", json!("{\"file\":\"a.rs\"}"));
        assert!(as_string.arguments.is_string());

        let parsed: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{"id": "2", "name": "create_item", "arguments": {"path": "x"}}]
        }))
        .unwrap();
        assert!(parsed.tool_calls[0].arguments.is_object());
    }

    #[test]
    fn message_without_content_field_deserializes_empty() {
        let parsed: ChatMessage = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        assert!(parsed.content.is_empty());
    }
}
