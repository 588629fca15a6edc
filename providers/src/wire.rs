//! Serde types for the chat-completions wire format.
//!
//! The wire nests tool calls under a `function` object and may deliver
//! `arguments` as a JSON-encoded string; the internal [`ChatMessage`] keeps
//! the flat shape and leaves argument decoding to the tool dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use spectre_types::{ChatMessage, Role, ToolCall, ToolDefinition};

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: WireMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    /// Null for assistant messages that only carry tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    pub fn from_message(message: &ChatMessage) -> Self {
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(WireToolCall::from_call)
                    .collect(),
            )
        };
        let content = if message.content.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(message.content.clone())
        };
        Self {
            role: message.role,
            content,
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.unwrap_or_default(),
            tool_calls: self
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(WireToolCall::into_call)
                .collect(),
            tool_call_id: self.tool_call_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    /// Usually a JSON-encoded string; some servers send an object.
    pub arguments: Value,
}

impl WireToolCall {
    fn from_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: "function".to_string(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }

    fn into_call(self) -> ToolCall {
        ToolCall::new(self.id, self.function.name, self.function.arguments)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunction,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl WireTool {
    pub fn from_definition(def: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.parameters.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WireMessage;
    use serde_json::json;
    use spectre_types::{ChatMessage, ToolCall};

    #[test]
    fn assistant_tool_call_round_trips() {
        let mut message = ChatMessage::assistant("");
        message.tool_calls = vec![ToolCall::new(
            "c1",
            "patch_file",
            json!("{\"file\":\"a\"}"),
        )];

        let wire = WireMessage::from_message(&message);
        let serialized = serde_json::to_value(&wire).unwrap();
        // Content is omitted for tool-call-only messages; the call nests
        // under `function`.
        assert!(serialized.get("content").is_none());
        assert_eq!(serialized["tool_calls"][0]["function"]["name"], "patch_file");

        let back: WireMessage = serde_json::from_value(serialized).unwrap();
        let round = back.into_message();
        assert_eq!(round.tool_calls[0].name, "patch_file");
        assert!(round.tool_calls[0].arguments.is_string());
    }

    #[test]
    fn tool_result_message_keeps_its_call_id() {
        let wire = WireMessage::from_message(&ChatMessage::tool_result("c1", "done"));
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "c1");
        assert_eq!(value["content"], "done");
    }
}
