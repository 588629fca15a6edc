//! Non-streaming client for OpenAI-compatible chat-completions endpoints.
//!
//! One request per turn: the full message history and the tool definitions
//! go up, one assistant message (text or tool calls) comes back. Cancellation
//! is the caller's concern; dropping the in-flight future aborts the request.

mod wire;

use std::sync::OnceLock;
use std::time::Duration;

use spectre_types::{ChatMessage, ToolDefinition};

use wire::{ChatRequest, ChatResponse, WireMessage, WireTool};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 300;
const MAX_ERROR_BODY_BYTES: usize = 16 * 1024;

/// Connection settings for one endpoint.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL up to but excluding `/chat/completions`,
    /// e.g. `http://localhost:1234/v1`.
    pub base_url: String,
    /// Bearer token, if the endpoint wants one.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Errors from the provider boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("response contained no choices")]
    EmptyResponse,
}

/// Shared HTTP client. Redirects are refused so a compromised endpoint
/// cannot bounce credentials elsewhere; TLS is not forced because local
/// OpenAI-compatible servers speak plain HTTP.
fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default()
    })
}

/// Send the conversation and tool vocabulary; return the assistant message.
pub async fn send_chat(
    config: &ApiConfig,
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
) -> Result<ChatMessage, ProviderError> {
    let body = ChatRequest {
        model: &config.model,
        messages: messages.iter().map(WireMessage::from_message).collect(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        stream: false,
        tools: tools.iter().map(WireTool::from_definition).collect(),
        tool_choice: if tools.is_empty() { None } else { Some("auto") },
    };

    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
    tracing::debug!(%url, model = %config.model, messages = messages.len(), "sending chat request");

    let mut request = http_client().post(&url).json(&body);
    if let Some(key) = &config.api_key {
        request = request.bearer_auth(key);
    }
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(MAX_ERROR_BODY_BYTES);
        tracing::warn!(status = status.as_u16(), "chat request rejected");
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: ChatResponse = response.json().await?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.into_message())
        .ok_or(ProviderError::EmptyResponse)
}

/// Probe the endpoint's `/models` listing to verify it is reachable.
pub async fn test_connection(config: &ApiConfig) -> Result<(), ProviderError> {
    let url = format!("{}/models", config.base_url.trim_end_matches('/'));
    let mut request = http_client().get(&url).timeout(Duration::from_secs(5));
    if let Some(key) = &config.api_key {
        request = request.bearer_auth(key);
    }
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ProviderError::Api {
            status: status.as_u16(),
            body: String::new(),
        })
    }
}
