//! The chat session: one user turn in, tool calls dispatched, one reply out.

use spectre_context::{History, TokenCounter};
use spectre_providers::send_chat;
use spectre_tools::backup::BackupStore;
use spectre_tools::builtins::register_builtins;
use spectre_tools::{ToolCtx, ToolRegistry, dispatch};
use spectre_types::{ChatMessage, ToolDefinition};

use crate::Settings;

const SYSTEM_PROMPT: &str = "You are Spectre, a coding assistant operating inside the user's \
project directory. Use the available tools to inspect the codebase before answering questions \
about it, and to create or patch files when asked to make changes. Prefer small, targeted \
patches over rewriting whole files. Paths are relative to the project root. When a tool \
reports a failure, read the message and adjust rather than repeating the same call.";

/// Progress notifications emitted while a turn runs.
#[derive(Debug, Clone, Copy)]
pub enum TurnEvent<'a> {
    ToolStarted { name: &'a str },
    ToolFinished { name: &'a str, is_error: bool },
}

/// What a completed turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    pub reply: String,
    /// True when the model was still asking for tools at the iteration cap.
    pub hit_iteration_cap: bool,
}

/// A live chat session bound to one working directory.
///
/// Tool calls execute strictly one at a time: each call completes all of its
/// filesystem work before the next is dispatched, and the next API request
/// goes out only after every result message has been appended.
pub struct Session {
    settings: Settings,
    history: History,
    counter: TokenCounter,
    registry: ToolRegistry,
    ctx: ToolCtx,
    definitions: Vec<ToolDefinition>,
}

impl Session {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let working_dir = std::env::current_dir()?.canonicalize()?;
        Self::with_working_dir(settings, working_dir)
    }

    pub fn with_working_dir(
        settings: Settings,
        working_dir: std::path::PathBuf,
    ) -> anyhow::Result<Self> {
        let mut registry = ToolRegistry::default();
        register_builtins(&mut registry, BackupStore::new(settings.backup_dir.clone()))?;
        let definitions = registry.definitions();
        tracing::info!(
            working_dir = %working_dir.display(),
            tools = definitions.len(),
            "session started"
        );
        Ok(Self {
            settings,
            history: History::new(SYSTEM_PROMPT),
            counter: TokenCounter::new(),
            registry,
            ctx: ToolCtx::new(working_dir),
            definitions,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn tool_definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Drop the conversation, keeping the system prompt.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Run one user turn to completion.
    ///
    /// Sends the trimmed history, dispatches every tool call in the reply
    /// sequentially, feeds the results back, and repeats until the model
    /// answers in plain text or the iteration cap is reached. Cancelling the
    /// returned future aborts at the next await point, i.e. between API
    /// requests; an individual tool call always runs to completion.
    pub async fn run_turn<F>(&mut self, input: &str, mut on_event: F) -> anyhow::Result<TurnOutcome>
    where
        F: FnMut(TurnEvent<'_>),
    {
        self.history.push(ChatMessage::user(input));

        for iteration in 0..self.settings.max_tool_iterations {
            self.history
                .trim_to_budget(&self.counter, self.settings.max_input_tokens);

            let reply = send_chat(
                &self.settings.api,
                self.history.messages(),
                &self.definitions,
            )
            .await?;
            self.history.push(reply.clone());

            if !reply.has_tool_calls() {
                return Ok(TurnOutcome {
                    reply: reply.content,
                    hit_iteration_cap: false,
                });
            }

            tracing::debug!(
                iteration,
                calls = reply.tool_calls.len(),
                "processing tool calls"
            );
            for call in &reply.tool_calls {
                on_event(TurnEvent::ToolStarted { name: &call.name });
                let result = dispatch(&self.registry, &self.ctx, call);
                on_event(TurnEvent::ToolFinished {
                    name: &call.name,
                    is_error: result.is_error,
                });
                self.history.push(result.into_message());
            }
        }

        tracing::warn!(
            cap = self.settings.max_tool_iterations,
            "turn stopped at tool iteration cap"
        );
        Ok(TurnOutcome {
            reply: "Stopped: the tool-call iteration limit was reached before the model \
                    produced a final answer."
                .to_string(),
            hit_iteration_cap: true,
        })
    }
}
