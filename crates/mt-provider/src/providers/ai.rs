//! AI provider running a rule's tasks through a tool-calling chat assistant.

use std::io::IsTerminal;
use std::sync::Arc;

use async_trait::async_trait;
use mt_core::{ExecutionContext, ExecutionResult, MigrationTask, ProviderKind};
use tracing::{debug, info, warn};

use crate::assistant::{AssistantReply, ChatAssistant, ChatMessage, ChatRequest, Role};
use crate::error::ProviderError;
use crate::provider::MigrationProvider;
use crate::tools::FileTools;

const TOOL_RULES: &str = "You can only change the project through the read_file and write_file tools. \
Paths are relative to the project root. Always call read_file on the exact path immediately before \
calling write_file on it, and write back the complete file contents. When the task is done, reply \
with a short summary of the changes.";

fn has_console() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Carries out a rule's AI tasks one by one.
///
/// The provider needs an interactive console: the assistant edits source
/// files directly and a person is expected to follow along.
#[derive(Clone)]
pub struct AiProvider {
    assistant: Arc<dyn ChatAssistant>,
    console: fn() -> bool,
}

impl AiProvider {
    /// Creates a provider talking to `assistant`.
    #[must_use]
    pub fn new(assistant: Arc<dyn ChatAssistant>) -> Self {
        Self {
            assistant,
            console: has_console,
        }
    }

    /// Replaces the interactive console check.
    #[must_use]
    pub fn with_console_check(mut self, console: fn() -> bool) -> Self {
        self.console = console;
        self
    }

    /// Runs one task to its final reply, logging tool calls into `details`.
    async fn run_task(
        &self,
        prompt: &str,
        task: &str,
        tools: &mut FileTools,
        ctx: &ExecutionContext,
        details: &mut Vec<String>,
    ) -> Result<String, ProviderError> {
        let system = if prompt.trim().is_empty() {
            TOOL_RULES.to_owned()
        } else {
            format!("{}\n\n{TOOL_RULES}", prompt.trim())
        };
        let mut request = ChatRequest {
            messages: vec![
                ChatMessage::new(Role::System, system),
                ChatMessage::new(Role::User, task),
            ],
            tools: FileTools::definitions(),
        };

        for round in 0..=ctx.max_tool_rounds {
            let reply = tokio::time::timeout(ctx.timeout, self.assistant.chat(&request))
                .await
                .map_err(|_| ProviderError::Timeout {
                    what: "assistant".to_owned(),
                    timeout_secs: ctx.timeout.as_secs(),
                    output: Vec::new(),
                })??;

            let (name, arguments) = match reply {
                AssistantReply::Final { content } => return Ok(content),
                AssistantReply::ToolCall { name, arguments } => (name, arguments),
            };
            if round == ctx.max_tool_rounds {
                break;
            }

            let path = arguments.get("path").and_then(|p| p.as_str()).unwrap_or("?");
            let result = match tools.call(&name, &arguments) {
                Ok(result) => {
                    debug!(tool = %name, path, "tool call");
                    details.push(format!("{name} {path}"));
                    result
                }
                Err(e) if e.is_recoverable() => {
                    warn!(tool = %name, path, error = %e, "tool call rejected");
                    details.push(format!("{name} {path} rejected: {e}"));
                    format!("error: {e}")
                }
                Err(e) => return Err(e),
            };

            request.messages.push(ChatMessage::new(
                Role::Assistant,
                serde_json::json!({"tool_call": {"name": name, "arguments": arguments}}).to_string(),
            ));
            request.messages.push(ChatMessage::new(Role::Tool, result));
        }

        Err(ProviderError::assistant(format!(
            "no final reply after {} tool calls",
            ctx.max_tool_rounds
        )))
    }
}

impl std::fmt::Debug for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl MigrationProvider for AiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ai
    }

    async fn execute(&self, task: &MigrationTask, ctx: &ExecutionContext) -> ExecutionResult {
        let rule = &task.rule;
        let instructions: Vec<_> = rule
            .instructions
            .ai
            .iter()
            .filter(|i| !i.tasks.is_empty())
            .collect();
        if instructions.is_empty() {
            return ExecutionResult::failure(
                format!("no AI tasks defined for rule {}", rule.rule_id),
                Vec::new(),
            );
        }
        if !(self.console)() {
            return ExecutionResult::from_error(
                "AI provider requires an interactive console",
                Vec::new(),
                &ProviderError::ConsoleUnavailable,
            );
        }

        let mut tools = FileTools::new(ctx.project_root.clone());
        let mut details = Vec::new();
        let mut completed = 0usize;
        for instruction in instructions {
            for text in &instruction.tasks {
                info!(rule_id = %rule.rule_id, task = %text, "running AI task");
                details.push(format!("task: {text}"));
                match self
                    .run_task(&instruction.prompt, text, &mut tools, ctx, &mut details)
                    .await
                {
                    Ok(response) => {
                        details.push(format!("response: {response}"));
                        completed += 1;
                    }
                    Err(e) => {
                        warn!(rule_id = %rule.rule_id, error = %e, "AI task failed");
                        return ExecutionResult::from_error(
                            format!("AI task failed for rule {}", rule.rule_id),
                            details,
                            &e,
                        );
                    }
                }
            }
        }

        ExecutionResult::success(format!("completed {completed} AI task(s)"), details)
    }
}
