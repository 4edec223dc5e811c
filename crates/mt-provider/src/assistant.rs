//! Chat assistant abstraction used by the AI provider.
//!
//! The assistant sees a conversation and a list of tool definitions and
//! answers with either one tool call or a final response. [`ProcessAssistant`]
//! speaks this protocol as JSON lines with an external command: the request
//! is written as one line on stdin, the reply read as one line from stdout.
//!
//! ```text
//! -> {"messages":[{"role":"system","content":"..."},...],"tools":[...]}
//! <- {"type":"tool_call","name":"read_file","arguments":{"path":"src/A.java"}}
//! <- {"type":"final","content":"Replaced javax.persistence imports"}
//! ```

use std::process::Stdio;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::ProviderError;
use crate::process::command;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation.
    System,
    /// The task.
    User,
    /// The assistant's own turns, including tool calls.
    Assistant,
    /// Results of tool calls.
    Tool,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A tool the assistant may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

/// One request to the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Tools available to the assistant.
    pub tools: Vec<ToolDefinition>,
}

/// The assistant's answer to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantReply {
    /// The assistant wants a tool run before continuing.
    ToolCall {
        /// Tool name.
        name: String,
        /// Tool arguments.
        #[serde(default)]
        arguments: Value,
    },
    /// The assistant is done with the task.
    Final {
        /// The final response.
        content: String,
    },
}

/// A chat-based, tool-calling assistant.
#[async_trait]
pub trait ChatAssistant: Send + Sync {
    /// Sends the conversation and returns the next reply.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Assistant`] if the assistant fails or answers
    /// outside the protocol.
    async fn chat(&self, request: &ChatRequest) -> Result<AssistantReply, ProviderError>;
}

/// Assistant backed by an external command speaking JSON lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessAssistant {
    program: String,
    args: Vec<String>,
    working_dir: Utf8PathBuf,
}

impl ProcessAssistant {
    /// Creates an assistant from a command line.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Assistant`] if the command line is empty.
    pub fn new(command_line: &[String], working_dir: impl Into<Utf8PathBuf>) -> Result<Self, ProviderError> {
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| ProviderError::assistant("no assistant command configured"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: working_dir.into(),
        })
    }
}

#[async_trait]
impl ChatAssistant for ProcessAssistant {
    async fn chat(&self, request: &ChatRequest) -> Result<AssistantReply, ProviderError> {
        let spawn_error = |source: std::io::Error| ProviderError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = command(&self.program, &self.working_dir)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let mut payload = serde_json::to_string(request)
            .map_err(|e| ProviderError::assistant(format!("cannot encode request: {e}")))?;
        payload.push('\n');

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::assistant("assistant stdin unavailable"))?;
        stdin.write_all(payload.as_bytes()).await.map_err(spawn_error)?;
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::assistant("assistant stdout unavailable"))?;
        let line = BufReader::new(stdout)
            .lines()
            .next_line()
            .await
            .map_err(spawn_error)?
            .ok_or_else(|| ProviderError::assistant("assistant closed its output without replying"))?;

        let status = child.wait().await.map_err(spawn_error)?;
        debug!(program = %self.program, ?status, "assistant replied");

        serde_json::from_str(&line)
            .map_err(|e| ProviderError::assistant(format!("unexpected reply '{line}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_reply_wire_format() {
        let call: AssistantReply = serde_json::from_value(json!({
            "type": "tool_call",
            "name": "read_file",
            "arguments": {"path": "src/A.java"}
        }))
        .unwrap();
        assert_eq!(
            call,
            AssistantReply::ToolCall {
                name: "read_file".to_owned(),
                arguments: json!({"path": "src/A.java"}),
            }
        );

        let done: AssistantReply =
            serde_json::from_str(r#"{"type":"final","content":"done"}"#).unwrap();
        assert_eq!(
            done,
            AssistantReply::Final {
                content: "done".to_owned()
            }
        );
    }

    #[test]
    fn test_empty_command_line() {
        assert!(ProcessAssistant::new(&[], ".").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_assistant_round_trip() {
        let command_line = vec![
            "sh".to_owned(),
            "-c".to_owned(),
            r#"read request; echo '{"type":"final","content":"ok"}'"#.to_owned(),
        ];
        let assistant = ProcessAssistant::new(&command_line, ".").unwrap();
        let reply = assistant
            .chat(&ChatRequest {
                messages: vec![ChatMessage::new(Role::User, "hello")],
                tools: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(
            reply,
            AssistantReply::Final {
                content: "ok".to_owned()
            }
        );
    }
}
