//! Error types for the mt-provider crate.
//!
//! Providers never return these to their caller: [`MigrationProvider::execute`]
//! folds them into a failed [`ExecutionResult`](mt_core::ExecutionResult).
//! They surface directly only from the building blocks (process runner,
//! assistant, file tools) and from the registry.
//!
//! [`MigrationProvider::execute`]: crate::MigrationProvider::execute

use camino::Utf8PathBuf;
use mt_core::{CoreError, ProviderKind};

/// Errors that can occur while executing a migration task.
///
/// # Examples
///
/// ```
/// use mt_provider::ProviderError;
///
/// let err = ProviderError::tool_call("path escapes the project: ../etc/passwd");
/// assert!(err.is_recoverable());
/// assert!(err.to_string().contains("../etc/passwd"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No provider is registered for the requested kind.
    #[error("no provider registered for '{0}'")]
    NotRegistered(ProviderKind),

    /// The AI provider needs an interactive console and none is attached.
    #[error("no interactive console available; the AI provider cannot run unattended")]
    ConsoleUnavailable,

    /// A subprocess could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// The program.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read or write a file.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A subprocess or assistant exchange did not finish in time.
    #[error("{what} timed out after {timeout_secs}s")]
    Timeout {
        /// What was running.
        what: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
        /// Lines printed before the process was killed.
        output: Vec<String>,
    },

    /// The assistant failed or broke the protocol.
    #[error("assistant error: {0}")]
    Assistant(String),

    /// The assistant asked for a tool call that cannot be honoured.
    #[error("rejected tool call: {0}")]
    ToolCall(String),

    /// The composite recipe document could not be built.
    #[error("invalid recipe document: {0}")]
    RecipeDocument(#[from] CoreError),
}

impl ProviderError {
    /// Creates a new [`ProviderError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ProviderError::Assistant`] error.
    #[inline]
    pub fn assistant(message: impl Into<String>) -> Self {
        Self::Assistant(message.into())
    }

    /// Creates a new [`ProviderError::ToolCall`] error.
    #[inline]
    pub fn tool_call(message: impl Into<String>) -> Self {
        Self::ToolCall(message.into())
    }

    /// Returns `true` if the conversation can continue after this error.
    ///
    /// Rejected tool calls and file errors are reported back to the assistant.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ToolCall(_) | Self::Io { .. })
    }

    /// Returns `true` if the task must stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the output captured before a timeout, if any.
    #[must_use]
    pub fn output(&self) -> &[String] {
        match self {
            Self::Timeout { output, .. } => output,
            _ => &[],
        }
    }
}
