//! Provider execution context and results.

use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::task::ProviderKind;
use crate::config::Config;

/// Environment of one provider execution.
///
/// Built once per run and shared read-only by every provider invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Project the providers act on.
    pub project_root: Utf8PathBuf,
    /// Emit subprocess output through the log as it streams.
    pub verbose: bool,
    /// Ask tools to report changes instead of applying them.
    pub dry_run: bool,
    /// Selected provider.
    pub provider: ProviderKind,
    /// Version of the OpenRewrite Maven plugin.
    pub plugin_version: String,
    /// Name prefix of generated composite recipes.
    pub recipe_name: String,
    /// Build tool executable.
    pub maven_command: String,
    /// Upper bound for one subprocess or assistant exchange.
    pub timeout: Duration,
    /// Maximum assistant tool calls per task.
    pub max_tool_rounds: u32,
}

impl ExecutionContext {
    /// Builds a context from the run configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use mt_core::{Config, ExecutionContext, ProviderKind};
    ///
    /// let ctx = ExecutionContext::from_config("/work/app", &Config::default());
    /// assert_eq!(ctx.provider, ProviderKind::Manual);
    /// assert!(!ctx.dry_run);
    /// ```
    #[must_use]
    pub fn from_config(project_root: impl Into<Utf8PathBuf>, config: &Config) -> Self {
        Self {
            project_root: project_root.into(),
            verbose: false,
            dry_run: config.migration.dry_run,
            provider: config.migration.provider,
            plugin_version: config.rewrite.plugin_version.clone(),
            recipe_name: config.migration.recipe_name.clone(),
            maven_command: config.rewrite.maven_command.clone(),
            timeout: Duration::from_secs(config.migration.timeout_secs),
            max_tool_rounds: config.migration.max_tool_rounds,
        }
    }

    /// Sets the verbose flag, returning the context.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Outcome of one provider execution.
///
/// Failures carry the ordered detail log (subprocess lines, tool calls) that
/// led to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the provider completed successfully.
    pub success: bool,
    /// Summary line.
    pub message: String,
    /// Ordered detail log.
    #[serde(default)]
    pub details: Vec<String>,
    /// Captured error, for failures caused by one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A successful result.
    #[must_use]
    pub fn success(message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details,
            error: None,
        }
    }

    /// A failed result without an underlying error.
    #[must_use]
    pub fn failure(message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details,
            error: None,
        }
    }

    /// A failed result caused by `error`.
    #[must_use]
    pub fn from_error(
        message: impl Into<String>,
        details: Vec<String>,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::failure(message, details)
        }
    }
}
