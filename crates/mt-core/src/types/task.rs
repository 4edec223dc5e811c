//! Migration tasks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::execution::ExecutionResult;
use super::match_result::Match;
use super::rule::Rule;
use crate::error::CoreError;

/// Which instruction kind a task executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Run OpenRewrite recipes through the build tool.
    OpenRewrite,
    /// Ask the AI assistant.
    Ai,
    /// Emit the manual checklist.
    #[default]
    Manual,
}

impl ProviderKind {
    /// Returns the registry key of this provider.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenRewrite => "openrewrite",
            Self::Ai => "ai",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrewrite" => Ok(Self::OpenRewrite),
            "ai" => Ok(Self::Ai),
            "manual" => Ok(Self::Manual),
            other => Err(CoreError::configuration(format!("unknown provider '{other}'"))),
        }
    }
}

/// Outcome of a rule's precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionStatus {
    /// The rule has no precondition.
    #[default]
    NotDeclared,
    /// The precondition query matched.
    Satisfied,
    /// The precondition query matched nothing; the condition was skipped.
    NotSatisfied,
}

/// A rule bound to its matches and chosen instruction for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationTask {
    /// The rule.
    pub rule: Rule,
    /// The instruction kind to execute.
    pub provider: ProviderKind,
    /// Matches of the rule's condition, possibly empty.
    #[serde(default)]
    pub matches: Vec<Match>,
    /// Precondition outcome.
    #[serde(default)]
    pub precondition: PreconditionStatus,
    /// Result of the provider execution, once run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl MigrationTask {
    /// Creates a task with no matches.
    #[must_use]
    pub fn new(rule: Rule, provider: ProviderKind) -> Self {
        Self {
            rule,
            provider,
            matches: Vec::new(),
            precondition: PreconditionStatus::NotDeclared,
            result: None,
        }
    }

    /// Sets the matches, returning the task.
    #[must_use]
    pub fn with_matches(mut self, matches: Vec<Match>) -> Self {
        self.matches = matches;
        self
    }

    /// Sets the precondition status, returning the task.
    #[must_use]
    pub fn with_precondition(mut self, status: PreconditionStatus) -> Self {
        self.precondition = status;
        self
    }

    /// Returns `true` if the rule's condition matched.
    #[must_use]
    pub fn is_matched(&self) -> bool {
        !self.matches.is_empty()
    }

    /// The rule id, used as the task's match-group key.
    #[must_use]
    pub fn rule_id(&self) -> &str {
        &self.rule.rule_id
    }
}
