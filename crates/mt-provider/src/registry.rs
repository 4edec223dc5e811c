//! Provider registration keyed by instruction kind.
//!
//! # Examples
//!
//! ```
//! use mt_core::ProviderKind;
//! use mt_provider::{ManualProvider, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new().with_provider(ManualProvider);
//! assert!(registry.get(ProviderKind::Manual).is_ok());
//! assert!(registry.get(ProviderKind::Ai).is_err());
//! ```

use std::sync::Arc;

use mt_core::{ExecutionContext, ExecutionResult, FxHashMap, MigrationTask, ProviderKind};
use tracing::{debug, warn};

use crate::assistant::ChatAssistant;
use crate::error::ProviderError;
use crate::process::ProcessRunner;
use crate::provider::MigrationProvider;
use crate::providers::{AiProvider, ManualProvider, OpenRewriteProvider};

/// Providers available to a migration run.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: FxHashMap<ProviderKind, Arc<dyn MigrationProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.providers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_list().entries(kinds).finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in providers.
    ///
    /// The AI provider is registered only when an assistant is supplied.
    #[must_use]
    pub fn standard(runner: Arc<dyn ProcessRunner>, assistant: Option<Arc<dyn ChatAssistant>>) -> Self {
        let registry = Self::new()
            .with_provider(OpenRewriteProvider::new(runner))
            .with_provider(ManualProvider);
        match assistant {
            Some(assistant) => registry.with_provider(AiProvider::new(assistant)),
            None => registry,
        }
    }

    /// Registers a provider, replacing any provider of the same kind.
    #[must_use]
    pub fn with_provider(mut self, provider: impl MigrationProvider + 'static) -> Self {
        self.providers.insert(provider.kind(), Arc::new(provider));
        self
    }

    /// Returns the provider for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotRegistered`] if no provider handles `kind`.
    pub fn get(&self, kind: ProviderKind) -> Result<&dyn MigrationProvider, ProviderError> {
        self.providers
            .get(&kind)
            .map(|p| p.as_ref())
            .ok_or(ProviderError::NotRegistered(kind))
    }

    /// Returns `true` if a provider handles `kind`.
    #[must_use]
    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Executes `task` with the provider named by the task.
    ///
    /// An unregistered provider is reported as a failed result.
    pub async fn execute(&self, task: &MigrationTask, ctx: &ExecutionContext) -> ExecutionResult {
        match self.get(task.provider) {
            Ok(provider) => {
                debug!(rule_id = %task.rule_id(), provider = %task.provider, "executing task");
                provider.execute(task, ctx).await
            }
            Err(e) => {
                warn!(rule_id = %task.rule_id(), error = %e, "cannot execute task");
                ExecutionResult::from_error(
                    format!("cannot execute rule {}", task.rule_id()),
                    Vec::new(),
                    &e,
                )
            }
        }
    }
}
