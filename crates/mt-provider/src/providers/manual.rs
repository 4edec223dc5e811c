//! Manual provider: emits the rule's checklist without touching the project.

use async_trait::async_trait;
use mt_core::{ExecutionContext, ExecutionResult, MigrationTask, ProviderKind};
use tracing::info;

use crate::provider::MigrationProvider;

/// Reports a rule's manual to-do items as the result details.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualProvider;

#[async_trait]
impl MigrationProvider for ManualProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Manual
    }

    async fn execute(&self, task: &MigrationTask, _ctx: &ExecutionContext) -> ExecutionResult {
        let details: Vec<String> = task
            .rule
            .instructions
            .manual
            .iter()
            .map(|m| m.todo.trim().to_owned())
            .filter(|todo| !todo.is_empty())
            .collect();
        info!(rule_id = %task.rule_id(), items = details.len(), "manual checklist");
        ExecutionResult::success(
            format!("{} manual step(s) for rule {}", details.len(), task.rule_id()),
            details,
        )
    }
}
