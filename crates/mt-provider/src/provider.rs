//! The provider abstraction shared by every instruction kind.

use async_trait::async_trait;
use mt_core::{ExecutionContext, ExecutionResult, MigrationTask, ProviderKind};

/// Carries out one instruction kind for a matched task.
///
/// `execute` never fails: every error is folded into a failed
/// [`ExecutionResult`] carrying the detail log gathered so far, so a batch
/// run continues past individual failures.
#[async_trait]
pub trait MigrationProvider: Send + Sync {
    /// The instruction kind this provider executes.
    fn kind(&self) -> ProviderKind;

    /// Executes the task's instructions of this provider's kind.
    async fn execute(&self, task: &MigrationTask, ctx: &ExecutionContext) -> ExecutionResult;
}
