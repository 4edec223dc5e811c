//! Domain types for the migration tool.
//!
//! # Module Organization
//!
//! - [`match_result`] - Scanner findings and their payloads
//! - [`rule`] - Rules, preconditions and instructions
//! - [`task`] - Migration tasks and provider kinds
//! - [`execution`] - Provider execution context and results
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use mt_core::{Match, MigrationTask, Rule};
//! ```

mod execution;
mod match_result;
mod rule;
mod task;

pub use execution::{ExecutionContext, ExecutionResult};
pub use match_result::{Coordinate, DatatableRow, LineLocation, Match, MatchPayload, SymbolRecord};
pub use rule::{
    AiInstruction, Condition, Instructions, ManualInstruction, OpenRewriteInstruction,
    Precondition, Rule, SOURCE_LABEL, TARGET_LABEL,
};
pub use task::{MigrationTask, PreconditionStatus, ProviderKind};
