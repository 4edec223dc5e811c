//! Migration providers for the mtool migration engine.
//!
//! A provider turns a matched [`MigrationTask`](mt_core::MigrationTask) into
//! changes to the project. Each instruction kind has one provider:
//!
//! - [`OpenRewriteProvider`]: bundles the rule's recipes into a composite
//!   document and runs the OpenRewrite Maven plugin on it
//! - [`AiProvider`]: hands each task to a tool-calling [`ChatAssistant`]
//!   that edits files through [`FileTools`]
//! - [`ManualProvider`]: reports the rule's checklist
//!
//! Providers never fail outright. Every error ends up in a failed
//! [`ExecutionResult`](mt_core::ExecutionResult) whose detail log shows the
//! subprocess output or tool calls that led to it.
//!
//! # Architecture
//!
//! ```text
//! ProviderRegistry::execute(task, ctx)
//!     │
//!     ├── OpenRewriteProvider
//!     │       ├── CompositeRecipe -> rewrite-<order>.yml
//!     │       └── ProcessRunner (mvn rewrite:run | rewrite:dryRun)
//!     │
//!     ├── AiProvider
//!     │       ├── ChatAssistant (tool call | final reply)
//!     │       └── FileTools (read_file, write_file)
//!     │
//!     └── ManualProvider
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mt_core::{Config, ExecutionContext, MigrationTask, ProviderKind};
//! use mt_provider::{ProviderRegistry, TokioProcessRunner};
//!
//! # async fn run(rule: mt_core::Rule) {
//! let registry = ProviderRegistry::standard(Arc::new(TokioProcessRunner), None);
//! let ctx = ExecutionContext::from_config("/work/app", &Config::default());
//! let task = MigrationTask::new(rule, ProviderKind::OpenRewrite);
//!
//! let result = registry.execute(&task, &ctx).await;
//! println!("{}: {}", result.success, result.message);
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod assistant;
mod error;
mod process;
mod provider;
mod providers;
mod registry;
mod tools;

pub use assistant::{
    AssistantReply, ChatAssistant, ChatMessage, ChatRequest, ProcessAssistant, Role,
    ToolDefinition,
};
pub use error::ProviderError;
pub use process::{ProcessOutput, ProcessRunner, ProcessSpec, TokioProcessRunner, command};
pub use provider::MigrationProvider;
pub use providers::{
    AiProvider, ManualProvider, OpenRewriteProvider, REWRITE_PLUGIN, composite_for,
    recipe_file_name, rewrite_command,
};
pub use registry::ProviderRegistry;
pub use tools::{FileTools, READ_FILE, WRITE_FILE};
