//! Core types, errors, and utilities for the migration tool.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - The query model and the rule condition parser
//! - The routing table and the `(shape, scanner)` mapper dispatch table
//! - OpenRewrite recipe payloads and composite recipe documents
//! - Rules, matches, migration tasks and execution results
//! - The per-rule match-id generator
//! - Configuration, rule catalog loading and report export
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

pub mod catalog;
pub mod config;
pub mod error;
pub mod hash;
pub mod mapping;
pub mod match_id;
pub mod query;
pub mod recipe;
pub mod report;
pub mod routing;
pub mod types;

pub use catalog::{load_rules, parse_rules};
pub use config::{Config, MigrationConfig, RewriteConfig, ScanConfig};
pub use error::{ConfigError, CoreError};
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use mapping::{
    DependencyRequest, FileRequest, MapContext, MapperFn, MapperRegistry, RecipeTranslation,
    ScannerRequest, SymbolRequest, recipe_translation,
};
pub use match_id::{MAX_SEQUENCE, MatchIdGenerator};
pub use query::{Query, QueryExpr, QueryParams, parse_condition, parse_precondition};
pub use recipe::{CompositeRecipe, MATCH_ID_OPTION, RECIPE_DOCUMENT_TYPE, RecipeSpec};
pub use report::MigrationReport;
pub use routing::{ResultShape, RoutingEntry, RoutingTable, ScannerKind};
pub use types::{
    AiInstruction, Condition, Coordinate, DatatableRow, ExecutionContext, ExecutionResult,
    Instructions, LineLocation, ManualInstruction, Match, MatchPayload, MigrationTask,
    OpenRewriteInstruction, Precondition, PreconditionStatus, ProviderKind, Rule, SymbolRecord,
};
