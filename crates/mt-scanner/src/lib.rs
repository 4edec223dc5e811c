//! Scanner federation and rule matching for the mtool migration engine.
//!
//! A rule's condition is a set of [`Query`](mt_core::Query) values. This
//! crate decides which back-end runs each query, translates the query into
//! that back-end's native request, runs it, and combines the results
//! according to the rule's boolean shape.
//!
//! # Overview
//!
//! - [`Scanner`]: capability test plus execution, implemented by four back-ends
//!   - [`MavenScanner`]: declared dependencies read straight from `pom.xml`
//!   - [`JdtlsScanner`]: symbol lookups against a Java language server
//!   - [`OpenRewriteScanner`]: search recipes run through the Maven plugin
//!   - [`FileScanner`]: file-name globs and per-line content regexes
//! - [`LspSymbolServer`]: stdio client for the language server behind [`JdtlsScanner`]
//! - [`ScannerRegistry`]: ordered registration and fail-fast resolution
//! - [`CodeScannerService`]: precondition and `AND`/`OR` evaluation per rule
//!
//! # Architecture
//!
//! ```text
//! CodeScannerService
//!     │
//!     ├── RoutingTable (kind.symbol -> scanner, shape)
//!     │
//!     ├── ScannerRegistry (configured scanner, then first capable)
//!     │       │
//!     │       └── Scanner::scan
//!     │               │
//!     │               ├── MapperRegistry ((shape, scanner) -> request)
//!     │               └── MatchIdGenerator (per-rule counters)
//!     │
//!     └── RuleScan (precondition status + matches)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camino::Utf8Path;
//! use mt_core::{Config, Query};
//! use mt_scanner::{CodeScannerService, ScannerRegistry, SystemToolRunner};
//!
//! let registry = ScannerRegistry::standard(Arc::new(SystemToolRunner), None);
//! let service = CodeScannerService::new(Utf8Path::new("."), Config::default(), registry)?;
//!
//! let query = Query::new("pom", "dependency").with_param("gavs", "org.projectlombok:lombok");
//! let matches = service.scan_query("lombok-00010", &query)?;
//! println!("{} poms declare lombok", matches.len());
//! # Ok::<(), mt_scanner::ScanError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod datatable;
mod engine;
mod error;
pub mod lsp;
mod registry;
mod scanner;
mod scanners;
pub mod toolchain;
mod walker;

pub use engine::{CodeScannerService, RuleOutcome, RuleScan};
pub use error::ScanError;
pub use lsp::LspSymbolServer;
pub use registry::ScannerRegistry;
pub use scanner::{ScanContext, Scanner};
pub use scanners::{
    ANALYSIS_MODE, FileScanner, JdtlsScanner, MavenScanner, OpenRewriteScanner, RULE_ENTRY_COMMAND,
    RuleEntryRequest, SymbolServer, declared_dependencies, location_code, scan_invocation,
};
pub use toolchain::{SystemToolRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use walker::FileWalker;
