//! Concrete scanner back-ends.

mod file;
mod jdtls;
mod maven;
mod openrewrite;

pub use file::FileScanner;
pub use jdtls::{ANALYSIS_MODE, JdtlsScanner, RULE_ENTRY_COMMAND, RuleEntryRequest, SymbolServer, location_code};
pub use maven::{MavenScanner, declared_dependencies};
pub use openrewrite::{OpenRewriteScanner, scan_invocation};
