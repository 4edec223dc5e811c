//! Symbol-server scanner backed by a Java language server.
//!
//! The language server client is an external collaborator reached through
//! the [`SymbolServer`] trait. Requests use the rule-entry command with an
//! argument object `{project, query, location, analysisMode}`; responses are
//! LSP `SymbolInformation` arrays.

use std::sync::Arc;

use mt_core::{Match, MatchPayload, Query, ScannerKind, ScannerRequest, SymbolRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ScanError;
use crate::scanner::{ScanContext, Scanner, unexpected_request};

/// Workspace command executed for every lookup.
pub const RULE_ENTRY_COMMAND: &str = "io.konveyor.tackle.ruleEntry";

/// Analysis mode sent with every lookup.
pub const ANALYSIS_MODE: &str = "source-only";

/// Sends workspace commands to a running symbol server.
pub trait SymbolServer: Send + Sync {
    /// Executes a workspace command and returns its raw result.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::SymbolServer`] if the server rejects or fails the command.
    fn execute_command(&self, command: &str, arguments: &[Value]) -> Result<Value, ScanError>;
}

/// Translates a query symbol to the server's location code.
///
/// # Examples
///
/// ```
/// use mt_scanner::location_code;
///
/// assert_eq!(location_code("annotation"), Some(4));
/// assert_eq!(location_code("class"), Some(14));
/// assert_eq!(location_code("widget"), None);
/// ```
#[must_use]
pub fn location_code(symbol: &str) -> Option<u32> {
    let code = match symbol {
        "inheritance" => 1,
        "method_call" => 2,
        "constructor_call" => 3,
        "annotation" => 4,
        "implements_type" => 5,
        "enum_constant" => 6,
        "return_type" => 7,
        "import" => 8,
        "variable_declaration" => 9,
        "type" => 10,
        "package" => 11,
        "field" => 12,
        "method" => 13,
        "class" => 14,
        _ => return None,
    };
    Some(code)
}

/// Argument object of a rule-entry command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEntryRequest {
    /// Project kind, always `java`.
    pub project: String,
    /// Symbol name or pattern.
    pub query: String,
    /// Location code as a string.
    pub location: String,
    /// Analysis mode.
    pub analysis_mode: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInformation {
    name: String,
    kind: u32,
    location: SymbolLocation,
    #[serde(default)]
    container_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SymbolLocation {
    uri: String,
    range: SymbolRange,
}

#[derive(Debug, Deserialize)]
struct SymbolRange {
    start: SymbolPosition,
}

#[derive(Debug, Deserialize)]
struct SymbolPosition {
    line: u32,
}

/// Executes Java symbol queries against a [`SymbolServer`].
#[derive(Clone)]
pub struct JdtlsScanner {
    server: Arc<dyn SymbolServer>,
}

impl JdtlsScanner {
    /// Creates a scanner talking to `server`.
    #[must_use]
    pub fn new(server: Arc<dyn SymbolServer>) -> Self {
        Self { server }
    }
}

impl std::fmt::Debug for JdtlsScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdtlsScanner").finish_non_exhaustive()
    }
}

impl Scanner for JdtlsScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Jdtls
    }

    fn supports(&self, query: &Query) -> bool {
        query.resource_kind == "java"
    }

    fn scan(&self, ctx: &ScanContext<'_>, query: &Query) -> Result<Vec<Match>, ScanError> {
        let request = match ctx.request(self.kind(), query)? {
            ScannerRequest::Symbol(request) => request,
            other => return Err(unexpected_request(self.kind(), &other)),
        };

        let location = location_code(&request.symbol).ok_or_else(|| {
            ScanError::illegal_state(format!(
                "symbol '{}' has no location code on the symbol server",
                request.symbol
            ))
        })?;

        let arguments = RuleEntryRequest {
            project: "java".to_owned(),
            query: request.query,
            location: location.to_string(),
            analysis_mode: ANALYSIS_MODE.to_owned(),
        };
        let arguments = serde_json::to_value(&arguments)
            .map_err(|e| ScanError::SymbolServer(format!("cannot encode request: {e}")))?;

        debug!(rule_id = ctx.rule_id, location, "querying symbol server");
        let response = self
            .server
            .execute_command(RULE_ENTRY_COMMAND, std::slice::from_ref(&arguments))?;

        let symbols: Vec<SymbolInformation> = match response {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other)
                .map_err(|e| ScanError::SymbolServer(format!("unexpected response: {e}")))?,
        };

        Ok(symbols
            .into_iter()
            .map(|symbol| {
                Match::new(
                    symbol.location.uri.clone(),
                    ScannerKind::Jdtls,
                    MatchPayload::Symbol(SymbolRecord {
                        name: symbol.name,
                        kind: symbol.kind,
                        uri: symbol.location.uri,
                        line: symbol.location.range.start.line,
                        container: symbol.container_name,
                    }),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_documented_location_code() {
        let expected = [
            ("inheritance", 1),
            ("method_call", 2),
            ("constructor_call", 3),
            ("annotation", 4),
            ("implements_type", 5),
            ("enum_constant", 6),
            ("return_type", 7),
            ("import", 8),
            ("variable_declaration", 9),
            ("type", 10),
            ("package", 11),
            ("field", 12),
            ("method", 13),
            ("class", 14),
        ];
        for (symbol, code) in expected {
            assert_eq!(location_code(symbol), Some(code), "{symbol}");
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = RuleEntryRequest {
            project: "java".to_owned(),
            query: "org.acme.*".to_owned(),
            location: "4".to_owned(),
            analysis_mode: ANALYSIS_MODE.to_owned(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "project": "java",
                "query": "org.acme.*",
                "location": "4",
                "analysisMode": "source-only"
            })
        );
    }
}
