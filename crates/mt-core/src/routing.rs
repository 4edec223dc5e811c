//! Static routing from `(resource_kind, symbol)` to a scanner and result shape.
//!
//! The routing table is loaded once per run and never mutated afterwards.
//! Lookups fall back to the default entry when no specific entry exists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hash::{FxHashMap, fx_hash_map};

/// Identifies a scanner back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    /// AST search through the OpenRewrite build-tool plugin.
    OpenRewrite,
    /// Symbol lookups against a Java language server.
    Jdtls,
    /// Dependency coordinates declared in `pom.xml` files.
    Maven,
    /// File name globs and per-line content regexes.
    File,
}

impl ScannerKind {
    /// Every scanner kind.
    pub const ALL: [Self; 4] = [Self::OpenRewrite, Self::Jdtls, Self::Maven, Self::File];

    /// Returns the configuration id of this scanner.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenRewrite => "openrewrite",
            Self::Jdtls => "jdtls",
            Self::Maven => "maven",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScannerKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnsupportedScannerType(s.to_owned()))
    }
}

/// The shape of request a query maps to, selecting the first level of mapper dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    /// Annotation usages.
    Annotation,
    /// Method declarations or invocations.
    Method,
    /// Class declarations.
    Class,
    /// Any other Java symbol.
    Symbol,
    /// Declared dependency coordinates.
    Dependency,
    /// File names.
    File,
    /// Lines of file content.
    Content,
}

impl ResultShape {
    /// Returns the configuration id of this shape.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::Method => "method",
            Self::Class => "class",
            Self::Symbol => "symbol",
            Self::Dependency => "dependency",
            Self::File => "file",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    /// Scanner that should execute matching queries.
    pub scanner: ScannerKind,
    /// Shape of request the query maps to.
    pub shape: ResultShape,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl RoutingEntry {
    /// Creates a routing entry.
    #[must_use]
    pub fn new(scanner: ScannerKind, shape: ResultShape, description: impl Into<String>) -> Self {
        Self {
            scanner,
            shape,
            description: description.into(),
        }
    }
}

/// Maps `resource_kind.symbol` keys to routing entries.
///
/// # Examples
///
/// ```
/// use mt_core::{RoutingTable, ScannerKind, ResultShape};
///
/// let table = RoutingTable::builtin();
/// let entry = table.resolve("pom", "dependency").unwrap();
/// assert_eq!(entry.scanner, ScannerKind::Maven);
/// assert_eq!(entry.shape, ResultShape::Dependency);
///
/// // Unknown keys use the default entry.
/// let entry = table.resolve("java", "field").unwrap();
/// assert_eq!(entry.scanner, ScannerKind::Jdtls);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    /// Entries keyed by `resource_kind.symbol`.
    #[serde(default)]
    pub entries: FxHashMap<String, RoutingEntry>,

    /// Fallback entry for keys without a specific row.
    #[serde(default)]
    pub default: Option<RoutingEntry>,
}

impl RoutingTable {
    /// Creates an empty table with no default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: fx_hash_map(),
            default: None,
        }
    }

    /// The routing table used when the configuration does not provide one.
    #[must_use]
    pub fn builtin() -> Self {
        use ResultShape as Shape;
        use ScannerKind as Kind;

        Self::new()
            .with_entry(
                "java.annotation",
                RoutingEntry::new(Kind::OpenRewrite, Shape::Annotation, "Find annotation usages"),
            )
            .with_entry(
                "java.method",
                RoutingEntry::new(Kind::OpenRewrite, Shape::Method, "Find method declarations and calls"),
            )
            .with_entry(
                "java.class",
                RoutingEntry::new(Kind::Jdtls, Shape::Class, "Find class declarations"),
            )
            .with_entry(
                "pom.dependency",
                RoutingEntry::new(Kind::Maven, Shape::Dependency, "Find declared Maven dependencies"),
            )
            .with_entry(
                "file.name",
                RoutingEntry::new(Kind::File, Shape::File, "Find files by name"),
            )
            .with_entry(
                "file.content",
                RoutingEntry::new(Kind::File, Shape::Content, "Find lines matching a pattern"),
            )
            .with_default(RoutingEntry::new(Kind::Jdtls, Shape::Symbol, "Java symbol lookup"))
    }

    /// Adds an entry, returning the table.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, entry: RoutingEntry) -> Self {
        self.entries.insert(key.into(), entry);
        self
    }

    /// Sets the default entry, returning the table.
    #[must_use]
    pub fn with_default(mut self, entry: RoutingEntry) -> Self {
        self.default = Some(entry);
        self
    }

    /// Resolves the entry for a resource kind and symbol.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if there is neither a specific entry
    /// nor a default.
    pub fn resolve(&self, resource_kind: &str, symbol: &str) -> Result<&RoutingEntry, CoreError> {
        let key = format!("{resource_kind}.{symbol}");
        self.entries
            .get(&key)
            .or(self.default.as_ref())
            .ok_or_else(|| {
                CoreError::configuration(format!("no routing entry for '{key}' and no default"))
            })
    }

    /// Iterates over every entry, including the default.
    pub fn all_entries(&self) -> impl Iterator<Item = &RoutingEntry> {
        self.entries.values().chain(self.default.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_kind_from_str() {
        assert_eq!("openrewrite".parse::<ScannerKind>().unwrap(), ScannerKind::OpenRewrite);
        assert_eq!("JDTLS".parse::<ScannerKind>().unwrap(), ScannerKind::Jdtls);
        assert_eq!(
            "gradle".parse::<ScannerKind>().unwrap_err(),
            CoreError::UnsupportedScannerType("gradle".to_owned())
        );
    }

    #[test]
    fn test_scanner_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ScannerKind::OpenRewrite).unwrap(),
            r#""openrewrite""#
        );
        assert_eq!(serde_json::to_string(&ResultShape::Content).unwrap(), r#""content""#);
    }

    #[test]
    fn test_builtin_routes() {
        let table = RoutingTable::builtin();
        let entry = table.resolve("java", "annotation").unwrap();
        assert_eq!(entry.scanner, ScannerKind::OpenRewrite);
        assert_eq!(entry.shape, ResultShape::Annotation);

        let entry = table.resolve("file", "content").unwrap();
        assert_eq!(entry.scanner, ScannerKind::File);
        assert_eq!(entry.shape, ResultShape::Content);
    }

    #[test]
    fn test_fallback_to_default() {
        let table = RoutingTable::builtin();
        let entry = table.resolve("java", "enum_constant").unwrap();
        assert_eq!(entry.shape, ResultShape::Symbol);
    }

    #[test]
    fn test_no_default_is_configuration_error() {
        let table = RoutingTable::new().with_entry(
            "pom.dependency",
            RoutingEntry::new(ScannerKind::Maven, ResultShape::Dependency, ""),
        );
        let err = table.resolve("java", "annotation").unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
        assert!(err.to_string().contains("java.annotation"));
    }

    #[test]
    fn test_deserialize_table() {
        let json = r#"{
            "entries": {
                "java.annotation": { "scanner": "jdtls", "shape": "annotation" }
            }
        }"#;
        let table: RoutingTable = serde_json::from_str(json).unwrap();
        assert_eq!(
            table.resolve("java", "annotation").unwrap().scanner,
            ScannerKind::Jdtls
        );
        assert!(table.default.is_none());
    }
}
