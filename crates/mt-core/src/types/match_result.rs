//! Scanner findings.
//!
//! Every scanner returns [`Match`] records. The payload type depends on the
//! scanner that produced the match, so consumers match on
//! [`Match::scanner`] or on the payload variant.

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::routing::ScannerKind;

/// One scanner finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// The file or tool that reported the finding.
    pub source_id: String,
    /// The scanner that produced the finding.
    pub scanner: ScannerKind,
    /// Scanner-specific result data.
    pub payload: MatchPayload,
}

impl Match {
    /// Creates a match.
    #[must_use]
    pub fn new(source_id: impl Into<String>, scanner: ScannerKind, payload: MatchPayload) -> Self {
        Self {
            source_id: source_id.into(),
            scanner,
            payload,
        }
    }

    /// The placeholder match the dependency scanner returns for a malformed coordinate.
    #[must_use]
    pub fn sentinel(source_id: impl Into<String>) -> Self {
        Self::new(
            source_id,
            ScannerKind::Maven,
            MatchPayload::Dependency(Coordinate::empty()),
        )
    }

    /// Returns `true` for the empty-coordinate placeholder.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(&self.payload, MatchPayload::Dependency(c) if c.is_empty())
    }
}

/// Scanner-specific result data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchPayload {
    /// A symbol server record.
    Symbol(SymbolRecord),
    /// A row of an OpenRewrite data table.
    Datatable(DatatableRow),
    /// A declared dependency.
    Dependency(Coordinate),
    /// A file or a line within a file.
    Location(LineLocation),
}

/// A symbol reported by the symbol server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Symbol name.
    pub name: String,
    /// Server-defined symbol kind code.
    pub kind: u32,
    /// Document URI.
    pub uri: String,
    /// Zero-based start line.
    pub line: u32,
    /// Enclosing type or package, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

/// One data table row, columns in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatableRow {
    /// Value of the `matchId` column.
    pub match_id: String,
    /// `(header, value)` pairs.
    pub columns: Vec<(String, String)>,
}

impl DatatableRow {
    /// Returns a column value by header.
    #[must_use]
    pub fn column(&self, header: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }
}

/// A `group:artifact[:version]` coordinate.
///
/// # Examples
///
/// ```
/// use mt_core::Coordinate;
///
/// let c = Coordinate::parse("org.springframework.boot:spring-boot-starter-web:3.1.0").unwrap();
/// assert_eq!(c.artifact_id, "spring-boot-starter-web");
/// assert_eq!(c.version.as_deref(), Some("3.1.0"));
///
/// assert!(Coordinate::parse("not-a-coordinate").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
    /// Version, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Coordinate {
    /// Creates a coordinate.
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
        }
    }

    /// The empty coordinate.
    #[must_use]
    pub fn empty() -> Self {
        Self::new("", "", None)
    }

    /// Returns `true` if group and artifact are both empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group_id.is_empty() && self.artifact_id.is_empty()
    }

    /// Parses `group:artifact` or `group:artifact:version`.
    ///
    /// Returns `None` for any other shape or an empty component.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.trim().split(':').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [group, artifact] => Some(Self::new(*group, *artifact, None)),
            [group, artifact, version] => {
                Some(Self::new(*group, *artifact, Some((*version).to_owned())))
            }
            _ => None,
        }
    }

    /// Returns `true` if `declared` satisfies this coordinate used as a search.
    ///
    /// Group and artifact must be equal. The version is only compared when
    /// this coordinate carries one.
    #[must_use]
    pub fn matches(&self, declared: &Self) -> bool {
        self.group_id == declared.group_id
            && self.artifact_id == declared.artifact_id
            && self
                .version
                .as_ref()
                .is_none_or(|v| declared.version.as_ref() == Some(v))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

/// A file, or a line within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineLocation {
    /// Path relative to the project root.
    pub path: Utf8PathBuf,
    /// One-based line number, 0 for file-name matches.
    pub line: u32,
    /// One-based column of the first match on the line, 0 for file-name matches.
    pub column: u32,
    /// The matching line, empty for file-name matches.
    #[serde(default)]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_parse() {
        assert_eq!(
            Coordinate::parse(" g : a "),
            Some(Coordinate::new("g", "a", None))
        );
        assert!(Coordinate::parse("g:a:v:x").is_none());
        assert!(Coordinate::parse("g::v").is_none());
        assert!(Coordinate::parse("").is_none());
    }

    #[test]
    fn test_coordinate_matches_ignores_missing_version() {
        let search = Coordinate::new("g", "a", None);
        assert!(search.matches(&Coordinate::new("g", "a", Some("1.0".to_owned()))));
        assert!(search.matches(&Coordinate::new("g", "a", None)));

        let pinned = Coordinate::new("g", "a", Some("2.0".to_owned()));
        assert!(!pinned.matches(&Coordinate::new("g", "a", Some("1.0".to_owned()))));
        assert!(!pinned.matches(&Coordinate::new("g", "a", None)));
    }

    #[test]
    fn test_coordinate_display() {
        assert_eq!(Coordinate::new("g", "a", None).to_string(), "g:a");
        assert_eq!(
            Coordinate::new("g", "a", Some("1".to_owned())).to_string(),
            "g:a:1"
        );
    }

    #[test]
    fn test_sentinel() {
        let m = Match::sentinel("pom.xml");
        assert!(m.is_sentinel());
        assert_eq!(m.scanner, ScannerKind::Maven);

        let real = Match::new(
            "pom.xml",
            ScannerKind::Maven,
            MatchPayload::Dependency(Coordinate::new("g", "a", None)),
        );
        assert!(!real.is_sentinel());
    }

    #[test]
    fn test_payload_serialization_is_tagged() {
        let m = Match::new(
            "src/App.java",
            ScannerKind::File,
            MatchPayload::Location(LineLocation {
                path: "src/App.java".into(),
                line: 3,
                column: 1,
                text: "import javax.ejb.Stateless;".to_owned(),
            }),
        );
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["payload"]["type"], "location");
        assert_eq!(json["scanner"], "file");

        let back: Match = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
