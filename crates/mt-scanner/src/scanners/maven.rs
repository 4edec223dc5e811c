//! Dependency-manifest scanner reading `pom.xml` files directly.
//!
//! Coordinates in the query are split on commas, then on colons. A malformed
//! coordinate does not fail the query: it contributes a sentinel match with an
//! empty coordinate, which callers can detect with [`Match::is_sentinel`].

use std::sync::LazyLock;

use mt_core::{Coordinate, Match, MatchPayload, Query, ScannerKind, ScannerRequest};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::scanner::{ScanContext, Scanner, unexpected_request};
use crate::walker::FileWalker;

static DEPENDENCY: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>"));

static COMMENT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->"));

static EXCLUSIONS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)<exclusions>.*?</exclusions>"));

static TAG: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"<(groupId|artifactId|version)>\s*([^<]*?)\s*</(?:groupId|artifactId|version)>"));

fn pattern(re: &'static LazyLock<Result<Regex, regex::Error>>) -> Result<&'static Regex, ScanError> {
    re.as_ref()
        .map_err(|e| ScanError::illegal_state(format!("built-in pattern failed to compile: {e}")))
}

/// Extracts the dependencies declared in a POM.
///
/// Commented-out dependencies and `<exclusions>` entries are ignored.
/// Dependencies without a group or artifact are skipped.
///
/// # Errors
///
/// Returns [`ScanError::IllegalState`] only if a built-in pattern fails to compile.
pub fn declared_dependencies(pom: &str) -> Result<Vec<Coordinate>, ScanError> {
    let dependency = pattern(&DEPENDENCY)?;
    let exclusions = pattern(&EXCLUSIONS)?;
    let tag = pattern(&TAG)?;
    let pom = pattern(&COMMENT)?.replace_all(pom, "");

    Ok(dependency
        .captures_iter(&pom)
        .filter_map(|block| {
            let body = exclusions.replace_all(block.get(1)?.as_str(), "");
            let mut coordinate = Coordinate::empty();
            for caps in tag.captures_iter(&body) {
                let value = caps.get(2).map_or("", |m| m.as_str()).to_owned();
                match caps.get(1).map(|m| m.as_str()) {
                    Some("groupId") => coordinate.group_id = value,
                    Some("artifactId") => coordinate.artifact_id = value,
                    Some("version") => coordinate.version = Some(value),
                    _ => {}
                }
            }
            (!coordinate.group_id.is_empty() && !coordinate.artifact_id.is_empty())
                .then_some(coordinate)
        })
        .collect())
}

/// Scans `pom.xml` files for declared dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct MavenScanner;

impl Scanner for MavenScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Maven
    }

    fn supports(&self, query: &Query) -> bool {
        query.is("pom", "dependency")
    }

    fn scan(&self, ctx: &ScanContext<'_>, query: &Query) -> Result<Vec<Match>, ScanError> {
        let gavs = match ctx.request(self.kind(), query)? {
            ScannerRequest::Dependency(request) => request.gavs,
            other => return Err(unexpected_request(self.kind(), &other)),
        };

        let mut matches = Vec::new();
        let mut searches = Vec::new();
        for raw in gavs.split(',').filter(|s| !s.trim().is_empty()) {
            match Coordinate::parse(raw) {
                Some(coordinate) => searches.push(coordinate),
                None => {
                    warn!(rule_id = ctx.rule_id, coordinate = raw.trim(), "malformed dependency coordinate");
                    matches.push(Match::sentinel(raw.trim()));
                }
            }
        }
        if searches.is_empty() {
            return Ok(matches);
        }

        let walker = FileWalker::new(ctx.project_root)?
            .with_skip_dirs(&ctx.config.scan.skip_dirs)
            .with_follow_links(ctx.config.scan.follow_links)
            .with_glob("pom.xml")?;

        for pom in walker.collect_paths()? {
            let text = match std::fs::read_to_string(&pom) {
                Ok(text) => text,
                Err(e) => {
                    let err = ScanError::read(&pom, e);
                    warn!(error = %err, "skipping unreadable manifest");
                    continue;
                }
            };

            let source = walker.relative(&pom).to_string();
            for declared in declared_dependencies(&text)? {
                if searches.iter().any(|search| search.matches(&declared)) {
                    debug!(pom = %source, dependency = %declared, "dependency matched");
                    matches.push(Match::new(
                        source.clone(),
                        ScannerKind::Maven,
                        MatchPayload::Dependency(declared),
                    ));
                }
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r"
<project>
  <parent>
    <groupId>org.springframework.boot</groupId>
    <artifactId>spring-boot-starter-parent</artifactId>
  </parent>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
    <dependency>
      <groupId> org.projectlombok </groupId>
      <artifactId>lombok</artifactId>
      <version>1.18.30</version>
      <scope>provided</scope>
    </dependency>
    <dependency>
      <artifactId>orphan</artifactId>
    </dependency>
  </dependencies>
</project>
";

    #[test]
    fn test_declared_dependencies() {
        let deps = declared_dependencies(POM).unwrap();
        assert_eq!(
            deps,
            vec![
                Coordinate::new("org.springframework.boot", "spring-boot-starter-web", None),
                Coordinate::new("org.projectlombok", "lombok", Some("1.18.30".to_owned())),
            ]
        );
    }

    #[test]
    fn test_supports_only_pom_dependency() {
        assert!(MavenScanner.supports(&Query::new("pom", "dependency")));
        assert!(!MavenScanner.supports(&Query::new("java", "annotation")));
    }
}
