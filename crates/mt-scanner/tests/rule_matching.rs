//! Rule evaluation: preconditions, AND/OR semantics and scanner fall-through.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use mt_core::{
    Config, LineLocation, Match, MatchPayload, PreconditionStatus, ProviderKind, Query, Rule,
    ScannerKind, parse_rules,
};
use mt_scanner::{
    CodeScannerService, MavenScanner, ScanContext, ScanError, Scanner, ScannerRegistry,
};

/// Answers `java.*` queries with a fixed number of matches per `name` parameter.
struct FixedScanner {
    kind: ScannerKind,
    hits: HashMap<&'static str, usize>,
    calls: Arc<AtomicUsize>,
}

impl FixedScanner {
    fn new(kind: ScannerKind, hits: &[(&'static str, usize)]) -> Self {
        Self {
            kind,
            hits: hits.iter().copied().collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Scanner for FixedScanner {
    fn kind(&self) -> ScannerKind {
        self.kind
    }

    fn supports(&self, query: &Query) -> bool {
        query.resource_kind == "java"
    }

    fn scan(&self, _ctx: &ScanContext<'_>, query: &Query) -> Result<Vec<Match>, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = query.param("name").unwrap_or_default();
        let count = self.hits.get(name).copied().unwrap_or(0);
        Ok((0..count)
            .map(|i| {
                let path = Utf8PathBuf::from(format!("src/{name}{i}.java"));
                Match::new(
                    path.as_str(),
                    self.kind,
                    MatchPayload::Location(LineLocation {
                        path: path.clone(),
                        line: 1,
                        column: 1,
                        text: String::new(),
                    }),
                )
            })
            .collect())
    }
}

fn rules(yaml: &str) -> Vec<Rule> {
    parse_rules(yaml, Utf8Path::new("test.yaml")).unwrap()
}

fn project() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

const LOGICAL_RULES: &str = r"
- ruleID: both
  order: 1
  when:
    condition: java.class is 'A' AND java.class is 'B'
- ruleID: either
  order: 2
  when:
    condition: java.class is 'A' OR java.class is 'B'
- ruleID: single
  order: 3
  when:
    condition: java.class is 'A'
";

#[test]
fn and_requires_every_branch_or_surfaces_non_empty_ones() {
    let (_dir, root) = project();
    let registry = ScannerRegistry::new()
        .with_scanner(FixedScanner::new(ScannerKind::Jdtls, &[("A", 2), ("B", 0)]));
    let service = CodeScannerService::new(&root, Config::default(), registry).unwrap();

    let outcomes = service.scan_rules(&rules(LOGICAL_RULES));
    let counts: Vec<(String, usize)> = outcomes
        .into_iter()
        .map(|o| (o.rule_id, o.result.unwrap().matches.len()))
        .collect();

    assert_eq!(
        counts,
        vec![
            ("both".to_owned(), 0),
            ("either".to_owned(), 2),
            ("single".to_owned(), 2),
        ]
    );
}

#[test]
fn match_groups_are_keyed_by_rule_id() {
    let (_dir, root) = project();
    let registry = ScannerRegistry::new()
        .with_scanner(FixedScanner::new(ScannerKind::Jdtls, &[("A", 2), ("B", 0)]));
    let service = CodeScannerService::new(&root, Config::default(), registry).unwrap();

    let groups = service.match_groups(&rules(LOGICAL_RULES));
    let mut keys: Vec<&str> = groups.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["either", "single"]);
    assert!(groups["either"].iter().all(|m| m.source_id.starts_with("src/A")));
}

#[test]
fn unsupported_default_scanner_falls_through_to_capable_one() {
    let (_dir, root) = project();
    let mut config = Config::default();
    config.scan.default_scanner = Some(ScannerKind::Maven);

    let registry = ScannerRegistry::new()
        .with_scanner(MavenScanner)
        .with_scanner(FixedScanner::new(ScannerKind::Jdtls, &[("A", 1)]));
    let service = CodeScannerService::new(&root, config, registry).unwrap();

    let matches = service
        .scan_query("rule", &Query::new("java", "class").with_param("name", "A"))
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].scanner, ScannerKind::Jdtls);
}

#[test]
fn unresolvable_rule_fails_alone() {
    let (_dir, root) = project();
    let registry = ScannerRegistry::new()
        .with_scanner(FixedScanner::new(ScannerKind::Jdtls, &[("A", 1)]));
    let service = CodeScannerService::new(&root, Config::default(), registry).unwrap();

    let outcomes = service.scan_rules(&rules(
        r"
- ruleID: content
  when:
    condition: file.content is (pattern='javax')
- ruleID: class
  when:
    condition: java.class is 'A'
",
    ));

    let err = outcomes[0].result.as_ref().unwrap_err();
    assert!(matches!(err, ScanError::NoScannerAvailable { .. }), "{err}");
    assert_eq!(outcomes[1].result.as_ref().unwrap().matches.len(), 1);
}

const PRECONDITION_RULE: &str = r"
- ruleID: lombok-00010
  order: 10
  precondition:
    name: pom.dependency
    pattern: org.projectlombok:lombok
  when:
    condition: java.annotation is 'A'
";

fn write_pom(root: &Utf8Path, dependency: &str) {
    std::fs::write(
        root.join("pom.xml"),
        format!(
            "<project><dependencies><dependency>{dependency}</dependency></dependencies></project>"
        ),
    )
    .unwrap();
}

#[test]
fn unsatisfied_precondition_skips_condition() {
    let (_dir, root) = project();
    write_pom(&root, "<groupId>org.acme</groupId><artifactId>other</artifactId>");

    let scanner = FixedScanner::new(ScannerKind::Jdtls, &[("A", 3)]);
    let calls = Arc::clone(&scanner.calls);
    let registry = ScannerRegistry::new()
        .with_scanner(MavenScanner)
        .with_scanner(scanner);
    let service = CodeScannerService::new(&root, Config::default(), registry).unwrap();

    let rule = &rules(PRECONDITION_RULE)[0];
    let scan = service.scan_rule(rule).unwrap();
    assert_eq!(scan.precondition, PreconditionStatus::NotSatisfied);
    assert!(scan.matches.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let task = scan.into_task(rule.clone(), ProviderKind::Manual);
    assert!(!task.is_matched());
    assert_eq!(task.precondition, PreconditionStatus::NotSatisfied);
}

#[test]
fn satisfied_precondition_evaluates_condition() {
    let (_dir, root) = project();
    write_pom(
        &root,
        "<groupId>org.projectlombok</groupId><artifactId>lombok</artifactId><version>1.18.30</version>",
    );

    let registry = ScannerRegistry::new()
        .with_scanner(MavenScanner)
        .with_scanner(FixedScanner::new(ScannerKind::Jdtls, &[("A", 3)]));
    let service = CodeScannerService::new(&root, Config::default(), registry).unwrap();

    let scan = service.scan_rule(&rules(PRECONDITION_RULE)[0]).unwrap();
    assert_eq!(scan.precondition, PreconditionStatus::Satisfied);
    assert_eq!(scan.matches.len(), 3);
}

#[test]
fn malformed_precondition_coordinate_is_not_satisfied() {
    let (_dir, root) = project();
    write_pom(&root, "<groupId>org.projectlombok</groupId><artifactId>lombok</artifactId>");

    let registry = ScannerRegistry::new()
        .with_scanner(MavenScanner)
        .with_scanner(FixedScanner::new(ScannerKind::Jdtls, &[("A", 3)]));
    let service = CodeScannerService::new(&root, Config::default(), registry).unwrap();

    let rule = &rules(
        r"
- ruleID: broken
  precondition:
    name: pom.dependency
    pattern: lombok
  when:
    condition: java.class is 'A'
",
    )[0];

    let precondition = rule.precondition_query().unwrap().unwrap();
    let raw = service.scan_query("broken", &precondition).unwrap();
    assert_eq!(raw.len(), 1);
    assert!(raw[0].is_sentinel());

    let scan = service.scan_rule(rule).unwrap();
    assert_eq!(scan.precondition, PreconditionStatus::NotSatisfied);
}
