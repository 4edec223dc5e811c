//! Rule matching engine.
//!
//! [`CodeScannerService`] evaluates a rule in two steps. The precondition,
//! when declared, runs first; if it produces no real match the rule is
//! recorded as not satisfied and its condition is skipped. The condition is
//! then evaluated according to its [`QueryExpr`] shape:
//!
//! - `Leaf`: the query's matches.
//! - `All`: the union of every branch, but only if every branch matched.
//! - `Any`: the union of the branches that matched.
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use mt_core::{Config, catalog};
//! use mt_scanner::{CodeScannerService, ScannerRegistry, SystemToolRunner};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let registry = ScannerRegistry::standard(Arc::new(SystemToolRunner), None);
//! let service = CodeScannerService::new(Utf8Path::new("./my-app"), config, registry)?;
//!
//! let rules = catalog::load_rules(Utf8Path::new("./rules"))?;
//! for outcome in service.scan_rules(&rules) {
//!     match outcome.result {
//!         Ok(scan) => println!("{}: {} matches", outcome.rule_id, scan.matches.len()),
//!         Err(e) => eprintln!("{}: {e}", outcome.rule_id),
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use mt_core::{
    Config, FxHashMap, MapperRegistry, Match, MatchIdGenerator, MigrationTask, PreconditionStatus,
    ProviderKind, Query, QueryExpr, RoutingTable, Rule,
};
use tracing::{debug, info, warn};

use crate::error::ScanError;
use crate::registry::ScannerRegistry;
use crate::scanner::ScanContext;

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleScan {
    /// The rule id, which keys the match group.
    pub rule_id: String,
    /// Outcome of the precondition.
    pub precondition: PreconditionStatus,
    /// Matches of the condition, empty if the rule did not match.
    pub matches: Vec<Match>,
}

impl RuleScan {
    /// Returns `true` if the rule's condition matched.
    #[inline]
    #[must_use]
    pub fn is_matched(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Binds the scan to its rule, producing a task for the given provider.
    #[must_use]
    pub fn into_task(self, rule: Rule, provider: ProviderKind) -> MigrationTask {
        MigrationTask::new(rule, provider)
            .with_precondition(self.precondition)
            .with_matches(self.matches)
    }
}

/// Per-rule outcome of a batch scan. One failing rule does not abort the batch.
#[derive(Debug)]
pub struct RuleOutcome {
    /// The rule id.
    pub rule_id: String,
    /// The scan, or the reason the rule could not be evaluated.
    pub result: Result<RuleScan, ScanError>,
}

/// Evaluates rules against one project.
#[derive(Debug)]
pub struct CodeScannerService {
    project_root: Utf8PathBuf,
    config: Config,
    registry: ScannerRegistry,
    routing: RoutingTable,
    mappers: MapperRegistry,
    ids: Arc<MatchIdGenerator>,
}

impl CodeScannerService {
    /// Creates a service using the configured routing table and the built-in mappers.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Core`] if a routing entry has no mapper.
    pub fn new(
        project_root: &Utf8Path,
        config: Config,
        registry: ScannerRegistry,
    ) -> Result<Self, ScanError> {
        Self::with_mappers(project_root, config, registry, MapperRegistry::builtin())
    }

    /// Creates a service with a custom mapper table.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Core`] if a routing entry has no mapper.
    pub fn with_mappers(
        project_root: &Utf8Path,
        config: Config,
        registry: ScannerRegistry,
        mappers: MapperRegistry,
    ) -> Result<Self, ScanError> {
        let routing = config.routing();
        mappers.validate(&routing)?;
        Ok(Self {
            project_root: project_root.to_path_buf(),
            config,
            registry,
            routing,
            mappers,
            ids: Arc::new(MatchIdGenerator::new()),
        })
    }

    /// Shares a match-id generator with other phases of the run.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<MatchIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// The match-id generator of this run.
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &Arc<MatchIdGenerator> {
        &self.ids
    }

    /// The project being analysed.
    #[inline]
    #[must_use]
    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    /// The run configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Executes a single query on behalf of `rule_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] if the query cannot be routed, resolved, mapped
    /// or executed.
    pub fn scan_query(&self, rule_id: &str, query: &Query) -> Result<Vec<Match>, ScanError> {
        let entry = self.routing.resolve(&query.resource_kind, &query.symbol)?;
        let configured = self.config.scan.default_scanner.or(Some(entry.scanner));
        let scanner = self.registry.resolve(query, configured)?;

        let ctx = ScanContext {
            config: &self.config,
            project_root: &self.project_root,
            rule_id,
            routing: &self.routing,
            mappers: &self.mappers,
            ids: &self.ids,
        };
        debug!(rule_id, query = %query, scanner = %scanner.kind(), "executing query");
        scanner.scan(&ctx, query)
    }

    /// Evaluates one rule.
    ///
    /// An unsatisfied precondition is not an error: the rule is returned with
    /// [`PreconditionStatus::NotSatisfied`] and no matches.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] if the rule's condition is malformed or one of
    /// its queries fails.
    pub fn scan_rule(&self, rule: &Rule) -> Result<RuleScan, ScanError> {
        let rule_id = rule.rule_id.as_str();
        let expr = rule.query()?;

        let precondition = match rule.precondition_query()? {
            None => PreconditionStatus::NotDeclared,
            Some(query) => {
                let satisfied = self
                    .scan_query(rule_id, &query)?
                    .iter()
                    .any(|m| !m.is_sentinel());
                if satisfied {
                    PreconditionStatus::Satisfied
                } else {
                    info!(rule_id, precondition = %query, "precondition not satisfied");
                    return Ok(RuleScan {
                        rule_id: rule_id.to_owned(),
                        precondition: PreconditionStatus::NotSatisfied,
                        matches: Vec::new(),
                    });
                }
            }
        };

        let matches = match &expr {
            QueryExpr::Leaf(query) => self.scan_query(rule_id, query)?,
            QueryExpr::All(queries) => {
                let mut all = Vec::new();
                for query in queries {
                    let branch = self.scan_query(rule_id, query)?;
                    if branch.is_empty() {
                        debug!(rule_id, branch = %query, "AND branch matched nothing");
                        all.clear();
                        break;
                    }
                    all.extend(branch);
                }
                all
            }
            QueryExpr::Any(queries) => {
                let mut any = Vec::new();
                for query in queries {
                    any.extend(self.scan_query(rule_id, query)?);
                }
                any
            }
        };

        info!(rule_id, matches = matches.len(), "rule evaluated");
        Ok(RuleScan {
            rule_id: rule_id.to_owned(),
            precondition,
            matches,
        })
    }

    /// Evaluates every rule, in order, collecting per-rule outcomes.
    pub fn scan_rules(&self, rules: &[Rule]) -> Vec<RuleOutcome> {
        rules
            .iter()
            .map(|rule| {
                let result = self.scan_rule(rule);
                if let Err(e) = &result {
                    warn!(rule_id = %rule.rule_id, error = %e, "rule evaluation failed");
                }
                RuleOutcome {
                    rule_id: rule.rule_id.clone(),
                    result,
                }
            })
            .collect()
    }

    /// Evaluates every rule and groups the matches by rule id.
    ///
    /// Rules that fail or do not match are absent from the map.
    pub fn match_groups(&self, rules: &[Rule]) -> FxHashMap<String, Vec<Match>> {
        self.scan_rules(rules)
            .into_iter()
            .filter_map(|outcome| {
                let scan = outcome.result.ok()?;
                scan.is_matched().then_some((outcome.rule_id, scan.matches))
            })
            .collect()
    }
}
