//! The scanner abstraction shared by every back-end.

use camino::Utf8Path;
use mt_core::{
    Config, MapContext, MapperRegistry, Match, MatchIdGenerator, Query, RoutingTable,
    ScannerKind, ScannerRequest,
};

use crate::error::ScanError;

/// A back-end able to execute certain queries against a project.
///
/// Implementations must be cheap to call `supports` on; the registry probes
/// every scanner during resolution.
pub trait Scanner: Send + Sync {
    /// The kind of this scanner.
    fn kind(&self) -> ScannerKind;

    /// Returns `true` if this scanner can execute the query.
    fn supports(&self, query: &Query) -> bool;

    /// Executes the query. An empty result is a valid outcome.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] describing why the query could not be executed.
    fn scan(&self, ctx: &ScanContext<'_>, query: &Query) -> Result<Vec<Match>, ScanError>;
}

/// Everything a scanner needs besides the query itself.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// Run configuration.
    pub config: &'a Config,
    /// Project being analysed.
    pub project_root: &'a Utf8Path,
    /// Rule on whose behalf the query runs.
    pub rule_id: &'a str,
    /// Routing table in effect.
    pub routing: &'a RoutingTable,
    /// Mapper dispatch table.
    pub mappers: &'a MapperRegistry,
    /// Match-id generator of the run.
    pub ids: &'a MatchIdGenerator,
}

impl ScanContext<'_> {
    /// Maps the query into the native request of the given scanner.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Core`] for routing or mapping failures.
    pub fn request(&self, scanner: ScannerKind, query: &Query) -> Result<ScannerRequest, ScanError> {
        let entry = self.routing.resolve(&query.resource_kind, &query.symbol)?;
        let ctx = MapContext {
            rule_id: self.rule_id,
            ids: self.ids,
        };
        Ok(self.mappers.map(entry.shape, scanner, query, &ctx)?)
    }
}

/// Builds the error for a request variant a scanner cannot handle.
pub(crate) fn unexpected_request(scanner: ScannerKind, request: &ScannerRequest) -> ScanError {
    ScanError::illegal_state(format!("{scanner} scanner cannot execute {request:?}"))
}
