//! AST-search scanner driving the OpenRewrite Maven plugin.
//!
//! For each query the scanner writes a single-recipe composite document,
//! runs the plugin in dry-run mode with data table export enabled, then reads
//! the CSV tables the run produced and keeps the rows tagged with the
//! query's match id. Tables that existed before the run are ignored. The
//! recipe document is removed once the run is over, whatever its outcome.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use mt_core::{
    CompositeRecipe, FxHashSet, Match, MatchPayload, Query, ScannerKind, ScannerRequest,
    recipe_translation,
};
use tracing::{debug, info, warn};

use crate::datatable::{read_rows, table_files};
use crate::error::ScanError;
use crate::scanner::{ScanContext, Scanner, unexpected_request};
use crate::toolchain::{SystemToolRunner, ToolInvocation, ToolRunner};

/// Runs search recipes through the OpenRewrite Maven plugin.
#[derive(Clone)]
pub struct OpenRewriteScanner {
    runner: Arc<dyn ToolRunner>,
}

impl OpenRewriteScanner {
    /// Creates a scanner that runs the build tool through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    /// Runs a written scan recipe and collects the rows tagged with `match_id`
    /// from the data tables the run produced.
    fn run_recipe(
        &self,
        ctx: &ScanContext<'_>,
        recipe_name: &str,
        recipe_path: &Utf8Path,
        match_id: &str,
    ) -> Result<Vec<Match>, ScanError> {
        let tables_dir = ctx.project_root.join(&ctx.config.rewrite.datatables_dir);
        let before: FxHashSet<Utf8PathBuf> = table_files(&tables_dir)?.into_iter().collect();

        let invocation = scan_invocation(ctx, recipe_name, recipe_path);
        info!(rule_id = ctx.rule_id, match_id, "running search recipe");
        let output = self.runner.run(&invocation)?;
        if !output.success() {
            return Err(ScanError::Tool {
                tool: invocation.program,
                status: output.status,
                output: output.lines,
            });
        }

        let mut matches = Vec::new();
        for table in table_files(&tables_dir)?
            .into_iter()
            .filter(|t| !before.contains(t))
        {
            let source = table
                .strip_prefix(ctx.project_root)
                .unwrap_or(&table)
                .to_string();
            for row in read_rows(&table, match_id)? {
                let source_id = row
                    .column("Source path")
                    .or_else(|| row.column("sourcePath"))
                    .map_or_else(|| source.clone(), str::to_owned);
                matches.push(Match::new(
                    source_id,
                    ScannerKind::OpenRewrite,
                    MatchPayload::Datatable(row),
                ));
            }
        }
        Ok(matches)
    }
}

impl Default for OpenRewriteScanner {
    fn default() -> Self {
        Self::new(Arc::new(SystemToolRunner))
    }
}

impl std::fmt::Debug for OpenRewriteScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRewriteScanner").finish_non_exhaustive()
    }
}

/// Builds the dry-run invocation for a scan recipe document.
#[must_use]
pub fn scan_invocation(
    ctx: &ScanContext<'_>,
    recipe_name: &str,
    config_location: &Utf8Path,
) -> ToolInvocation {
    let rewrite = &ctx.config.rewrite;
    ToolInvocation {
        program: rewrite.maven_command.clone(),
        args: vec![
            "-B".to_owned(),
            format!(
                "org.openrewrite.maven:rewrite-maven-plugin:{}:dryRun",
                rewrite.plugin_version
            ),
            format!("-Drewrite.activeRecipes={recipe_name}"),
            format!(
                "-Drewrite.recipeArtifactCoordinates={}",
                rewrite.search_recipe_artifacts.join(",")
            ),
            format!("-Drewrite.configLocation={config_location}"),
            "-Drewrite.exportDatatables=true".to_owned(),
        ],
        working_dir: ctx.project_root.to_path_buf(),
        timeout: Duration::from_secs(rewrite.timeout_secs),
    }
}

impl Scanner for OpenRewriteScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::OpenRewrite
    }

    fn supports(&self, query: &Query) -> bool {
        recipe_translation(&query.key()).is_some()
    }

    fn scan(&self, ctx: &ScanContext<'_>, query: &Query) -> Result<Vec<Match>, ScanError> {
        let recipe = match ctx.request(self.kind(), query)? {
            ScannerRequest::Recipe(recipe) => recipe,
            other => return Err(unexpected_request(self.kind(), &other)),
        };
        let match_id = recipe
            .match_id()
            .ok_or_else(|| ScanError::illegal_state(format!("recipe {} has no match id", recipe.name)))?
            .to_owned();

        let recipe_name = format!("dev.mtool.scan.{match_id}");
        let document = CompositeRecipe::new(&recipe_name, &match_id, query.to_string())
            .with_recipe(&recipe)
            .to_yaml()?;
        debug!(match_id = %match_id, recipe = %recipe.name, "writing scan recipe");

        let recipe_dir = ctx.project_root.join(&ctx.config.rewrite.scan_recipe_dir);
        std::fs::create_dir_all(&recipe_dir).map_err(|e| ScanError::write(&recipe_dir, e))?;
        let recipe_path = recipe_dir.join(format!("scan-{match_id}.yml"));
        std::fs::write(&recipe_path, document).map_err(|e| ScanError::write(&recipe_path, e))?;

        let result = self.run_recipe(ctx, &recipe_name, &recipe_path, &match_id);
        if let Err(e) = std::fs::remove_file(&recipe_path) {
            warn!(path = %recipe_path, error = %e, "failed to remove scan recipe");
        }
        let matches = result?;

        debug!(match_id = %match_id, matches = matches.len(), "search recipe finished");
        Ok(matches)
    }
}
