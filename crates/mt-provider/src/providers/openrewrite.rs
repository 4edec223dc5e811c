//! AST-tool provider running a rule's recipes through the OpenRewrite Maven plugin.
//!
//! The rule's recipe entries are bundled into one composite document written
//! to `rewrite-<order>.yml` at the project root. The plugin is then invoked
//! with that file as its configuration, in `run` or `dryRun` mode.

use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use mt_core::{
    CompositeRecipe, ExecutionContext, ExecutionResult, MigrationTask, ProviderKind, Rule,
};
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::process::{ProcessRunner, ProcessSpec, TokioProcessRunner};
use crate::provider::MigrationProvider;

/// Maven coordinates of the OpenRewrite plugin, without version.
pub const REWRITE_PLUGIN: &str = "org.openrewrite.maven:rewrite-maven-plugin";

/// Project-relative name of the composite recipe file for a rule order.
///
/// # Examples
///
/// ```
/// assert_eq!(mt_provider::recipe_file_name(10), "rewrite-10.yml");
/// ```
#[must_use]
pub fn recipe_file_name(order: i32) -> String {
    format!("rewrite-{order}.yml")
}

/// Bundles every OpenRewrite instruction of `rule` into one composite.
///
/// Returns `None` if the rule declares no recipe entries.
#[must_use]
pub fn composite_for(rule: &Rule, recipe_name: &str) -> Option<CompositeRecipe> {
    let instructions = &rule.instructions.openrewrite;
    let entries: Vec<_> = instructions
        .iter()
        .flat_map(|i| i.recipe_list.iter().cloned())
        .collect();
    if entries.is_empty() {
        return None;
    }

    let display_name = instructions
        .iter()
        .map(|i| i.name.as_str())
        .find(|n| !n.is_empty())
        .unwrap_or(rule.rule_id.as_str());
    let description = instructions
        .iter()
        .map(|i| i.description.as_str())
        .find(|d| !d.is_empty())
        .unwrap_or(rule.description.as_str());

    Some(
        CompositeRecipe::new(format!("{recipe_name}.{}", rule.rule_id), display_name, description)
            .with_preconditions(
                instructions
                    .iter()
                    .flat_map(|i| i.preconditions.iter().cloned()),
            )
            .with_entries(entries),
    )
}

/// Recipe artifact coordinates of the rule, deduplicated in declaration order.
fn recipe_artifacts(rule: &Rule) -> Vec<String> {
    let mut artifacts: Vec<String> = Vec::new();
    for gav in rule.instructions.openrewrite.iter().flat_map(|i| &i.gav) {
        if !artifacts.contains(gav) {
            artifacts.push(gav.clone());
        }
    }
    artifacts
}

/// Builds the plugin invocation for a written composite recipe file.
#[must_use]
pub fn rewrite_command(
    ctx: &ExecutionContext,
    composite_name: &str,
    recipe_path: &Utf8Path,
    artifacts: &[String],
) -> ProcessSpec {
    let goal = if ctx.dry_run { "dryRun" } else { "run" };
    let report_dir: Utf8PathBuf = ctx
        .project_root
        .join("target/rewrite")
        .join(recipe_path.file_stem().unwrap_or("rewrite"));

    let mut args = vec![
        "-B".to_owned(),
        format!("{REWRITE_PLUGIN}:{}:{goal}", ctx.plugin_version),
        format!("-Drewrite.activeRecipes={composite_name}"),
    ];
    if !artifacts.is_empty() {
        args.push(format!(
            "-Drewrite.recipeArtifactCoordinates={}",
            artifacts.join(",")
        ));
    }
    args.push(format!("-Drewrite.configLocation={recipe_path}"));
    args.push(format!("-DreportOutputDirectory={report_dir}"));

    ProcessSpec {
        program: ctx.maven_command.clone(),
        args,
        working_dir: ctx.project_root.clone(),
        timeout: ctx.timeout,
        echo: ctx.verbose,
    }
}

/// Applies OpenRewrite recipes declared by a rule.
#[derive(Clone)]
pub struct OpenRewriteProvider {
    runner: Arc<dyn ProcessRunner>,
}

impl OpenRewriteProvider {
    /// Creates a provider that runs the build tool through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

impl Default for OpenRewriteProvider {
    fn default() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }
}

impl std::fmt::Debug for OpenRewriteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRewriteProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl MigrationProvider for OpenRewriteProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRewrite
    }

    async fn execute(&self, task: &MigrationTask, ctx: &ExecutionContext) -> ExecutionResult {
        let rule = &task.rule;
        let Some(composite) = composite_for(rule, &ctx.recipe_name) else {
            return ExecutionResult::failure(
                format!("no OpenRewrite recipes defined for rule {}", rule.rule_id),
                Vec::new(),
            );
        };

        let mut details = Vec::new();
        let document = match composite.to_yaml() {
            Ok(document) => document,
            Err(e) => {
                let e = ProviderError::from(e);
                return ExecutionResult::from_error("cannot build recipe document", details, &e);
            }
        };

        let recipe_path = ctx.project_root.join(recipe_file_name(rule.order));
        if let Err(source) = tokio::fs::write(&recipe_path, document).await {
            let e = ProviderError::io(&recipe_path, source);
            return ExecutionResult::from_error("cannot write recipe document", details, &e);
        }
        details.push(format!("wrote recipe document {recipe_path}"));

        let spec = rewrite_command(ctx, &composite.name, &recipe_path, &recipe_artifacts(rule));
        info!(rule_id = %rule.rule_id, dry_run = ctx.dry_run, recipes = composite.recipe_list.len(), "running OpenRewrite");
        details.push(format!("running {spec}"));

        match self.runner.run(&spec).await {
            Ok(output) => {
                let status = output.status;
                details.extend(output.lines);
                if status == 0 {
                    ExecutionResult::success(
                        format!(
                            "applied {} recipe(s) for rule {}",
                            composite.recipe_list.len(),
                            rule.rule_id
                        ),
                        details,
                    )
                } else {
                    warn!(rule_id = %rule.rule_id, status, "OpenRewrite run failed");
                    ExecutionResult::failure(
                        format!("{} exited with status {status}", spec.program),
                        details,
                    )
                }
            }
            Err(e) => {
                warn!(rule_id = %rule.rule_id, error = %e, "OpenRewrite run did not complete");
                details.extend_from_slice(e.output());
                ExecutionResult::from_error(format!("{} did not complete", spec.program), details, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mt_core::{Config, OpenRewriteInstruction};

    use super::*;

    fn rule() -> Rule {
        serde_yaml::from_str(
            r"
ruleID: jpa-00010
order: 10
description: Move to Jakarta Persistence
when:
  condition: java.annotation is 'javax.persistence.Entity'
",
        )
        .unwrap()
    }

    #[test]
    fn test_rewrite_command_line() {
        let mut config = Config::default();
        config.migration.dry_run = true;
        let ctx = ExecutionContext::from_config("/work/app", &config);
        let spec = rewrite_command(
            &ctx,
            "dev.mtool.MigrationRecipe.jpa-00010",
            Utf8Path::new("/work/app/rewrite-10.yml"),
            &["org.openrewrite.recipe:rewrite-migrate-java:2.26.0".to_owned()],
        );
        insta::assert_snapshot!(spec.to_string(), @"mvn -B org.openrewrite.maven:rewrite-maven-plugin:6.1.4:dryRun -Drewrite.activeRecipes=dev.mtool.MigrationRecipe.jpa-00010 -Drewrite.recipeArtifactCoordinates=org.openrewrite.recipe:rewrite-migrate-java:2.26.0 -Drewrite.configLocation=/work/app/rewrite-10.yml -DreportOutputDirectory=/work/app/target/rewrite/rewrite-10");
        assert_eq!(spec.working_dir, "/work/app");
    }

    #[test]
    fn test_run_mode_without_artifacts() {
        let ctx = ExecutionContext::from_config("/work/app", &Config::default());
        let spec = rewrite_command(&ctx, "r", Utf8Path::new("/work/app/rewrite-1.yml"), &[]);
        assert_eq!(spec.args[1], "org.openrewrite.maven:rewrite-maven-plugin:6.1.4:run");
        assert!(!spec.args.iter().any(|a| a.contains("recipeArtifactCoordinates")));
    }

    #[test]
    fn test_composite_bundles_every_instruction() {
        let mut rule = rule();
        let first: serde_yaml::Value =
            serde_yaml::from_str("org.openrewrite.java.migrate.jakarta.JavaxPersistenceToJakartaPersistence").unwrap();
        let second: serde_yaml::Value = serde_yaml::from_str(
            "org.openrewrite.java.ChangePackage: {oldPackageName: javax.persistence, newPackageName: jakarta.persistence}",
        )
        .unwrap();
        rule.instructions.openrewrite = vec![
            OpenRewriteInstruction {
                name: "Jakarta persistence".to_owned(),
                gav: vec!["g:a:1".to_owned()],
                recipe_list: vec![first.clone()],
                ..OpenRewriteInstruction::default()
            },
            OpenRewriteInstruction {
                gav: vec!["g:a:1".to_owned(), "g:b:2".to_owned()],
                recipe_list: vec![second.clone()],
                ..OpenRewriteInstruction::default()
            },
        ];

        let composite = composite_for(&rule, "dev.mtool.MigrationRecipe").unwrap();
        assert_eq!(composite.name, "dev.mtool.MigrationRecipe.jpa-00010");
        assert_eq!(composite.display_name, "Jakarta persistence");
        assert_eq!(composite.description, "Move to Jakarta Persistence");
        assert_eq!(composite.recipe_list, vec![first, second]);
        assert_eq!(recipe_artifacts(&rule), vec!["g:a:1", "g:b:2"]);
    }

    #[test]
    fn test_no_recipes_no_composite() {
        assert!(composite_for(&rule(), "dev.mtool.MigrationRecipe").is_none());
    }
}
