//! CLI entry point for the mtool migration engine.
//!
//! Loads a rule catalog, evaluates every selected rule against a project and,
//! for `transform`, hands each matched rule to a migration provider.
//!
//! # Usage
//!
//! ```bash
//! mtool [OPTIONS] <COMMAND>
//!
//! # List the rules migrating Spring Boot to Quarkus
//! mtool --rules ./rules rules --source springboot --target quarkus
//!
//! # Report which rules match, without changing anything
//! mtool --path ./demo --rules ./rules scan --output report.json
//!
//! # Apply the matched rules' OpenRewrite recipes in dry-run mode
//! mtool --path ./demo --rules ./rules transform --provider openrewrite --dry-run
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use mt_core::{
    Config, ExecutionContext, MigrationReport, PreconditionStatus, ProviderKind, Rule, ScannerKind,
    load_rules,
};
use mt_provider::{ChatAssistant, ProcessAssistant, ProviderRegistry, TokioProcessRunner};
use mt_scanner::{
    CodeScannerService, LspSymbolServer, ScannerRegistry, SymbolServer, SystemToolRunner,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Rule-driven analysis and migration of Java projects.
#[derive(Parser)]
#[command(name = "mtool", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Project to analyse.
    #[arg(short, long, global = true, env = "MTOOL_PATH", default_value = ".")]
    path: Utf8PathBuf,

    /// Rule catalog: one YAML file or a directory of them.
    #[arg(short, long, global = true, env = "MTOOL_RULES", default_value = "rules")]
    rules: Utf8PathBuf,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "MTOOL_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level) and echo build-tool output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Evaluate the rules against the project and report matches.
    Scan {
        /// Rule selection.
        #[command(flatten)]
        selection: Selection,

        /// Scanner tried first for every query it supports.
        #[arg(long, env = "MTOOL_SCANNER")]
        scanner: Option<ScannerKind>,

        /// Write the JSON report to this file.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Evaluate the rules and apply the matched rules' instructions.
    Transform {
        /// Rule selection.
        #[command(flatten)]
        selection: Selection,

        /// Scanner tried first for every query it supports.
        #[arg(long, env = "MTOOL_SCANNER")]
        scanner: Option<ScannerKind>,

        /// Provider executing the matched rules.
        #[arg(long, env = "MTOOL_PROVIDER")]
        provider: Option<ProviderKind>,

        /// Report changes without applying them.
        #[arg(long, env = "MTOOL_DRY_RUN")]
        dry_run: bool,

        /// Write the JSON report to this file.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// List the rules of the catalog.
    Rules {
        /// Rule selection.
        #[command(flatten)]
        selection: Selection,
    },
}

/// Source and target technology filter.
#[derive(Args, Clone, Default)]
struct Selection {
    /// Source technology, e.g. `springboot`.
    #[arg(long, env = "MTOOL_SOURCE", requires = "target")]
    source: Option<String>,

    /// Target technology, e.g. `quarkus`.
    #[arg(long, env = "MTOOL_TARGET", requires = "source")]
    target: Option<String>,
}

impl Selection {
    /// Keeps the rules labelled with both a source and a target technology,
    /// narrowed to the requested pair when one is given.
    fn select(&self, rules: Vec<Rule>) -> Vec<Rule> {
        rules
            .into_iter()
            .filter(Rule::has_technology_labels)
            .filter(|r| match (&self.source, &self.target) {
                (Some(source), Some(target)) => r.targets(source, target),
                _ => true,
            })
            .collect()
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Loads the configuration file, or the defaults when none is given.
fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load configuration {path}")),
        None => Ok(Config::default()),
    }
}

/// Validates the project path and loads the selected rules.
fn load_selection(cli: &Cli, selection: &Selection) -> color_eyre::Result<Vec<Rule>> {
    if !cli.path.is_dir() {
        return Err(eyre!("Project path is not a directory: {}", cli.path));
    }

    let rules = load_rules(&cli.rules)
        .wrap_err_with(|| format!("Failed to load rules from {}", cli.rules))?;
    let total = rules.len();
    let rules = selection.select(rules);
    info!(total, selected = rules.len(), "Loaded rule catalog");
    Ok(rules)
}

/// Creates the scanner registry, starting the symbol server when one is configured.
fn create_registry(root: &Utf8Path, config: &Config) -> color_eyre::Result<ScannerRegistry> {
    let scan = &config.scan;
    let server: Option<Arc<dyn SymbolServer>> = if scan.symbol_server_command.is_empty() {
        warn!(
            "No symbol server configured (scan.symbol_server_command): java queries routed to jdtls, including the default route, have no scanner"
        );
        None
    } else {
        let server =
            LspSymbolServer::spawn(&scan.symbol_server_command, root, &scan.symbol_server_bundles)
                .wrap_err("Failed to start the symbol server")?;
        Some(Arc::new(server))
    };
    Ok(ScannerRegistry::standard(Arc::new(SystemToolRunner), server))
}

/// Creates the rule matching service for the project.
fn create_service(root: &Utf8Path, config: Config) -> color_eyre::Result<CodeScannerService> {
    let registry = create_registry(root, &config)?;
    CodeScannerService::new(root, config, registry)
        .map_err(|e| eyre!("Failed to create scanner service: {}", e))
}

/// Creates the providers, including the AI provider when an assistant is configured.
fn create_providers(root: &Utf8Path, config: &Config) -> color_eyre::Result<ProviderRegistry> {
    let assistant: Option<Arc<dyn ChatAssistant>> = if config.migration.assistant_command.is_empty() {
        None
    } else {
        let assistant = ProcessAssistant::new(&config.migration.assistant_command, root)?;
        Some(Arc::new(assistant))
    };
    Ok(ProviderRegistry::standard(Arc::new(TokioProcessRunner), assistant))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Scans every rule and collects the outcomes into a report.
///
/// Rules that fail to evaluate are logged and left out of the report.
fn scan_into_report(
    service: &CodeScannerService,
    rules: &[Rule],
    provider: ProviderKind,
) -> MigrationReport {
    let mut report = MigrationReport::new("mtool analysis", service.project_root());
    let outcomes = service.scan_rules(rules);

    for (rule, outcome) in rules.iter().zip(outcomes) {
        match outcome.result {
            Ok(scan) => report.insert(scan.into_task(rule.clone(), provider)),
            Err(e) => warn!(rule_id = %outcome.rule_id, error = %e, "Rule evaluation failed"),
        }
    }

    report
}

/// Runs the scan command.
fn run_scan(
    cli: &Cli,
    selection: &Selection,
    scanner: Option<ScannerKind>,
    output: Option<&Utf8Path>,
) -> color_eyre::Result<()> {
    let mut config = load_config(cli)?;
    if scanner.is_some() {
        config.scan.default_scanner = scanner;
    }
    let provider = config.migration.provider;
    let rules = load_selection(cli, selection)?;

    info!(path = %cli.path, rules = rules.len(), "Starting scan");
    let service = create_service(&cli.path, config)?;
    let report = scan_into_report(&service, &rules, provider);

    print_scan_summary(&report, rules.len());
    write_report(&report, output)
}

/// Runs the transform command.
async fn run_transform(
    cli: &Cli,
    selection: &Selection,
    scanner: Option<ScannerKind>,
    provider: Option<ProviderKind>,
    dry_run: bool,
    output: Option<&Utf8Path>,
) -> color_eyre::Result<()> {
    let mut config = load_config(cli)?;
    if scanner.is_some() {
        config.scan.default_scanner = scanner;
    }
    if let Some(provider) = provider {
        config.migration.provider = provider;
    }
    config.migration.dry_run |= dry_run;

    let rules = load_selection(cli, selection)?;
    let ctx = ExecutionContext::from_config(cli.path.clone(), &config).with_verbose(cli.verbose);
    let providers = create_providers(&cli.path, &config)?;

    info!(path = %cli.path, provider = %ctx.provider, dry_run = ctx.dry_run, "Starting transform");
    let service = create_service(&cli.path, config)?;
    let mut report = scan_into_report(&service, &rules, ctx.provider);

    // One matched rule at a time, in catalog order.
    for rule in &rules {
        let Some(mut task) = report.tasks.remove(&rule.rule_id) else {
            continue;
        };
        if task.is_matched() {
            let result = providers.execute(&task, &ctx).await;
            print_result(&task.rule, &result);
            task.result = Some(result);
        }
        report.insert(task);
    }

    write_report(&report, output)?;

    let failures = report.failure_count();
    if failures > 0 {
        return Err(eyre!("{failures} rule(s) failed to transform"));
    }
    Ok(())
}

/// Runs the rules command.
fn run_rules(cli: &Cli, selection: &Selection) -> color_eyre::Result<()> {
    let rules = load_rules(&cli.rules)
        .wrap_err_with(|| format!("Failed to load rules from {}", cli.rules))?;
    let rules = selection.select(rules);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for rule in &rules {
        writeln!(
            handle,
            "{:>5}  {:<40} {:<10} effort {}",
            rule.order, rule.rule_id, rule.category, rule.effort
        )?;
        writeln!(handle, "       when {}", rule.when.condition)?;
        if let Some(precondition) = &rule.precondition {
            writeln!(handle, "       if   {} {}", precondition.name, precondition.pattern)?;
        }
    }
    writeln!(handle)?;
    writeln!(handle, "{} rule(s)", rules.len())?;
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints one line per evaluated rule and a total.
fn print_scan_summary(report: &MigrationReport, selected: usize) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Scan Summary");
    let _ = writeln!(handle, "============");
    let _ = writeln!(handle);
    for task in report.tasks.values() {
        let status = match task.precondition {
            PreconditionStatus::NotSatisfied => "skipped (precondition)".to_owned(),
            _ if task.is_matched() => format!("{} match(es)", task.matches.len()),
            _ => "no match".to_owned(),
        };
        let _ = writeln!(handle, "  {:<40} {status}", task.rule_id());
    }
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Rules selected:  {selected}");
    let _ = writeln!(handle, "Rules evaluated: {}", report.tasks.len());
    let _ = writeln!(handle, "Rules matched:   {}", report.matched().count());
}

/// Prints the outcome of one provider execution.
fn print_result(rule: &Rule, result: &mt_core::ExecutionResult) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let mark = if result.success { "ok" } else { "FAILED" };
    let _ = writeln!(handle, "[{mark}] {} - {}", rule.rule_id, result.message);
    if let Some(error) = &result.error {
        let _ = writeln!(handle, "       {error}");
    }
}

/// Writes the report when an output file was requested.
fn write_report(report: &MigrationReport, output: Option<&Utf8Path>) -> color_eyre::Result<()> {
    if let Some(path) = output {
        report
            .write_to(path)
            .wrap_err_with(|| format!("Failed to write report {path}"))?;
        info!(path = %path, "Report written");
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Scan {
            selection,
            scanner,
            output,
        } => run_scan(&cli, selection, *scanner, output.as_deref()),
        Commands::Transform {
            selection,
            scanner,
            provider,
            dry_run,
            output,
        } => {
            run_transform(&cli, selection, *scanner, *provider, *dry_run, output.as_deref()).await
        }
        Commands::Rules { selection } => run_rules(&cli, selection),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use mt_scanner::Scanner;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transform_arguments() {
        let cli = Cli::try_parse_from([
            "mtool",
            "--path",
            "demo",
            "transform",
            "--provider",
            "openrewrite",
            "--scanner",
            "maven",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.path, "demo");
        let Commands::Transform {
            provider,
            scanner,
            dry_run,
            ..
        } = cli.command
        else {
            panic!("expected transform");
        };
        assert_eq!(provider, Some(ProviderKind::OpenRewrite));
        assert_eq!(scanner, Some(ScannerKind::Maven));
        assert!(dry_run);
    }

    #[test]
    fn test_selection_requires_both_technologies() {
        assert!(Cli::try_parse_from(["mtool", "rules", "--source", "springboot"]).is_err());
    }

    const MIXED_CATALOG: &str = r"
- ruleID: boot-00010
  order: 10
  labels: [konveyor.io/source=springboot, konveyor.io/target=quarkus3]
  when:
    condition: pom.dependency is (gavs='org.springframework.boot:spring-boot-starter-web')
- ruleID: jakarta-00010
  order: 20
  labels: [konveyor.io/source=javaee, konveyor.io/target=jakarta-ee]
  when:
    condition: java.import is 'javax.persistence.*'
- ruleID: untagged-00010
  order: 30
  when:
    condition: file.name is '*.properties'
- ruleID: source-only-00010
  order: 40
  labels: [konveyor.io/source=springboot]
  when:
    condition: file.name is 'application.yml'
";

    fn rule_ids(rules: &[Rule]) -> Vec<&str> {
        rules.iter().map(|r| r.rule_id.as_str()).collect()
    }

    #[test]
    fn test_selection_drops_rules_without_technology_labels() {
        let rules = mt_core::parse_rules(MIXED_CATALOG, Utf8Path::new("mixed.yaml")).unwrap();
        assert_eq!(rules.len(), 4);

        let all = Selection::default().select(rules.clone());
        assert_eq!(rule_ids(&all), ["boot-00010", "jakarta-00010"]);

        let boot = Selection {
            source: Some("springboot".to_owned()),
            target: Some("quarkus".to_owned()),
        }
        .select(rules);
        assert_eq!(rule_ids(&boot), ["boot-00010"]);
    }

    fn query(kind: &str, symbol: &str) -> mt_core::Query {
        mt_core::Query::new(kind, symbol).with_param("name", "java.util.Date")
    }

    #[test]
    fn test_registry_without_symbol_server() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let config = Config::default();

        let registry = create_registry(root, &config).unwrap();
        assert!(!registry.kinds().contains(&ScannerKind::Jdtls));

        let entry = config.routing().resolve("java", "field").unwrap().clone();
        assert_eq!(entry.scanner, ScannerKind::Jdtls);
        assert!(registry.resolve(&query("java", "field"), Some(entry.scanner)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_registry_resolves_default_route() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let initialized = r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#;
        std::fs::write(
            root.join("responses.lsp"),
            format!("Content-Length: {}\r\n\r\n{initialized}", initialized.len()),
        )
        .unwrap();

        let mut config = Config::default();
        config.scan.symbol_server_command = vec![
            "sh".to_owned(),
            "-c".to_owned(),
            "cat responses.lsp; cat > /dev/null".to_owned(),
        ];
        let registry = create_registry(root, &config).unwrap();
        assert_eq!(
            registry.kinds(),
            [
                ScannerKind::Maven,
                ScannerKind::File,
                ScannerKind::Jdtls,
                ScannerKind::OpenRewrite
            ]
        );

        let entry = config.routing().resolve("java", "field").unwrap().clone();
        let scanner = registry
            .resolve(&query("java", "field"), Some(entry.scanner))
            .unwrap();
        assert_eq!(scanner.kind(), ScannerKind::Jdtls);
    }

    #[test]
    fn test_registry_reports_broken_symbol_server() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let mut config = Config::default();
        config.scan.symbol_server_command = vec!["definitely-not-a-real-language-server".to_owned()];

        let err = create_registry(root, &config).unwrap_err();
        assert!(err.to_string().contains("symbol server"), "{err}");
    }
}
