//! Configuration structures for the migration tool.
//!
//! - [`ScanConfig`] - Scanner selection and project walking
//! - [`RewriteConfig`] - OpenRewrite build-tool invocation
//! - [`MigrationConfig`] - Provider selection and execution limits
//! - [`Config`] - Root configuration combining all settings
//!
//! Every section implements [`Default`] and deserializes with `#[serde(default)]`,
//! so a configuration file only needs the keys it changes.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::routing::{RoutingTable, ScannerKind};
use crate::types::ProviderKind;

/// Scanner settings.
///
/// # Examples
///
/// ```
/// use mt_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert!(config.default_scanner.is_none());
/// assert!(config.skip_dirs.iter().any(|d| d == "target"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Scanner tried first for every query it supports.
    ///
    /// `None` means each query uses the scanner named by its routing entry.
    pub default_scanner: Option<ScannerKind>,

    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,

    /// Whether to follow symbolic links while walking the project.
    pub follow_links: bool,

    /// Command line of the Java language server answering symbol queries.
    ///
    /// Empty means no symbol-server scanner is registered.
    pub symbol_server_command: Vec<String>,

    /// Extension bundles passed to the language server at initialization.
    pub symbol_server_bundles: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_scanner: None,
            skip_dirs: vec![
                ".git".to_owned(),
                ".idea".to_owned(),
                ".mtool".to_owned(),
                "build".to_owned(),
                "node_modules".to_owned(),
                "target".to_owned(),
            ],
            follow_links: false,
            symbol_server_command: Vec::new(),
            symbol_server_bundles: Vec::new(),
        }
    }
}

/// OpenRewrite build-tool settings shared by the scanner and the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Build tool executable.
    pub maven_command: String,

    /// Version of `org.openrewrite.maven:rewrite-maven-plugin`.
    pub plugin_version: String,

    /// Coordinates of the artifact providing the search recipes.
    pub search_recipe_artifacts: Vec<String>,

    /// Where the plugin exports data tables, relative to the project root.
    pub datatables_dir: String,

    /// Where scan-time recipe documents are written, relative to the project root.
    pub scan_recipe_dir: String,

    /// Upper bound for one scan invocation, in seconds.
    pub timeout_secs: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            maven_command: "mvn".to_owned(),
            plugin_version: "6.1.4".to_owned(),
            search_recipe_artifacts: vec![
                "dev.snowdrop:openrewrite-recipes:1.0.0-SNAPSHOT".to_owned(),
            ],
            datatables_dir: "target/rewrite/datatables".to_owned(),
            scan_recipe_dir: ".mtool".to_owned(),
            timeout_secs: 600,
        }
    }
}

/// Provider settings.
///
/// # Examples
///
/// ```
/// use mt_core::{MigrationConfig, ProviderKind};
///
/// let config = MigrationConfig::default();
/// assert_eq!(config.provider, ProviderKind::Manual);
/// assert_eq!(config.max_tool_rounds, 25);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Provider used for matched rules.
    pub provider: ProviderKind,

    /// Report changes instead of applying them.
    pub dry_run: bool,

    /// Name prefix of generated composite recipes.
    pub recipe_name: String,

    /// Upper bound for one provider execution, in seconds.
    pub timeout_secs: u64,

    /// Maximum assistant tool calls per AI task.
    pub max_tool_rounds: u32,

    /// Command line of the chat assistant process used by the AI provider.
    pub assistant_command: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Manual,
            dry_run: false,
            recipe_name: "dev.mtool.MigrationRecipe".to_owned(),
            timeout_secs: 900,
            max_tool_rounds: 25,
            assistant_command: Vec::new(),
        }
    }
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use mt_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"scan": {"default_scanner": "jdtls"}}"#).unwrap();
/// assert!(config.scan.default_scanner.is_some());
/// assert_eq!(config.rewrite.maven_command, "mvn");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner configuration.
    pub scan: ScanConfig,

    /// OpenRewrite configuration.
    pub rewrite: RewriteConfig,

    /// Provider configuration.
    pub migration: MigrationConfig,

    /// Routing table replacing the built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingTable>,
}

impl Config {
    /// Loads a configuration from a JSON file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Json`] if it is malformed, or [`ConfigError::InvalidOption`]
    /// if a value is out of range.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks option ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rewrite.maven_command.trim().is_empty() {
            return Err(ConfigError::invalid_option("rewrite.maven_command", "must not be empty"));
        }
        if self
            .scan
            .symbol_server_command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(ConfigError::invalid_option(
                "scan.symbol_server_command",
                "program must not be empty",
            ));
        }
        if self.rewrite.timeout_secs == 0 {
            return Err(ConfigError::invalid_option("rewrite.timeout_secs", "must be positive"));
        }
        if self.migration.timeout_secs == 0 {
            return Err(ConfigError::invalid_option("migration.timeout_secs", "must be positive"));
        }
        if self.migration.max_tool_rounds == 0 {
            return Err(ConfigError::invalid_option(
                "migration.max_tool_rounds",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// The routing table in effect: the configured one, or the built-in one.
    #[must_use]
    pub fn routing(&self) -> RoutingTable {
        self.routing.clone().unwrap_or_else(RoutingTable::builtin)
    }
}
