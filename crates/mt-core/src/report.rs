//! Export of a run's scan and transform outcome.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::MigrationTask;

/// Aggregate document of one run, keyed by rule id.
///
/// # Examples
///
/// ```
/// use mt_core::MigrationReport;
///
/// let report = MigrationReport::new("Spring Boot to Quarkus", "/work/app");
/// let json = report.to_json().unwrap();
/// assert!(json.contains("\"projectPath\": \"/work/app\""));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Report title.
    pub title: String,
    /// Analysed project.
    pub project_path: Utf8PathBuf,
    /// When the report was created.
    pub timestamp: DateTime<Utc>,
    /// Tasks keyed by rule id.
    pub tasks: BTreeMap<String, MigrationTask>,
}

impl MigrationReport {
    /// Creates an empty report stamped with the current time.
    #[must_use]
    pub fn new(title: impl Into<String>, project_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            title: title.into(),
            project_path: project_path.into(),
            timestamp: Utc::now(),
            tasks: BTreeMap::new(),
        }
    }

    /// Adds a task under its rule id, replacing any previous one.
    pub fn insert(&mut self, task: MigrationTask) {
        self.tasks.insert(task.rule.rule_id.clone(), task);
    }

    /// Tasks whose condition matched.
    pub fn matched(&self) -> impl Iterator<Item = &MigrationTask> {
        self.tasks.values().filter(|t| t.is_matched())
    }

    /// Number of executed tasks that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| t.result.as_ref().is_some_and(|r| !r.success))
            .count()
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a report from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the report to a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| ConfigError::io(path, e))
    }
}
