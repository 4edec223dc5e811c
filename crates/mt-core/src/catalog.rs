//! Rule catalog loading.
//!
//! A catalog is a YAML file holding a list of rules, or a directory of such
//! files. Rules are returned sorted by `order`; ties keep file order.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::{ConfigError, CoreError};
use crate::hash::fx_hash_set;
use crate::types::Rule;

/// Loads every rule from a file or a directory of `*.yaml` / `*.yml` files.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for unreadable paths, [`ConfigError::Yaml`] for
/// malformed files, and [`ConfigError::Rule`] for duplicate rule ids.
pub fn load_rules(path: &Utf8Path) -> Result<Vec<Rule>, ConfigError> {
    let files = if path.is_dir() {
        rule_files(path)?
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        return Err(ConfigError::InvalidPath {
            path: path.to_path_buf(),
            reason: "not a file or directory".to_owned(),
        });
    };

    let mut rules = Vec::new();
    for file in &files {
        let text = std::fs::read_to_string(file).map_err(|e| ConfigError::io(file, e))?;
        let parsed = parse_rules(&text, file)?;
        debug!(file = %file, rules = parsed.len(), "loaded rule file");
        rules.extend(parsed);
    }

    finish(rules)
}

/// Parses the rules of one YAML document.
///
/// The document may be a list of rules or a single rule.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] with `origin` as the path.
pub fn parse_rules(text: &str, origin: &Utf8Path) -> Result<Vec<Rule>, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
        path: origin.to_path_buf(),
        source,
    })?;

    let to_error = |source| ConfigError::Yaml {
        path: origin.to_path_buf(),
        source,
    };
    match value {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::Sequence(_) => serde_yaml::from_value(value).map_err(to_error),
        other => serde_yaml::from_value::<Rule>(other)
            .map(|rule| vec![rule])
            .map_err(to_error),
    }
}

fn rule_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ConfigError> {
    let entries = dir.read_dir_utf8().map_err(|e| ConfigError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && matches!(path.extension(), Some("yaml" | "yml")) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn finish(mut rules: Vec<Rule>) -> Result<Vec<Rule>, ConfigError> {
    let mut seen = fx_hash_set();
    for rule in &rules {
        if !seen.insert(rule.rule_id.as_str()) {
            return Err(CoreError::configuration(format!("duplicate ruleID '{}'", rule.rule_id)).into());
        }
    }

    rules.sort_by_key(|rule| rule.order);
    Ok(rules)
}
