//! Error types for the mt-core crate.
//!
//! This module provides two error types:
//!
//! - [`CoreError`] for routing, query mapping, query parsing and match-id
//!   generation failures
//! - [`ConfigError`] for configuration and rule catalog loading failures
//!
//! Both are programmer/configuration errors: callers are expected to fail the
//! single rule or task that triggered them and carry on with the rest of the run.

use camino::Utf8PathBuf;

/// Errors raised while routing and mapping queries.
///
/// # Examples
///
/// ```
/// use mt_core::CoreError;
///
/// let error = CoreError::missing_parameter("name", "java.annotation");
/// assert!(error.to_string().contains("'name'"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A routing or mapping entry is missing, or the tables are inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A query lacks a parameter that its mapper requires.
    #[error("query {query} is missing required parameter '{key}'")]
    MissingParameter {
        /// The missing parameter name.
        key: String,
        /// The `kind.symbol` of the offending query.
        query: String,
    },

    /// A configured scanner id is not known to the registry.
    #[error("unsupported scanner type '{0}'")]
    UnsupportedScannerType(String),

    /// The match-id counter for a rule went past its ceiling.
    #[error("match id sequence exhausted for rule '{rule_id}' (maximum {max})")]
    SequenceExhausted {
        /// The rule whose counter overflowed.
        rule_id: String,
        /// The highest value the counter may produce.
        max: u32,
    },

    /// A condition string could not be parsed into a query expression.
    #[error("invalid query '{input}': {reason}")]
    InvalidQuery {
        /// The input that failed to parse.
        input: String,
        /// Explanation of the failure.
        reason: String,
    },
}

impl CoreError {
    /// Creates a new [`CoreError::Configuration`] error.
    #[inline]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new [`CoreError::MissingParameter`] error.
    #[inline]
    pub fn missing_parameter(key: impl Into<String>, query: impl Into<String>) -> Self {
        Self::MissingParameter {
            key: key.into(),
            query: query.into(),
        }
    }

    /// Creates a new [`CoreError::InvalidQuery`] error.
    #[inline]
    pub fn invalid_query(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during configuration and rule catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a JSON configuration file.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse a YAML rule file.
    #[error("failed to parse rules in {path}: {source}")]
    Yaml {
        /// The rule file being parsed.
        path: Utf8PathBuf,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A rule in the catalog is invalid.
    #[error(transparent)]
    Rule(#[from] CoreError),
}

impl ConfigError {
    /// Creates a new [`ConfigError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_display() {
        let error = CoreError::missing_parameter("name", "java.annotation");
        let msg = error.to_string();
        assert!(msg.contains("java.annotation"));
        assert!(msg.contains("'name'"));
    }

    #[test]
    fn test_sequence_exhausted_display() {
        let error = CoreError::SequenceExhausted {
            rule_id: "rule-1".to_owned(),
            max: 999,
        };
        let msg = error.to_string();
        assert!(msg.contains("rule-1"));
        assert!(msg.contains("999"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("migration.provider", "unknown provider 'foo'");
        let msg = error.to_string();
        assert!(msg.contains("migration.provider"));
        assert!(msg.contains("unknown provider"));
    }

    #[test]
    fn test_rule_error_is_transparent() {
        let error = ConfigError::from(CoreError::configuration("duplicate ruleID 'x'"));
        assert_eq!(error.to_string(), "configuration error: duplicate ruleID 'x'");
    }
}
