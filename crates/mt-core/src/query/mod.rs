//! The query model: what a rule asks a scanner to look for.
//!
//! A [`Query`] is a `(resource_kind, symbol, parameters)` triple such as
//! `java.annotation is (name='org.springframework.stereotype.Service')`.
//! Parameters are caller-defined, untyped strings kept in insertion order,
//! because the AST-tool mapping must preserve that order when it emits recipe
//! options.
//!
//! Rules combine queries through a [`QueryExpr`]: a single leaf, an all-of
//! (`AND`) list, or an any-of (`OR`) list. Expressions are flat; the rule
//! catalog never nests them.

mod parse;

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;

pub use parse::{parse_condition, parse_precondition};

/// Ordered query parameters. Most queries carry one to four of them.
pub type QueryParams = SmallVec<[(String, String); 4]>;

/// One search intent against the codebase.
///
/// # Examples
///
/// ```
/// use mt_core::Query;
///
/// let query = Query::new("java", "annotation")
///     .with_param("name", "org.springframework.boot.autoconfigure.SpringBootApplication");
///
/// assert_eq!(query.key(), "java.annotation");
/// assert_eq!(
///     query.param("name"),
///     Some("org.springframework.boot.autoconfigure.SpringBootApplication")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// The kind of resource searched, e.g. `java`, `pom` or `file`.
    pub resource_kind: String,

    /// The symbol searched within the resource, e.g. `annotation` or `dependency`.
    pub symbol: String,

    /// Named parameters in the order the rule author wrote them.
    #[serde(default)]
    pub parameters: QueryParams,
}

impl Query {
    /// Creates a query with no parameters.
    #[must_use]
    pub fn new(resource_kind: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            symbol: symbol.into(),
            parameters: SmallVec::new(),
        }
    }

    /// Adds or replaces a parameter, returning the query.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(key, value);
        self
    }

    /// Adds a parameter, or replaces the value in place if the key exists.
    ///
    /// Replacing keeps the original position so the insertion order stays stable.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.parameters.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.parameters.push((key, value));
        }
    }

    /// Returns the value of a parameter, if present.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of a parameter that a mapper cannot do without.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingParameter`] naming the key when it is absent.
    pub fn require(&self, key: &str) -> Result<&str, CoreError> {
        self.param(key)
            .ok_or_else(|| CoreError::missing_parameter(key, self.key()))
    }

    /// Iterates over the parameters in insertion order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the routing key, `resource_kind.symbol`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}.{}", self.resource_kind, self.symbol)
    }

    /// Returns `true` if this query targets the given resource kind and symbol.
    #[must_use]
    pub fn is(&self, resource_kind: &str, symbol: &str) -> bool {
        self.resource_kind == resource_kind && self.symbol == symbol
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} is (", self.resource_kind, self.symbol)?;
        for (i, (key, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}='{value}'")?;
        }
        f.write_str(")")
    }
}

/// A rule's boolean match condition.
///
/// # Examples
///
/// ```
/// use mt_core::{parse_condition, QueryExpr};
///
/// let expr = parse_condition(
///     "java.annotation is 'org.acme.A' OR java.annotation is 'org.acme.B'",
/// ).unwrap();
/// assert!(matches!(expr, QueryExpr::Any(ref branches) if branches.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryExpr {
    /// A single query; its matches are the rule's matches.
    Leaf(Query),
    /// Every branch must match; matches are surfaced only if all do.
    All(Vec<Query>),
    /// At least one branch must match; matches of non-empty branches are surfaced.
    Any(Vec<Query>),
}

impl QueryExpr {
    /// Returns every query in the expression, in branch order.
    #[must_use]
    pub fn queries(&self) -> &[Query] {
        match self {
            Self::Leaf(query) => std::slice::from_ref(query),
            Self::All(queries) | Self::Any(queries) => queries,
        }
    }
}
