//! Migration rules as they appear in the rule catalog.
//!
//! ```yaml
//! - ruleID: springboot-to-quarkus-00010
//!   category: mandatory
//!   effort: 1
//!   order: 1
//!   labels:
//!     - konveyor.io/source=springboot
//!     - konveyor.io/target=quarkus
//!   description: Replace the Spring Boot starter
//!   precondition:
//!     name: pom.dependency
//!     pattern: gavs='org.springframework.boot:spring-boot'
//!   when:
//!     condition: java.annotation is 'org.springframework.boot.autoconfigure.SpringBootApplication'
//!   instructions:
//!     manual:
//!       - todo: Remove the @SpringBootApplication annotation
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::CoreError;
use crate::query::{Query, QueryExpr, parse_condition, parse_precondition};

/// Label key carrying the source technology.
pub const SOURCE_LABEL: &str = "konveyor.io/source";

/// Label key carrying the target technology.
pub const TARGET_LABEL: &str = "konveyor.io/target";

/// One migration rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique id within the catalog.
    #[serde(rename = "ruleID")]
    pub rule_id: String,

    /// Execution and display sequence; also names the generated recipe file.
    #[serde(default)]
    pub order: i32,

    /// Category, e.g. `mandatory` or `optional`.
    #[serde(default)]
    pub category: String,

    /// Estimated effort.
    #[serde(default)]
    pub effort: u32,

    /// `key=value` tags.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Free text.
    #[serde(default)]
    pub description: String,

    /// Query that must match before the condition is evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<Precondition>,

    /// The match condition.
    pub when: Condition,

    /// Remediation instructions.
    #[serde(default)]
    pub instructions: Instructions,
}

/// A rule precondition: a `kind.symbol` name and a parameter pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    /// `resource_kind.symbol` of the precondition query.
    pub name: String,
    /// Parameter list or single value.
    pub pattern: String,
}

/// The `when` block of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition expression, see [`parse_condition`].
    pub condition: String,
}

/// Instruction lists of a rule, grouped by provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instructions {
    /// AI assistant instructions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ai: Vec<AiInstruction>,
    /// OpenRewrite recipe instructions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub openrewrite: Vec<OpenRewriteInstruction>,
    /// Manual checklist instructions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manual: Vec<ManualInstruction>,
}

impl Instructions {
    /// Returns `true` if no instruction of any kind is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ai.is_empty() && self.openrewrite.is_empty() && self.manual.is_empty()
    }
}

/// Tasks for the AI assistant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiInstruction {
    /// System prompt framing the tasks.
    pub prompt: String,
    /// Tasks sent one by one.
    pub tasks: Vec<String>,
}

/// Recipes to run with the OpenRewrite build-tool plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenRewriteInstruction {
    /// Composite recipe name.
    pub name: String,
    /// Composite recipe description.
    pub description: String,
    /// Coordinates of the recipe artifacts.
    pub gav: Vec<String>,
    /// Precondition entries passed through to the composite.
    pub preconditions: Vec<Value>,
    /// Recipe entries passed through to the composite.
    pub recipe_list: Vec<Value>,
}

/// A manual checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInstruction {
    /// What the developer must do.
    pub todo: String,
}

impl Rule {
    /// Parses the rule's condition.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidQuery`] if the condition is malformed.
    pub fn query(&self) -> Result<QueryExpr, CoreError> {
        parse_condition(&self.when.condition)
    }

    /// Builds the precondition query, if the rule declares one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidQuery`] if the precondition is malformed.
    pub fn precondition_query(&self) -> Result<Option<Query>, CoreError> {
        self.precondition
            .as_ref()
            .map(|p| parse_precondition(&p.name, &p.pattern))
            .transpose()
    }

    /// Returns the values of every label with the given key.
    pub fn label_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.labels.iter().filter_map(move |label| {
            label
                .split_once('=')
                .filter(|(k, _)| k.trim() == key)
                .map(|(_, v)| v.trim())
        })
    }

    /// Returns `true` if the rule carries both a source and a target label.
    #[must_use]
    pub fn has_technology_labels(&self) -> bool {
        self.label_values(SOURCE_LABEL).next().is_some()
            && self.label_values(TARGET_LABEL).next().is_some()
    }

    /// Returns `true` if the rule migrates from `source` to `target`.
    ///
    /// Label values may carry a version suffix (`springboot3`, `quarkus3+`),
    /// so a value matches when it starts with the requested technology.
    ///
    /// # Examples
    ///
    /// ```
    /// use mt_core::Rule;
    ///
    /// let rule: Rule = serde_yaml::from_str(r"
    /// ruleID: r1
    /// labels: [konveyor.io/source=springboot, konveyor.io/target=quarkus3]
    /// when: { condition: java.annotation is 'x' }
    /// ").unwrap();
    ///
    /// assert!(rule.targets("springboot", "quarkus"));
    /// assert!(!rule.targets("springboot", "micronaut"));
    /// ```
    #[must_use]
    pub fn targets(&self, source: &str, target: &str) -> bool {
        let has = |key: &str, tech: &str| {
            self.label_values(key)
                .any(|value| value.to_ascii_lowercase().starts_with(&tech.to_ascii_lowercase()))
        };
        has(SOURCE_LABEL, source) && has(TARGET_LABEL, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: &str = r"
ruleID: springboot-to-quarkus-00010
category: mandatory
effort: 2
order: 3
labels:
  - konveyor.io/source=springboot
  - konveyor.io/target=quarkus
description: Replace the Spring Boot application class
precondition:
  name: pom.dependency
  pattern: gavs='org.springframework.boot:spring-boot'
when:
  condition: java.annotation is 'org.springframework.boot.autoconfigure.SpringBootApplication'
instructions:
  ai:
    - prompt: You are a Quarkus expert
      tasks:
        - Remove the SpringBootApplication annotation
  openrewrite:
    - name: Replace SpringBootApplication
      description: Replace the main class
      gav:
        - dev.snowdrop:openrewrite-recipes:1.0.0
      recipeList:
        - org.openrewrite.java.RemoveAnnotation:
            annotationPattern: '@org.springframework.boot.autoconfigure.SpringBootApplication'
  manual:
    - todo: Check the application properties
";

    #[test]
    fn test_deserialize_full_rule() {
        let rule: Rule = serde_yaml::from_str(RULE).unwrap();
        assert_eq!(rule.rule_id, "springboot-to-quarkus-00010");
        assert_eq!(rule.order, 3);
        assert_eq!(rule.effort, 2);
        assert_eq!(rule.instructions.ai[0].tasks.len(), 1);
        assert_eq!(rule.instructions.openrewrite[0].recipe_list.len(), 1);
        assert_eq!(rule.instructions.manual[0].todo, "Check the application properties");
        assert!(rule.has_technology_labels());
    }

    #[test]
    fn test_rule_queries() {
        let rule: Rule = serde_yaml::from_str(RULE).unwrap();
        let expr = rule.query().unwrap();
        assert!(expr.queries()[0].is("java", "annotation"));

        let pre = rule.precondition_query().unwrap().unwrap();
        assert!(pre.is("pom", "dependency"));
        assert_eq!(pre.param("gavs"), Some("org.springframework.boot:spring-boot"));
    }

    #[test]
    fn test_minimal_rule_defaults() {
        let rule: Rule =
            serde_yaml::from_str("ruleID: r\nwhen:\n  condition: file.name is '*.xml'\n").unwrap();
        assert!(rule.instructions.is_empty());
        assert!(rule.precondition_query().unwrap().is_none());
        assert!(!rule.has_technology_labels());
        assert!(!rule.targets("springboot", "quarkus"));
    }
}
