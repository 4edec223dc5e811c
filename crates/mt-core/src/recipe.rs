//! Recipe payloads for the OpenRewrite build-tool plugin.
//!
//! A [`RecipeSpec`] is one recipe with ordered options. A [`CompositeRecipe`]
//! is the YAML document the plugin loads through `-Drewrite.configLocation`,
//! bundling several recipe entries under one activatable name.
//!
//! Recipe entries inside a `recipeList` are kept as raw YAML values: either a
//! bare recipe name or a single-key mapping of recipe name to options.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::CoreError;

/// The `type` discriminator of a declarative recipe document.
pub const RECIPE_DOCUMENT_TYPE: &str = "specs.openrewrite.org/v1beta/recipe";

/// Option carrying the match id of a search recipe.
pub const MATCH_ID_OPTION: &str = "matchId";

/// One recipe with options in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSpec {
    /// Fully qualified recipe name.
    pub name: String,
    /// Options, in the order they are written to the recipe document.
    pub options: Vec<(String, Value)>,
}

impl RecipeSpec {
    /// Creates a recipe with no options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    /// Appends an option, returning the recipe.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Returns an option value by key.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the match id option, if the recipe carries one.
    #[must_use]
    pub fn match_id(&self) -> Option<&str> {
        self.option(MATCH_ID_OPTION).and_then(Value::as_str)
    }

    /// Option keys in order.
    pub fn option_keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(k, _)| k.as_str())
    }

    /// Renders the recipe as a `recipeList` entry.
    #[must_use]
    pub fn to_entry(&self) -> Value {
        if self.options.is_empty() {
            return Value::String(self.name.clone());
        }

        let options: Mapping = self
            .options
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect();

        let mut entry = Mapping::new();
        entry.insert(Value::String(self.name.clone()), Value::Mapping(options));
        Value::Mapping(entry)
    }

    /// Reads a recipe back from a `recipeList` entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if the entry is neither a string nor
    /// a single-key mapping with mapping (or empty) options.
    pub fn from_entry(entry: &Value) -> Result<Self, CoreError> {
        match entry {
            Value::String(name) => Ok(Self::new(name.clone())),
            Value::Mapping(map) if map.len() == 1 => {
                let Some((Value::String(name), options)) = map.iter().next() else {
                    return Err(CoreError::configuration("recipe entry name must be a string"));
                };

                let options = match options {
                    Value::Null => Vec::new(),
                    Value::Mapping(options) => options
                        .iter()
                        .map(|(k, v)| {
                            k.as_str().map(|k| (k.to_owned(), v.clone())).ok_or_else(|| {
                                CoreError::configuration(format!(
                                    "recipe '{name}' has a non-string option key"
                                ))
                            })
                        })
                        .collect::<Result<_, _>>()?,
                    _ => {
                        return Err(CoreError::configuration(format!(
                            "options of recipe '{name}' must be a mapping"
                        )));
                    }
                };

                Ok(Self {
                    name: name.clone(),
                    options,
                })
            }
            _ => Err(CoreError::configuration(
                "recipe entry must be a name or a single-key mapping",
            )),
        }
    }
}

/// A declarative composite recipe document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeRecipe {
    /// Always [`RECIPE_DOCUMENT_TYPE`].
    #[serde(rename = "type")]
    pub document_type: String,
    /// Name used to activate the composite.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Preconditions applied to the whole composite.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<Value>,
    /// The bundled recipe entries, passed through unchanged.
    #[serde(default)]
    pub recipe_list: Vec<Value>,
}

impl CompositeRecipe {
    /// Creates an empty composite.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            document_type: RECIPE_DOCUMENT_TYPE.to_owned(),
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            preconditions: Vec::new(),
            recipe_list: Vec::new(),
        }
    }

    /// Appends raw recipe entries.
    #[must_use]
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = Value>) -> Self {
        self.recipe_list.extend(entries);
        self
    }

    /// Appends one recipe.
    #[must_use]
    pub fn with_recipe(mut self, recipe: &RecipeSpec) -> Self {
        self.recipe_list.push(recipe.to_entry());
        self
    }

    /// Appends precondition entries.
    #[must_use]
    pub fn with_preconditions(mut self, entries: impl IntoIterator<Item = Value>) -> Self {
        self.preconditions.extend(entries);
        self
    }

    /// Parses every entry of the recipe list.
    ///
    /// # Errors
    ///
    /// Propagates the first malformed entry.
    pub fn recipes(&self) -> Result<Vec<RecipeSpec>, CoreError> {
        self.recipe_list.iter().map(RecipeSpec::from_entry).collect()
    }

    /// Serializes the document to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, CoreError> {
        serde_yaml::to_string(self)
            .map_err(|e| CoreError::configuration(format!("cannot serialize recipe '{}': {e}", self.name)))
    }

    /// Parses a document from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if the YAML is malformed or the
    /// `type` discriminator is wrong.
    pub fn from_yaml(yaml: &str) -> Result<Self, CoreError> {
        let recipe: Self = serde_yaml::from_str(yaml)
            .map_err(|e| CoreError::configuration(format!("invalid recipe document: {e}")))?;
        if recipe.document_type != RECIPE_DOCUMENT_TYPE {
            return Err(CoreError::configuration(format!(
                "unexpected recipe document type '{}'",
                recipe.document_type
            )));
        }
        Ok(recipe)
    }
}
