//! Translation of queries into scanner-native requests.
//!
//! Dispatch is a table keyed by `(ResultShape, ScannerKind)`: the shape comes
//! from the routing entry, the scanner kind from whichever scanner the registry
//! resolved. The table is validated against the routing table when the engine
//! is built, so a missing combination fails before any rule runs.
//!
//! OpenRewrite mappers rename query parameters to recipe option names using
//! [`RECIPE_TRANSLATIONS`]. Translated options keep the query's insertion
//! order, followed by a fresh `matchId`, followed by the static defaults.
//! Parameters without a translation are dropped with a warning.

use serde::Serialize;
use tracing::warn;

use crate::error::CoreError;
use crate::hash::{FxHashMap, fx_hash_map};
use crate::match_id::MatchIdGenerator;
use crate::query::Query;
use crate::recipe::{MATCH_ID_OPTION, RecipeSpec};
use crate::routing::{ResultShape, RoutingTable, ScannerKind};

/// Parameter naming a symbol, annotation or file glob.
pub const NAME_PARAM: &str = "name";

/// Parameter holding a content regex.
pub const PATTERN_PARAM: &str = "pattern";

/// Optional file glob restricting a content search.
pub const FILE_PATTERN_PARAM: &str = "filePattern";

/// Parameter holding comma-separated `group:artifact[:version]` coordinates.
pub const GAVS_PARAM: &str = "gavs";

/// Request sent to the symbol server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRequest {
    /// Symbol kind, translated to a location code by the scanner.
    pub symbol: String,
    /// Name or pattern to look up.
    pub query: String,
}

/// Request for declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRequest {
    /// Comma-separated `group:artifact[:version]` coordinates.
    pub gavs: String,
}

/// Request for a file or content search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FileRequest {
    /// Glob matched against paths relative to the project root.
    pub name_pattern: Option<String>,
    /// Regex matched against each line.
    pub content_pattern: Option<String>,
}

/// A scanner-native request.
#[derive(Debug, Clone, PartialEq)]
pub enum ScannerRequest {
    /// A search recipe for the OpenRewrite scanner.
    Recipe(RecipeSpec),
    /// A symbol server lookup.
    Symbol(SymbolRequest),
    /// A dependency manifest lookup.
    Dependency(DependencyRequest),
    /// A file system search.
    File(FileRequest),
}

/// State a mapper may need beyond the query itself.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    /// Rule on whose behalf the query runs.
    pub rule_id: &'a str,
    /// Shared match-id generator of the run.
    pub ids: &'a MatchIdGenerator,
}

/// A mapper function.
pub type MapperFn = fn(&Query, &MapContext<'_>) -> Result<ScannerRequest, CoreError>;

/// Parameter renames and defaults for one OpenRewrite search recipe.
#[derive(Debug, Clone, Copy)]
pub struct RecipeTranslation {
    /// `resource_kind.symbol` the translation applies to.
    pub key: &'static str,
    /// Recipe to run.
    pub recipe: &'static str,
    /// `(query parameter, recipe option)` pairs.
    pub renames: &'static [(&'static str, &'static str)],
    /// Options appended after the match id.
    pub defaults: &'static [(&'static str, bool)],
}

impl RecipeTranslation {
    /// Returns the recipe option name for a query parameter.
    #[must_use]
    pub fn option_for(&self, param: &str) -> Option<&'static str> {
        self.renames
            .iter()
            .find(|(from, _)| *from == param)
            .map(|(_, to)| *to)
    }
}

/// Search recipes known to the OpenRewrite scanner.
pub const RECIPE_TRANSLATIONS: &[RecipeTranslation] = &[
    RecipeTranslation {
        key: "java.annotation",
        recipe: "dev.snowdrop.openrewrite.java.search.FindAnnotations",
        renames: &[("name", "pattern")],
        defaults: &[("matchOnMetaAnnotations", false)],
    },
    RecipeTranslation {
        key: "java.method",
        recipe: "dev.snowdrop.openrewrite.java.search.FindMethods",
        renames: &[("name", "methodPattern")],
        defaults: &[("matchOverrides", false)],
    },
    RecipeTranslation {
        key: "pom.dependency",
        recipe: "dev.snowdrop.openrewrite.maven.search.FindDependency",
        renames: &[
            ("gavs", "gavs"),
            ("groupId", "groupId"),
            ("artifactId", "artifactId"),
            ("version", "version"),
        ],
        defaults: &[],
    },
];

/// Looks up the recipe translation for a `resource_kind.symbol` key.
#[must_use]
pub fn recipe_translation(key: &str) -> Option<&'static RecipeTranslation> {
    RECIPE_TRANSLATIONS.iter().find(|t| t.key == key)
}

/// Dispatch table of mappers.
///
/// # Examples
///
/// ```
/// use mt_core::{MapContext, MapperRegistry, MatchIdGenerator, Query, ResultShape, ScannerKind, ScannerRequest};
///
/// let mappers = MapperRegistry::builtin();
/// let ids = MatchIdGenerator::new();
/// let ctx = MapContext { rule_id: "rule-1", ids: &ids };
///
/// let query = Query::new("java", "annotation").with_param("name", "org.acme.Entity");
/// let request = mappers
///     .map(ResultShape::Annotation, ScannerKind::OpenRewrite, &query, &ctx)
///     .unwrap();
/// let ScannerRequest::Recipe(recipe) = request else { unreachable!() };
/// assert_eq!(recipe.match_id(), Some("rule-1-001"));
/// ```
#[derive(Debug, Clone)]
pub struct MapperRegistry {
    mappers: FxHashMap<(ResultShape, ScannerKind), MapperFn>,
}

impl MapperRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mappers: fx_hash_map(),
        }
    }

    /// The registry with every built-in mapper.
    #[must_use]
    pub fn builtin() -> Self {
        use ResultShape as Shape;
        use ScannerKind as Kind;

        Self::new()
            .with(Shape::Annotation, Kind::OpenRewrite, map_recipe)
            .with(Shape::Method, Kind::OpenRewrite, map_recipe)
            .with(Shape::Dependency, Kind::OpenRewrite, map_recipe)
            .with(Shape::Annotation, Kind::Jdtls, map_symbol)
            .with(Shape::Method, Kind::Jdtls, map_symbol)
            .with(Shape::Class, Kind::Jdtls, map_symbol)
            .with(Shape::Symbol, Kind::Jdtls, map_symbol)
            .with(Shape::Dependency, Kind::Maven, map_dependency)
            .with(Shape::File, Kind::File, map_file_name)
            .with(Shape::Content, Kind::File, map_file_content)
    }

    /// Registers a mapper, returning the registry.
    #[must_use]
    pub fn with(mut self, shape: ResultShape, scanner: ScannerKind, mapper: MapperFn) -> Self {
        self.mappers.insert((shape, scanner), mapper);
        self
    }

    /// Returns `true` if a mapper exists for the combination.
    #[must_use]
    pub fn supports(&self, shape: ResultShape, scanner: ScannerKind) -> bool {
        self.mappers.contains_key(&(shape, scanner))
    }

    /// Maps a query for the given shape and scanner.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if no mapper is registered for the
    /// combination, or whatever the mapper itself reports.
    pub fn map(
        &self,
        shape: ResultShape,
        scanner: ScannerKind,
        query: &Query,
        ctx: &MapContext<'_>,
    ) -> Result<ScannerRequest, CoreError> {
        let mapper = self.mappers.get(&(shape, scanner)).ok_or_else(|| {
            CoreError::configuration(format!(
                "no mapper for {shape} queries on the {scanner} scanner"
            ))
        })?;
        mapper(query, ctx)
    }

    /// Checks that every routing entry has a mapper.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] listing the first missing combination.
    pub fn validate(&self, routing: &RoutingTable) -> Result<(), CoreError> {
        for entry in routing.all_entries() {
            if !self.supports(entry.shape, entry.scanner) {
                return Err(CoreError::configuration(format!(
                    "routing entry '{}' uses {} on {}, which has no mapper",
                    entry.description, entry.shape, entry.scanner
                )));
            }
        }
        Ok(())
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn map_recipe(query: &Query, ctx: &MapContext<'_>) -> Result<ScannerRequest, CoreError> {
    let key = query.key();
    let translation = recipe_translation(&key)
        .ok_or_else(|| CoreError::configuration(format!("no search recipe for '{key}'")))?;

    if query.is("pom", "dependency") {
        if query.param(GAVS_PARAM).is_none() && query.param("groupId").is_none() {
            return Err(CoreError::missing_parameter(GAVS_PARAM, key));
        }
    } else {
        query.require(NAME_PARAM)?;
    }

    let mut recipe = RecipeSpec::new(translation.recipe);
    for (param, value) in query.params() {
        match translation.option_for(param) {
            Some(option) => recipe = recipe.with_option(option, value),
            None => warn!(query = %key, param, "dropping parameter without a recipe option"),
        }
    }

    recipe = recipe.with_option(MATCH_ID_OPTION, ctx.ids.generate(ctx.rule_id)?);
    for (option, value) in translation.defaults {
        recipe = recipe.with_option(*option, *value);
    }

    Ok(ScannerRequest::Recipe(recipe))
}

fn map_symbol(query: &Query, _ctx: &MapContext<'_>) -> Result<ScannerRequest, CoreError> {
    Ok(ScannerRequest::Symbol(SymbolRequest {
        symbol: query.symbol.clone(),
        query: query.require(NAME_PARAM)?.to_owned(),
    }))
}

fn map_dependency(query: &Query, _ctx: &MapContext<'_>) -> Result<ScannerRequest, CoreError> {
    let gavs = if let Some(gavs) = query.param(GAVS_PARAM).or_else(|| query.param(NAME_PARAM)) {
        gavs.to_owned()
    } else if let Some(group) = query.param("groupId") {
        let mut coordinate = group.to_owned();
        if let Some(artifact) = query.param("artifactId") {
            coordinate.push(':');
            coordinate.push_str(artifact);
            if let Some(version) = query.param("version") {
                coordinate.push(':');
                coordinate.push_str(version);
            }
        }
        coordinate
    } else {
        return Err(CoreError::missing_parameter(GAVS_PARAM, query.key()));
    };

    Ok(ScannerRequest::Dependency(DependencyRequest { gavs }))
}

fn map_file_name(query: &Query, _ctx: &MapContext<'_>) -> Result<ScannerRequest, CoreError> {
    Ok(ScannerRequest::File(FileRequest {
        name_pattern: Some(query.require(NAME_PARAM)?.to_owned()),
        content_pattern: None,
    }))
}

fn map_file_content(query: &Query, _ctx: &MapContext<'_>) -> Result<ScannerRequest, CoreError> {
    Ok(ScannerRequest::File(FileRequest {
        name_pattern: query.param(FILE_PATTERN_PARAM).map(str::to_owned),
        content_pattern: Some(query.require(PATTERN_PARAM)?.to_owned()),
    }))
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;
    use crate::routing::RoutingEntry;

    fn recipe_of(request: ScannerRequest) -> RecipeSpec {
        match request {
            ScannerRequest::Recipe(recipe) => recipe,
            other => panic!("expected recipe, got {other:?}"),
        }
    }

    #[test]
    fn test_annotation_recipe_option_order() {
        let ids = MatchIdGenerator::new();
        let ctx = MapContext { rule_id: "r", ids: &ids };
        let query = Query::new("java", "annotation").with_param("name", "org.acme.Entity");

        let recipe = recipe_of(
            MapperRegistry::builtin()
                .map(ResultShape::Annotation, ScannerKind::OpenRewrite, &query, &ctx)
                .unwrap(),
        );

        assert_eq!(recipe.name, "dev.snowdrop.openrewrite.java.search.FindAnnotations");
        assert_eq!(
            recipe.options,
            vec![
                ("pattern".to_owned(), Value::from("org.acme.Entity")),
                ("matchId".to_owned(), Value::from("r-001")),
                ("matchOnMetaAnnotations".to_owned(), Value::from(false)),
            ]
        );
    }

    #[test]
    fn test_untranslatable_params_are_dropped() {
        let ids = MatchIdGenerator::new();
        let ctx = MapContext { rule_id: "r", ids: &ids };
        let query = Query::new("java", "method")
            .with_param("typo", "x")
            .with_param("name", "java.util.List add(..)");

        let recipe = recipe_of(
            MapperRegistry::builtin()
                .map(ResultShape::Method, ScannerKind::OpenRewrite, &query, &ctx)
                .unwrap(),
        );
        assert_eq!(
            recipe.option_keys().collect::<Vec<_>>(),
            vec!["methodPattern", "matchId", "matchOverrides"]
        );
    }

    #[test]
    fn test_missing_name_is_reported() {
        let ids = MatchIdGenerator::new();
        let ctx = MapContext { rule_id: "r", ids: &ids };
        let query = Query::new("java", "annotation").with_param("pattern", "x");

        let err = MapperRegistry::builtin()
            .map(ResultShape::Annotation, ScannerKind::OpenRewrite, &query, &ctx)
            .unwrap_err();
        assert_eq!(err, CoreError::missing_parameter("name", "java.annotation"));
        assert_eq!(ids.current("r"), 0);
    }

    #[test]
    fn test_dependency_composes_coordinates() {
        let ids = MatchIdGenerator::new();
        let ctx = MapContext { rule_id: "r", ids: &ids };
        let query = Query::new("pom", "dependency")
            .with_param("groupId", "org.springframework.boot")
            .with_param("artifactId", "spring-boot-starter-web");

        let request = MapperRegistry::builtin()
            .map(ResultShape::Dependency, ScannerKind::Maven, &query, &ctx)
            .unwrap();
        assert_eq!(
            request,
            ScannerRequest::Dependency(DependencyRequest {
                gavs: "org.springframework.boot:spring-boot-starter-web".to_owned()
            })
        );

        let err = MapperRegistry::builtin()
            .map(ResultShape::Dependency, ScannerKind::Maven, &Query::new("pom", "dependency"), &ctx)
            .unwrap_err();
        assert_eq!(err, CoreError::missing_parameter("gavs", "pom.dependency"));
    }

    #[test]
    fn test_content_mapper() {
        let ids = MatchIdGenerator::new();
        let ctx = MapContext { rule_id: "r", ids: &ids };
        let query = Query::new("file", "content")
            .with_param("pattern", "javax\\.persistence")
            .with_param("filePattern", "**/*.java");

        let request = MapperRegistry::builtin()
            .map(ResultShape::Content, ScannerKind::File, &query, &ctx)
            .unwrap();
        assert_eq!(
            request,
            ScannerRequest::File(FileRequest {
                name_pattern: Some("**/*.java".to_owned()),
                content_pattern: Some("javax\\.persistence".to_owned()),
            })
        );
    }

    #[test]
    fn test_unknown_combination_is_configuration_error() {
        let ids = MatchIdGenerator::new();
        let ctx = MapContext { rule_id: "r", ids: &ids };
        let err = MapperRegistry::builtin()
            .map(ResultShape::Class, ScannerKind::Maven, &Query::new("java", "class"), &ctx)
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_validate_builtin_routing() {
        let mappers = MapperRegistry::builtin();
        assert!(mappers.validate(&RoutingTable::builtin()).is_ok());

        let broken = RoutingTable::builtin().with_entry(
            "java.field",
            RoutingEntry::new(ScannerKind::Maven, ResultShape::Symbol, "fields"),
        );
        assert!(mappers.validate(&broken).is_err());
    }
}
