//! Parser for the rule condition language.
//!
//! ```text
//! condition := term ( ("AND" | "OR") term )*
//! term      := kind "." symbol "is" arguments
//! arguments := "(" param ("," param)* ")" | value
//! param     := key "=" value
//! value     := 'quoted' | "quoted" | bare-word
//! ```
//!
//! A bare `arguments` value becomes the `name` parameter. Connectives are
//! case-insensitive, and one condition may use only one kind of connective.

use super::{Query, QueryExpr};
use crate::error::CoreError;

/// Parameter assigned to a bare argument value.
const DEFAULT_PARAM: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

/// Parses a condition string into a [`QueryExpr`].
///
/// # Errors
///
/// Returns [`CoreError::InvalidQuery`] for malformed terms, unbalanced quotes
/// or parentheses, or a mix of `AND` and `OR`.
///
/// # Examples
///
/// ```
/// use mt_core::{parse_condition, QueryExpr};
///
/// let expr = parse_condition("pom.dependency is (gavs='org.acme:core:1.0')").unwrap();
/// let QueryExpr::Leaf(query) = expr else { unreachable!() };
/// assert_eq!(query.param("gavs"), Some("org.acme:core:1.0"));
/// ```
pub fn parse_condition(input: &str) -> Result<QueryExpr, CoreError> {
    let (terms, connective) = split_terms(input)?;

    let mut queries = terms
        .iter()
        .map(|term| parse_term(term, input))
        .collect::<Result<Vec<_>, _>>()?;

    match connective {
        None => queries
            .pop()
            .map(QueryExpr::Leaf)
            .ok_or_else(|| CoreError::invalid_query(input, "empty condition")),
        Some(Connective::And) => Ok(QueryExpr::All(queries)),
        Some(Connective::Or) => Ok(QueryExpr::Any(queries)),
    }
}

/// Builds the query for a rule precondition.
///
/// `name` is the `kind.symbol` routing key. `pattern` is either a parameter
/// list (`key='value', ...`, parentheses optional) or a single value that
/// becomes the `name` parameter.
///
/// # Errors
///
/// Returns [`CoreError::InvalidQuery`] if either part is malformed.
pub fn parse_precondition(name: &str, pattern: &str) -> Result<Query, CoreError> {
    let (kind, symbol) = parse_head(name.trim(), name)?;
    let mut query = Query::new(kind, symbol);

    let pattern = pattern.trim();
    let inner = pattern
        .strip_prefix('(')
        .and_then(|p| p.strip_suffix(')'))
        .unwrap_or(pattern);

    if looks_like_param_list(inner) {
        for (key, value) in parse_params(inner, pattern)? {
            query.set_param(key, value);
        }
    } else {
        query.set_param(DEFAULT_PARAM, unquote(inner, pattern)?);
    }

    Ok(query)
}

/// Splits a condition on top-level connectives, honouring quotes and parentheses.
fn split_terms(input: &str) -> Result<(Vec<String>, Option<Connective>), CoreError> {
    let chars: Vec<char> = input.chars().collect();
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut connective = None;
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CoreError::invalid_query(input, "unbalanced ')'"))?;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some((found, len)) = connective_at(&chars, i + 1) {
                    if connective.is_some_and(|existing| existing != found) {
                        return Err(CoreError::invalid_query(
                            input,
                            "AND and OR cannot be mixed in one condition",
                        ));
                    }
                    connective = Some(found);
                    terms.push(std::mem::take(&mut current));
                    i += 1 + len;
                    continue;
                }
                current.push(c);
            }
            _ => current.push(c),
        }
        i += 1;
    }

    if quote.is_some() {
        return Err(CoreError::invalid_query(input, "unterminated quote"));
    }
    if depth != 0 {
        return Err(CoreError::invalid_query(input, "unbalanced '('"));
    }

    terms.push(current);
    if terms.iter().any(|t| t.trim().is_empty()) {
        return Err(CoreError::invalid_query(input, "empty term"));
    }

    Ok((terms, connective))
}

/// Recognises `AND`/`OR` starting at `start` when followed by whitespace.
fn connective_at(chars: &[char], start: usize) -> Option<(Connective, usize)> {
    let word: String = chars
        .iter()
        .skip(start)
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let len = word.len();
    let followed_by_space = chars.get(start + len).is_some_and(|c| c.is_whitespace());
    if !followed_by_space {
        return None;
    }

    match word.to_ascii_lowercase().as_str() {
        "and" => Some((Connective::And, len)),
        "or" => Some((Connective::Or, len)),
        _ => None,
    }
}

fn parse_term(term: &str, input: &str) -> Result<Query, CoreError> {
    let term = term.trim();
    let (head, rest) = term
        .split_once(char::is_whitespace)
        .ok_or_else(|| CoreError::invalid_query(input, format!("'{term}' has no arguments")))?;

    let (kind, symbol) = parse_head(head, input)?;

    let rest = rest.trim_start();
    let arguments = rest
        .strip_prefix("is")
        .or_else(|| rest.strip_prefix("IS"))
        .filter(|after| after.starts_with(char::is_whitespace) || after.starts_with('('))
        .ok_or_else(|| CoreError::invalid_query(input, format!("expected 'is' after '{head}'")))?
        .trim();

    let mut query = Query::new(kind, symbol);
    if let Some(inner) = arguments
        .strip_prefix('(')
        .and_then(|a| a.strip_suffix(')'))
    {
        for (key, value) in parse_params(inner, input)? {
            query.set_param(key, value);
        }
    } else {
        query.set_param(DEFAULT_PARAM, unquote(arguments, input)?);
    }

    Ok(query)
}

fn parse_head<'a>(head: &'a str, input: &str) -> Result<(&'a str, &'a str), CoreError> {
    let (kind, symbol) = head
        .split_once('.')
        .ok_or_else(|| CoreError::invalid_query(input, format!("'{head}' is not kind.symbol")))?;

    let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid(kind) || !valid(symbol) {
        return Err(CoreError::invalid_query(
            input,
            format!("'{head}' is not kind.symbol"),
        ));
    }

    Ok((kind, symbol))
}

fn looks_like_param_list(text: &str) -> bool {
    let Some((key, _)) = text.split_once('=') else {
        return false;
    };
    let key = key.trim();
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses `key='value', key2=value2` into ordered pairs.
fn parse_params(inner: &str, input: &str) -> Result<Vec<(String, String)>, CoreError> {
    let mut params = Vec::new();
    for part in split_outside_quotes(inner, ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part.split_once('=').ok_or_else(|| {
            CoreError::invalid_query(input, format!("parameter '{part}' is not key=value"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::invalid_query(input, "parameter with empty key"));
        }
        params.push((key.to_owned(), unquote(value.trim(), input)?));
    }

    if params.is_empty() {
        return Err(CoreError::invalid_query(input, "empty parameter list"));
    }
    Ok(params)
}

fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == separator => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn unquote(value: &str, input: &str) -> Result<String, CoreError> {
    let value = value.trim();
    for q in ['\'', '"'] {
        if let Some(rest) = value.strip_prefix(q) {
            return rest
                .strip_suffix(q)
                .map(str::to_owned)
                .ok_or_else(|| CoreError::invalid_query(input, "unterminated quote"));
        }
    }

    if value.is_empty() {
        return Err(CoreError::invalid_query(input, "empty value"));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_value() {
        let expr = parse_condition(
            "java.annotation is 'org.springframework.boot.autoconfigure.SpringBootApplication'",
        )
        .unwrap();
        let QueryExpr::Leaf(query) = expr else {
            panic!("expected leaf");
        };
        assert!(query.is("java", "annotation"));
        assert_eq!(
            query.param("name"),
            Some("org.springframework.boot.autoconfigure.SpringBootApplication")
        );
    }

    #[test]
    fn test_parse_param_list_keeps_order() {
        let expr = parse_condition(
            "pom.dependency is (gavs='org.springframework.boot:spring-boot-starter-web', version=\"3.1.0\")",
        )
        .unwrap();
        let QueryExpr::Leaf(query) = expr else {
            panic!("expected leaf");
        };
        let keys: Vec<_> = query.params().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["gavs", "version"]);
        assert_eq!(query.param("version"), Some("3.1.0"));
    }

    #[test]
    fn test_parse_and() {
        let expr = parse_condition(
            "java.annotation is 'org.acme.A' AND pom.dependency is (gavs='g:a')",
        )
        .unwrap();
        let QueryExpr::All(queries) = expr else {
            panic!("expected all");
        };
        assert_eq!(queries.len(), 2);
        assert!(queries[1].is("pom", "dependency"));
    }

    #[test]
    fn test_parse_or_lowercase() {
        let expr = parse_condition("file.name is '*.xml' or file.name is '*.properties'").unwrap();
        assert!(matches!(expr, QueryExpr::Any(ref q) if q.len() == 2));
    }

    #[test]
    fn test_connective_inside_quotes_is_literal() {
        let expr = parse_condition("file.content is (pattern='this AND that')").unwrap();
        let QueryExpr::Leaf(query) = expr else {
            panic!("expected leaf");
        };
        assert_eq!(query.param("pattern"), Some("this AND that"));
    }

    #[test]
    fn test_comma_inside_quotes_is_literal() {
        let expr = parse_condition("pom.dependency is (gavs='g:a:1, g2:a2')").unwrap();
        assert_eq!(expr.queries()[0].param("gavs"), Some("g:a:1, g2:a2"));
    }

    #[test]
    fn test_mixed_connectives_rejected() {
        let err = parse_condition("a.b is 'x' AND a.b is 'y' OR a.b is 'z'").unwrap_err();
        assert!(err.to_string().contains("mixed"));
    }

    #[test]
    fn test_malformed_terms_rejected() {
        assert!(parse_condition("").is_err());
        assert!(parse_condition("annotation is 'x'").is_err());
        assert!(parse_condition("java.annotation 'x'").is_err());
        assert!(parse_condition("java.annotation is 'x").is_err());
        assert!(parse_condition("java.annotation is (name='x'").is_err());
        assert!(parse_condition("java.annotation is 'x' AND").is_err());
    }

    #[test]
    fn test_parse_precondition_single_value() {
        let query = parse_precondition("pom.dependency", "org.springframework.boot:spring-boot").unwrap();
        assert!(query.is("pom", "dependency"));
        assert_eq!(query.param("name"), Some("org.springframework.boot:spring-boot"));
    }

    #[test]
    fn test_parse_precondition_param_list() {
        let query =
            parse_precondition("pom.dependency", "gavs='org.springframework.boot:spring-boot'").unwrap();
        assert_eq!(query.param("gavs"), Some("org.springframework.boot:spring-boot"));

        let query = parse_precondition("pom.dependency", "(groupId='g', artifactId='a')").unwrap();
        assert_eq!(query.param("groupId"), Some("g"));
        assert_eq!(query.param("artifactId"), Some("a"));
    }
}
