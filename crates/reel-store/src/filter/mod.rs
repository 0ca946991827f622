mod eval;

pub use eval::matches;

use bson::{Bson, Document};
use regex::Regex;

use crate::error::StoreError;
use crate::text::TextSearch;

/// A recursive filter expression tree.
///
/// Owns field names and values so the expression can outlive the document it
/// was parsed from.
#[derive(Debug, Clone)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Eq(String, Bson),
    Ne(String, Bson),
    Gt(String, Bson),
    Gte(String, Bson),
    Lt(String, Bson),
    Lte(String, Bson),
    In(String, Vec<Bson>),
    Nin(String, Vec<Bson>),
    Regex(String, Regex),
    Exists(String, bool),
    Text(TextSearch),
}

impl Expression {
    /// The expression that matches every document.
    pub fn all() -> Self {
        Expression::And(Vec::new())
    }

    /// The `$text` clause, if the expression has one at the top level.
    pub fn text_search(&self) -> Option<&TextSearch> {
        match self {
            Expression::Text(search) => Some(search),
            Expression::And(children) => children.iter().find_map(|c| match c {
                Expression::Text(search) => Some(search),
                _ => None,
            }),
            _ => None,
        }
    }
}

/// Parse a filter document into an [`Expression`].
///
/// Follows document-database query semantics:
/// - the top-level document is an implicit AND of its entries
/// - `{ "field": value }` is an implicit `$eq`
/// - `{ "field": { "$gt": v } }` uses operator sub-documents
/// - `{ "$or": [...] }` / `{ "$and": [...] }` for explicit logical ops
/// - `{ "field": { "$regex": "pattern", "$options": "i" } }` for regex
/// - `{ "$text": { "$search": "words" } }` for full-text search
///
/// An empty document matches everything.
pub fn parse_filter(doc: &Document) -> Result<Expression, StoreError> {
    let mut children = Vec::new();

    for (key, value) in doc {
        match key.as_str() {
            "$and" => children.push(Expression::And(parse_logical_array(value)?)),
            "$or" => children.push(Expression::Or(parse_logical_array(value)?)),
            "$text" => children.push(parse_text(value)?),
            k if k.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown top-level operator: {k}"
                )));
            }
            _ => children.push(parse_field_condition(key, value)?),
        }
    }

    if children.len() == 1 {
        Ok(children.remove(0))
    } else {
        Ok(Expression::And(children))
    }
}

fn parse_logical_array(value: &Bson) -> Result<Vec<Expression>, StoreError> {
    let Bson::Array(items) = value else {
        return Err(StoreError::InvalidFilter(
            "$and/$or value must be an array".into(),
        ));
    };
    if items.is_empty() {
        return Err(StoreError::InvalidFilter(
            "$and/$or array must not be empty".into(),
        ));
    }

    items
        .iter()
        .map(|item| match item {
            Bson::Document(sub) => parse_filter(sub),
            _ => Err(StoreError::InvalidFilter(
                "$and/$or array elements must be documents".into(),
            )),
        })
        .collect()
}

fn parse_text(value: &Bson) -> Result<Expression, StoreError> {
    let search = match value {
        Bson::Document(d) => d.get_str("$search").map_err(|_| {
            StoreError::InvalidFilter("$text requires a string $search".into())
        })?,
        _ => {
            return Err(StoreError::InvalidFilter(
                "$text value must be a document".into(),
            ));
        }
    };
    Ok(Expression::Text(TextSearch::parse(search)))
}

/// Either implicit `$eq` or an operator sub-document.
fn parse_field_condition(field: &str, value: &Bson) -> Result<Expression, StoreError> {
    match value {
        Bson::Document(sub) if sub.keys().next().is_some_and(|k| k.starts_with('$')) => {
            parse_operator_doc(field, sub)
        }
        Bson::RegularExpression(re) => {
            compile_regex(field, &re.pattern, Some(re.options.as_str()))
        }
        _ => Ok(Expression::Eq(field.to_string(), value.clone())),
    }
}

fn parse_operator_doc(field: &str, doc: &Document) -> Result<Expression, StoreError> {
    if doc.contains_key("$regex") {
        return parse_regex(field, doc);
    }

    let mut conditions = Vec::new();
    for (op, value) in doc {
        let f = field.to_string();
        let expr = match op.as_str() {
            "$eq" => Expression::Eq(f, value.clone()),
            "$ne" => Expression::Ne(f, value.clone()),
            "$gt" => Expression::Gt(f, value.clone()),
            "$gte" => Expression::Gte(f, value.clone()),
            "$lt" => Expression::Lt(f, value.clone()),
            "$lte" => Expression::Lte(f, value.clone()),
            "$in" | "$nin" => {
                let Bson::Array(items) = value else {
                    return Err(StoreError::InvalidFilter(format!("{op} needs an array")));
                };
                if op == "$in" {
                    Expression::In(f, items.clone())
                } else {
                    Expression::Nin(f, items.clone())
                }
            }
            "$exists" => match value {
                Bson::Boolean(b) => Expression::Exists(f, *b),
                _ => {
                    return Err(StoreError::InvalidFilter(
                        "$exists value must be a boolean".into(),
                    ));
                }
            },
            "$options" => {
                return Err(StoreError::InvalidFilter("$options without $regex".into()));
            }
            k => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown field operator: {k}"
                )));
            }
        };
        conditions.push(expr);
    }

    if conditions.len() == 1 {
        Ok(conditions.remove(0))
    } else {
        Ok(Expression::And(conditions))
    }
}

fn parse_regex(field: &str, doc: &Document) -> Result<Expression, StoreError> {
    let mut pattern = None;
    let mut options = None;

    for (key, value) in doc {
        match (key.as_str(), value) {
            ("$regex", Bson::String(s)) => pattern = Some(s.as_str()),
            ("$regex", Bson::RegularExpression(re)) => pattern = Some(re.pattern.as_str()),
            ("$options", Bson::String(s)) => options = Some(s.as_str()),
            ("$regex" | "$options", _) => {
                return Err(StoreError::InvalidFilter(format!("{key} value must be a string")));
            }
            (k, _) => {
                return Err(StoreError::InvalidFilter(format!(
                    "unexpected key alongside $regex: {k}"
                )));
            }
        }
    }

    let pattern = pattern.ok_or_else(|| StoreError::InvalidFilter("missing $regex pattern".into()))?;
    compile_regex(field, pattern, options)
}

fn compile_regex(field: &str, pattern: &str, options: Option<&str>) -> Result<Expression, StoreError> {
    let mut full = String::with_capacity(pattern.len() + 6);
    if let Some(opts) = options.filter(|o| !o.is_empty()) {
        full.push_str("(?");
        for ch in opts.chars() {
            match ch {
                'i' | 's' | 'm' | 'x' => full.push(ch),
                c => {
                    return Err(StoreError::InvalidFilter(format!("unknown regex option: {c}")));
                }
            }
        }
        full.push(')');
    }
    full.push_str(pattern);

    let re = Regex::new(&full)
        .map_err(|e| StoreError::InvalidFilter(format!("invalid regex pattern: {e}")))?;
    Ok(Expression::Regex(field.to_string(), re))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn bare_field_implicit_eq() {
        let expr = parse_filter(&doc! { "status": "active" }).unwrap();
        assert!(matches!(expr, Expression::Eq(ref f, Bson::String(ref v)) if f == "status" && v == "active"));
    }

    #[test]
    fn empty_filter_matches_all() {
        let expr = parse_filter(&doc! {}).unwrap();
        assert!(matches!(expr, Expression::And(ref c) if c.is_empty()));
    }

    #[test]
    fn range_on_one_field_becomes_and() {
        let expr = parse_filter(&doc! { "rating": { "$gte": 8, "$lte": 10 } }).unwrap();
        match expr {
            Expression::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], Expression::Gte(..)));
                assert!(matches!(children[1], Expression::Lte(..)));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn regex_with_options() {
        let expr = parse_filter(&doc! { "title": { "$regex": "knight", "$options": "i" } }).unwrap();
        match expr {
            Expression::Regex(f, re) => {
                assert_eq!(f, "title");
                assert_eq!(re.as_str(), "(?i)knight");
            }
            other => panic!("expected Regex, got {other:?}"),
        }
    }

    #[test]
    fn in_requires_array() {
        let err = parse_filter(&doc! { "movie_id": { "$in": "m1" } }).unwrap_err();
        assert!(err.to_string().contains("needs an array"), "{err}");
    }

    #[test]
    fn text_clause_is_found_at_top_level() {
        let expr = parse_filter(&doc! { "$text": { "$search": "Great acting" }, "rating": 9 }).unwrap();
        let search = expr.text_search().expect("text clause");
        assert_eq!(search.terms, vec!["acting", "great"]);
    }

    #[test]
    fn unknown_operators_error() {
        assert!(parse_filter(&doc! { "$nor": [] }).is_err());
        assert!(parse_filter(&doc! { "age": { "$between": 1 } }).is_err());
        assert!(parse_filter(&doc! { "name": { "$regex": "[invalid" } }).is_err());
    }
}
