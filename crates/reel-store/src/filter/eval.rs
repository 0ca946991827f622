use std::cmp::Ordering;

use bson::{Bson, Document};

use super::Expression;
use crate::path;
use crate::text::{self, TextFields};
use crate::value;

/// Evaluate whether a document matches the given expression.
pub fn matches(doc: &Document, expr: &Expression, text_fields: &TextFields) -> bool {
    match expr {
        Expression::And(children) => children.iter().all(|c| matches(doc, c, text_fields)),
        Expression::Or(children) => children.iter().any(|c| matches(doc, c, text_fields)),
        Expression::Eq(field, val) => field_eq(doc, field, val),
        Expression::Ne(field, val) => !field_eq(doc, field, val),
        Expression::Gt(field, val) => field_cmp(doc, field, val, |o| o == Ordering::Greater),
        Expression::Gte(field, val) => field_cmp(doc, field, val, |o| o != Ordering::Less),
        Expression::Lt(field, val) => field_cmp(doc, field, val, |o| o == Ordering::Less),
        Expression::Lte(field, val) => field_cmp(doc, field, val, |o| o != Ordering::Greater),
        Expression::In(field, vals) => vals.iter().any(|v| field_eq(doc, field, v)),
        Expression::Nin(field, vals) => !vals.iter().any(|v| field_eq(doc, field, v)),
        Expression::Regex(field, re) => path::lookup_flat(doc, field)
            .into_iter()
            .any(|v| v.as_str().is_some_and(|s| re.is_match(s))),
        Expression::Exists(field, expected) => {
            // Physical presence: an explicit null still counts as existing.
            let present = !path::lookup(doc, field).is_empty();
            *expected == present
        }
        Expression::Text(search) => text::score(doc, search, text_fields) > 0.0,
    }
}

/// Equality with array semantics: a stored array matches when the whole array
/// or any element equals the query value. `null` matches missing fields.
fn field_eq(doc: &Document, field: &str, query: &Bson) -> bool {
    let found = path::lookup(doc, field);
    if matches!(query, Bson::Null) && found.is_empty() {
        return true;
    }

    found.into_iter().any(|stored| match stored {
        Bson::Array(items) => {
            value::equal(stored, query) || items.iter().any(|item| value::equal(item, query))
        }
        _ => value::equal(stored, query),
    })
}

/// Range comparison, only between values of the same type bracket.
fn field_cmp(doc: &Document, field: &str, query: &Bson, predicate: fn(Ordering) -> bool) -> bool {
    path::lookup_flat(doc, field)
        .into_iter()
        .any(|stored| value::same_bracket(stored, query) && predicate(value::compare(stored, query)))
}
