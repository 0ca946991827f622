//! Dotted field paths over BSON documents.

use bson::{Bson, Document};

/// Every value reachable at `path`.
///
/// Arrays met on the way are traversed element-wise, so `reviews.rating` on an
/// array of review documents yields each rating. The terminal value is returned
/// as stored; a terminal array is not expanded.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some(head) = doc.get(segments[0]) {
        walk(head, &segments[1..], &mut out);
    }
    out
}

fn walk<'a>(value: &'a Bson, segments: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(next) = doc.get(*head) {
                walk(next, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(idx) = head.parse::<usize>() {
                if let Some(item) = items.get(idx) {
                    walk(item, rest, out);
                }
                return;
            }
            for item in items {
                if matches!(item, Bson::Document(_)) {
                    walk(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// Like [`lookup`], with terminal arrays flattened into their elements.
pub fn lookup_flat<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut out = Vec::new();
    for value in lookup(doc, path) {
        match value {
            Bson::Array(items) => out.extend(items.iter()),
            other => out.push(other),
        }
    }
    out
}

/// Resolve an aggregation field path (`$a.b` without the `$`).
///
/// Arrays of documents map to an array of the resolved values, which is how
/// `$reviews.rating` becomes a list of ratings after a `$lookup`.
pub fn resolve(doc: &Document, path: &str) -> Option<Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let head = doc.get(segments[0])?;
    resolve_value(head, &segments[1..])
}

fn resolve_value(value: &Bson, segments: &[&str]) -> Option<Bson> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match value {
        Bson::Document(doc) => resolve_value(doc.get(*head)?, rest),
        Bson::Array(items) => {
            let resolved: Vec<Bson> = items
                .iter()
                .filter(|item| matches!(item, Bson::Document(_)))
                .filter_map(|item| resolve_value(item, segments))
                .collect();
            Some(Bson::Array(resolved))
        }
        _ => None,
    }
}

/// Set `value` at a dotted path, creating intermediate documents.
pub fn set(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            let needs_doc = !matches!(doc.get(head), Some(Bson::Document(_)));
            if needs_doc {
                doc.insert(head, Document::new());
            }
            if let Some(Bson::Document(child)) = doc.get_mut(head) {
                set(child, rest, value);
            }
        }
    }
}

/// Remove the value at a dotted path, if present.
pub fn remove(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(child)) = doc.get_mut(head) {
                remove(child, rest);
            }
        }
    }
}
