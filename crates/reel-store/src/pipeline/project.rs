use bson::{Bson, Document};

use super::expr::Expr;
use crate::error::StoreError;
use crate::path;
use crate::value;

#[derive(Debug, Clone)]
enum FieldRule {
    Include,
    Exclude,
    Computed(Expr),
    TextScore,
}

/// A `$project` / `$addFields` / find-projection specification.
#[derive(Debug, Clone)]
pub struct Projection {
    rules: Vec<(String, FieldRule)>,
    exclusion: bool,
    keep_id: bool,
    merge: bool,
}

impl Projection {
    /// Parse a `$project` or find projection document.
    pub fn parse(spec: &Document) -> Result<Self, StoreError> {
        let mut rules = Vec::new();
        flatten(spec, "", &mut rules)?;

        let keep_id = !rules
            .iter()
            .any(|(p, r)| p == "_id" && matches!(r, FieldRule::Exclude));
        let excluded = rules
            .iter()
            .filter(|(p, r)| p != "_id" && matches!(r, FieldRule::Exclude))
            .count();
        let included = rules
            .iter()
            .filter(|(p, r)| p != "_id" && !matches!(r, FieldRule::Exclude))
            .count();
        if excluded > 0 && included > 0 {
            return Err(StoreError::InvalidPipeline(
                "cannot mix inclusion and exclusion in a projection".into(),
            ));
        }
        let exclusion = excluded > 0 || (included == 0 && !keep_id);
        // `_id` inclusion is implied; its exclusion only matters in exclusion mode.
        let rules = rules
            .into_iter()
            .filter(|(p, r)| p != "_id" || exclusion || matches!(r, FieldRule::Computed(_)))
            .collect();

        Ok(Self {
            exclusion,
            rules,
            keep_id,
            merge: false,
        })
    }

    /// Parse an `$addFields` specification: every field is computed and
    /// merged into the existing document.
    pub(crate) fn parse_add_fields(spec: &Document) -> Result<Self, StoreError> {
        let mut rules = Vec::with_capacity(spec.len());
        for (field, value) in spec {
            let rule = if meta_text_score(value) {
                FieldRule::TextScore
            } else {
                FieldRule::Computed(Expr::parse(value)?)
            };
            rules.push((field.clone(), rule));
        }
        Ok(Self {
            rules,
            exclusion: false,
            keep_id: true,
            merge: true,
        })
    }

    pub fn uses_text_score(&self) -> bool {
        self.rules.iter().any(|(_, r)| matches!(r, FieldRule::TextScore))
    }

    /// Shape one document. `score` is its text relevance, zero when unknown.
    pub fn apply(&self, doc: &Document, score: f64) -> Result<Document, StoreError> {
        if self.exclusion {
            let mut out = doc.clone();
            for (field, rule) in &self.rules {
                if matches!(rule, FieldRule::Exclude) {
                    path::remove(&mut out, field);
                }
            }
            return Ok(out);
        }

        let mut out = if self.merge { doc.clone() } else { Document::new() };
        if !self.merge && self.keep_id {
            if let Some(id) = doc.get("_id") {
                out.insert("_id", id.clone());
            }
        }
        for (field, rule) in &self.rules {
            match rule {
                FieldRule::Exclude => {}
                FieldRule::Include => {
                    if let Some(v) = path::resolve(doc, field) {
                        path::set(&mut out, field, v);
                    }
                }
                FieldRule::Computed(expr) => {
                    if let Some(v) = expr.eval(doc)? {
                        path::set(&mut out, field, v);
                    }
                }
                FieldRule::TextScore => path::set(&mut out, field, Bson::Double(score)),
            }
        }
        Ok(out)
    }
}

fn meta_text_score(value: &Bson) -> bool {
    matches!(value, Bson::Document(d) if d.len() == 1 && d.get_str("$meta").ok() == Some("textScore"))
}

/// Nested plain documents become dotted paths; everything else is a rule.
fn flatten(spec: &Document, prefix: &str, out: &mut Vec<(String, FieldRule)>) -> Result<(), StoreError> {
    for (field, value) in spec {
        let full = if prefix.is_empty() {
            field.clone()
        } else {
            format!("{prefix}.{field}")
        };
        let rule = match value {
            v if meta_text_score(v) => FieldRule::TextScore,
            Bson::Document(sub) if sub.keys().next().is_some_and(|k| !k.starts_with('$')) => {
                flatten(sub, &full, out)?;
                continue;
            }
            Bson::Boolean(b) => flag(*b),
            v if value::as_number(v).is_some() => flag(value::truthy(Some(v))),
            other => FieldRule::Computed(Expr::parse(other)?),
        };
        out.push((full, rule));
    }
    Ok(())
}

fn flag(include: bool) -> FieldRule {
    if include {
        FieldRule::Include
    } else {
        FieldRule::Exclude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn project(spec: Document, d: &Document) -> Document {
        Projection::parse(&spec).unwrap().apply(d, 1.5).unwrap()
    }

    #[test]
    fn inclusion_keeps_id() {
        let d = doc! { "_id": "r1", "rating": 9, "movie": { "title": "Heat", "year": 1995 } };
        assert_eq!(
            project(doc! { "rating": 1, "movie.title": 1 }, &d),
            doc! { "_id": "r1", "rating": 9, "movie": { "title": "Heat" } }
        );
        assert_eq!(project(doc! { "_id": 0, "rating": 1 }, &d), doc! { "rating": 9 });
    }

    #[test]
    fn exclusion_removes_fields() {
        let d = doc! { "_id": "r1", "rating": 9, "review_content": "long" };
        assert_eq!(project(doc! { "review_content": 0 }, &d), doc! { "_id": "r1", "rating": 9 });
    }

    #[test]
    fn computed_fields_and_nested_shapes() {
        let d = doc! { "_id": "r1", "title": "Heat", "year": 1995 };
        assert_eq!(
            project(doc! { "_id": 0, "movie": { "title": "$title", "year": "$year" } }, &d),
            doc! { "movie": { "title": "Heat", "year": 1995 } }
        );
    }

    #[test]
    fn text_score_meta() {
        let d = doc! { "_id": "r1", "rating": 9 };
        let out = project(doc! { "rating": 1, "score": { "$meta": "textScore" } }, &d);
        assert_eq!(out.get_f64("score").unwrap(), 1.5);
    }

    #[test]
    fn add_fields_merges() {
        let d = doc! { "_id": "r1", "helpful": 3, "total": 4 };
        let p = Projection::parse_add_fields(&doc! { "ratio": { "$divide": ["$helpful", "$total"] } }).unwrap();
        let out = p.apply(&d, 0.0).unwrap();
        assert_eq!(out, doc! { "_id": "r1", "helpful": 3, "total": 4, "ratio": 0.75 });
    }

    #[test]
    fn mixed_projection_is_rejected() {
        assert!(Projection::parse(&doc! { "a": 1, "b": 0 }).is_err());
    }
}
