mod expr;
mod group;
mod project;

pub use project::Projection;

use bson::{Bson, Document};

use crate::error::StoreError;
use crate::filter::{self, Expression};
use crate::path;
use crate::sort::SortSpec;
use crate::text::{self, TextFields};
use crate::value;
use group::GroupStage;

/// A document flowing through a pipeline with its text relevance.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub(crate) doc: Document,
    pub(crate) score: f64,
}

impl Row {
    pub(crate) fn new(doc: Document) -> Self {
        Self { doc, score: 0.0 }
    }
}

/// What a running pipeline may ask of the store around it.
pub(crate) trait PipelineContext {
    /// Documents of `collection` whose `field` equals any of `values`, in
    /// collection order. A missing collection yields nothing.
    fn lookup(
        &self,
        collection: &str,
        field: &str,
        values: &[Bson],
    ) -> Result<Vec<Document>, StoreError>;

    /// Text fields of the collection the pipeline runs on.
    fn text_fields(&self) -> TextFields;
}

#[derive(Debug, Clone)]
pub(crate) enum Stage {
    Match(Expression),
    Group(GroupStage),
    Sort(SortSpec),
    Limit(usize),
    Skip(usize),
    Project(Projection),
    AddFields(Projection),
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    Unwind {
        path: String,
        preserve_empty: bool,
    },
    Count(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub(crate) fn parse(stages: &[Document]) -> Result<Self, StoreError> {
        let stages = stages
            .iter()
            .map(parse_stage)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stages })
    }

    /// The leading `$match`, which the store may answer from an index,
    /// and the stages after it.
    pub(crate) fn split_leading_match(&self) -> (Option<&Expression>, &[Stage]) {
        match self.stages.split_first() {
            Some((Stage::Match(expr), rest)) => (Some(expr), rest),
            _ => (None, &self.stages),
        }
    }
}

fn parse_stage(stage: &Document) -> Result<Stage, StoreError> {
    let (name, spec) = match stage.iter().next() {
        Some(entry) if stage.len() == 1 => entry,
        _ => {
            return Err(StoreError::InvalidPipeline(
                "a pipeline stage must have exactly one field".into(),
            ));
        }
    };

    match name.as_str() {
        "$match" => Ok(Stage::Match(filter::parse_filter(stage_doc(name, spec)?)?)),
        "$group" => Ok(Stage::Group(GroupStage::parse(stage_doc(name, spec)?)?)),
        "$sort" => Ok(Stage::Sort(
            SortSpec::parse(stage_doc(name, spec)?)
                .map_err(|e| StoreError::InvalidPipeline(e.to_string()))?,
        )),
        "$limit" => Ok(Stage::Limit(positive(name, spec)?)),
        "$skip" => Ok(Stage::Skip(positive(name, spec)?)),
        "$project" => Ok(Stage::Project(Projection::parse(stage_doc(name, spec)?)?)),
        "$addFields" | "$set" => Ok(Stage::AddFields(Projection::parse_add_fields(
            stage_doc(name, spec)?,
        )?)),
        "$lookup" => {
            let spec = stage_doc(name, spec)?;
            let field = |key: &str| {
                spec.get_str(key).map(str::to_string).map_err(|_| {
                    StoreError::InvalidPipeline(format!("$lookup requires a string {key}"))
                })
            };
            Ok(Stage::Lookup {
                from: field("from")?,
                local_field: field("localField")?,
                foreign_field: field("foreignField")?,
                as_field: field("as")?,
            })
        }
        "$unwind" => {
            let (raw, preserve_empty) = match spec {
                Bson::String(s) => (s.as_str(), false),
                Bson::Document(d) => (
                    d.get_str("path").map_err(|_| {
                        StoreError::InvalidPipeline("$unwind requires a path".into())
                    })?,
                    d.get_bool("preserveNullAndEmptyArrays").unwrap_or(false),
                ),
                _ => {
                    return Err(StoreError::InvalidPipeline(
                        "$unwind takes a field path or a document".into(),
                    ));
                }
            };
            let path = raw.strip_prefix('$').ok_or_else(|| {
                StoreError::InvalidPipeline("$unwind path must start with $".into())
            })?;
            Ok(Stage::Unwind {
                path: path.to_string(),
                preserve_empty,
            })
        }
        "$count" => match spec {
            Bson::String(field) if !field.is_empty() && !field.starts_with('$') => {
                Ok(Stage::Count(field.clone()))
            }
            _ => Err(StoreError::InvalidPipeline(
                "$count takes a non-empty field name".into(),
            )),
        },
        other => Err(StoreError::InvalidPipeline(format!(
            "unrecognized pipeline stage: {other}"
        ))),
    }
}

fn stage_doc<'a>(name: &str, spec: &'a Bson) -> Result<&'a Document, StoreError> {
    match spec {
        Bson::Document(d) => Ok(d),
        _ => Err(StoreError::InvalidPipeline(format!(
            "{name} specification must be a document"
        ))),
    }
}

fn positive(name: &str, spec: &Bson) -> Result<usize, StoreError> {
    match value::as_number(spec) {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(StoreError::InvalidPipeline(format!(
            "{name} requires a non-negative integer"
        ))),
    }
}

/// Run `stages` over `rows`.
pub(crate) fn execute(
    stages: &[Stage],
    mut rows: Vec<Row>,
    ctx: &dyn PipelineContext,
) -> Result<Vec<Document>, StoreError> {
    for stage in stages {
        rows = match stage {
            Stage::Match(expr) => {
                let fields = ctx.text_fields();
                let search = expr.text_search();
                rows.into_iter()
                    .filter(|row| filter::matches(&row.doc, expr, &fields))
                    .map(|mut row| {
                        if let Some(search) = search {
                            row.score = text::score(&row.doc, search, &fields);
                        }
                        row
                    })
                    .collect()
            }
            Stage::Group(group) => group
                .apply(rows.into_iter().map(|r| r.doc).collect())?
                .into_iter()
                .map(Row::new)
                .collect(),
            Stage::Sort(spec) => {
                rows.sort_by(|a, b| spec.compare(&a.doc, &b.doc, (a.score, b.score)));
                rows
            }
            Stage::Limit(n) => {
                rows.truncate(*n);
                rows
            }
            Stage::Skip(n) => rows.into_iter().skip(*n).collect(),
            Stage::Project(projection) | Stage::AddFields(projection) => rows
                .into_iter()
                .map(|row| {
                    Ok(Row {
                        doc: projection.apply(&row.doc, row.score)?,
                        score: row.score,
                    })
                })
                .collect::<Result<_, StoreError>>()?,
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                let mut out = Vec::with_capacity(rows.len());
                for mut row in rows {
                    let mut locals: Vec<Bson> =
                        path::lookup_flat(&row.doc, local_field).into_iter().cloned().collect();
                    if locals.is_empty() {
                        locals.push(Bson::Null);
                    }
                    let joined = ctx.lookup(from, foreign_field, &locals)?;
                    path::set(
                        &mut row.doc,
                        as_field,
                        Bson::Array(joined.into_iter().map(Bson::Document).collect()),
                    );
                    out.push(row);
                }
                out
            }
            Stage::Unwind {
                path: field,
                preserve_empty,
            } => unwind(rows, field, *preserve_empty),
            Stage::Count(field) => {
                if rows.is_empty() {
                    Vec::new()
                } else {
                    let mut doc = Document::new();
                    doc.insert(field.clone(), value::integer(rows.len() as i64));
                    vec![Row::new(doc)]
                }
            }
        };
    }
    Ok(rows.into_iter().map(|r| r.doc).collect())
}

fn unwind(rows: Vec<Row>, field: &str, preserve_empty: bool) -> Vec<Row> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match path::resolve(&row.doc, field) {
            Some(Bson::Array(items)) if !items.is_empty() => {
                for item in items {
                    let mut doc = row.doc.clone();
                    path::set(&mut doc, field, item);
                    out.push(Row {
                        doc,
                        score: row.score,
                    });
                }
            }
            Some(Bson::Array(_)) | Some(Bson::Null) | None => {
                if preserve_empty {
                    let mut row = row;
                    path::remove(&mut row.doc, field);
                    out.push(row);
                }
            }
            Some(_) => out.push(row),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    struct Movies(Vec<Document>);

    impl PipelineContext for Movies {
        fn lookup(
            &self,
            collection: &str,
            field: &str,
            values: &[Bson],
        ) -> Result<Vec<Document>, StoreError> {
            if collection != "movies" {
                return Ok(Vec::new());
            }
            let expr = Expression::In(field.to_string(), values.to_vec());
            Ok(self
                .0
                .iter()
                .filter(|d| filter::matches(d, &expr, &TextFields::AllStrings))
                .cloned()
                .collect())
        }

        fn text_fields(&self) -> TextFields {
            TextFields::AllStrings
        }
    }

    fn run(stages: Vec<Document>, docs: Vec<Document>) -> Vec<Document> {
        let ctx = Movies(vec![
            doc! { "_id": "m1", "title": "Heat" },
            doc! { "_id": "m2", "title": "Up" },
        ]);
        let pipeline = Pipeline::parse(&stages).unwrap();
        execute(&pipeline.stages, docs.into_iter().map(Row::new).collect(), &ctx).unwrap()
    }

    #[test]
    fn lookup_then_unwind() {
        let out = run(
            vec![
                doc! { "$lookup": { "from": "movies", "localField": "movie_id", "foreignField": "_id", "as": "movie" } },
                doc! { "$unwind": "$movie" },
                doc! { "$project": { "_id": 0, "title": "$movie.title" } },
            ],
            vec![
                doc! { "_id": "r1", "movie_id": "m2" },
                doc! { "_id": "r2", "movie_id": "m9" },
                doc! { "_id": "r3", "movie_id": "m1" },
            ],
        );
        assert_eq!(out, vec![doc! { "title": "Up" }, doc! { "title": "Heat" }]);
    }

    #[test]
    fn unwind_preserving_empty() {
        let out = run(
            vec![doc! { "$unwind": { "path": "$tags", "preserveNullAndEmptyArrays": true } }],
            vec![doc! { "_id": 1, "tags": ["a", "b"] }, doc! { "_id": 2, "tags": [] }],
        );
        assert_eq!(
            out,
            vec![
                doc! { "_id": 1, "tags": "a" },
                doc! { "_id": 1, "tags": "b" },
                doc! { "_id": 2 },
            ]
        );
    }

    #[test]
    fn match_group_sort_limit() {
        let out = run(
            vec![
                doc! { "$match": { "rating": { "$gte": 5 } } },
                doc! { "$group": { "_id": "$user", "n": { "$sum": 1 } } },
                doc! { "$sort": { "n": -1, "_id": 1 } },
                doc! { "$limit": 1 },
            ],
            vec![
                doc! { "user": "b", "rating": 9 },
                doc! { "user": "a", "rating": 7 },
                doc! { "user": "a", "rating": 2 },
                doc! { "user": "c", "rating": 6 },
                doc! { "user": "c", "rating": 8 },
            ],
        );
        assert_eq!(out, vec![doc! { "_id": "c", "n": 2 }]);
    }

    #[test]
    fn count_and_skip() {
        let docs = vec![doc! { "a": 1 }, doc! { "a": 2 }, doc! { "a": 3 }];
        assert_eq!(
            run(vec![doc! { "$skip": 1 }, doc! { "$count": "total" }], docs.clone()),
            vec![doc! { "total": 2 }]
        );
        assert!(run(vec![doc! { "$match": { "a": 9 } }, doc! { "$count": "total" }], docs).is_empty());
    }

    #[test]
    fn leading_match_is_split_off() {
        let pipeline = Pipeline::parse(&[doc! { "$match": { "a": 1 } }, doc! { "$limit": 2 }]).unwrap();
        let (leading, rest) = pipeline.split_leading_match();
        assert!(leading.is_some());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn rejects_bad_stages() {
        assert!(Pipeline::parse(&[doc! { "$bucketAuto": {} }]).is_err());
        assert!(Pipeline::parse(&[doc! { "$limit": -1 }]).is_err());
        assert!(Pipeline::parse(&[doc! { "$lookup": { "from": "movies" } }]).is_err());
        assert!(Pipeline::parse(&[doc! { "$match": {}, "$limit": 1 }]).is_err());
    }
}
