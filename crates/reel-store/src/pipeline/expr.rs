//! Aggregation expressions: field paths, literals, object shapes and operators.

use bson::{Bson, Document};
use chrono::{DateTime, Datelike, Utc};

use crate::error::StoreError;
use crate::path;
use crate::value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
    Not,
    Add,
    Subtract,
    Multiply,
    Divide,
    Avg,
    Sum,
    Size,
    Year,
    Month,
    DayOfMonth,
    IfNull,
}

impl Op {
    fn from_name(name: &str) -> Option<Op> {
        Some(match name {
            "$eq" => Op::Eq,
            "$ne" => Op::Ne,
            "$gt" => Op::Gt,
            "$gte" => Op::Gte,
            "$lt" => Op::Lt,
            "$lte" => Op::Lte,
            "$and" => Op::And,
            "$or" => Op::Or,
            "$not" => Op::Not,
            "$add" => Op::Add,
            "$subtract" => Op::Subtract,
            "$multiply" => Op::Multiply,
            "$divide" => Op::Divide,
            "$avg" => Op::Avg,
            "$sum" => Op::Sum,
            "$size" => Op::Size,
            "$year" => Op::Year,
            "$month" => Op::Month,
            "$dayOfMonth" => Op::DayOfMonth,
            "$ifNull" => Op::IfNull,
            _ => return None,
        })
    }

    fn arity(self) -> Option<usize> {
        match self {
            Op::Eq | Op::Ne | Op::Gt | Op::Gte | Op::Lt | Op::Lte => Some(2),
            Op::Subtract | Op::Divide | Op::IfNull => Some(2),
            Op::Not | Op::Size | Op::Year | Op::Month | Op::DayOfMonth => Some(1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Bson),
    FieldPath(String),
    Object(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    Operator(Op, Vec<Expr>),
    Switch {
        branches: Vec<(Expr, Expr)>,
        default: Option<Box<Expr>>,
    },
    Cond {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub(crate) fn parse(value: &Bson) -> Result<Expr, StoreError> {
        match value {
            Bson::String(s) if s.starts_with("$$") => Err(StoreError::InvalidPipeline(format!(
                "unsupported variable: {s}"
            ))),
            Bson::String(s) if s.starts_with('$') => Ok(Expr::FieldPath(s[1..].to_string())),
            Bson::Array(items) => Ok(Expr::Array(
                items.iter().map(Expr::parse).collect::<Result<_, _>>()?,
            )),
            Bson::Document(doc) => Self::parse_document(doc),
            other => Ok(Expr::Literal(other.clone())),
        }
    }

    fn parse_document(doc: &Document) -> Result<Expr, StoreError> {
        let is_operator = doc.keys().next().is_some_and(|k| k.starts_with('$'));

        if !is_operator {
            let fields = doc
                .iter()
                .map(|(k, v)| Ok((k.clone(), Expr::parse(v)?)))
                .collect::<Result<_, StoreError>>()?;
            return Ok(Expr::Object(fields));
        }

        if doc.len() != 1 {
            return Err(StoreError::InvalidPipeline(
                "an operator expression must have exactly one field".into(),
            ));
        }
        let (name, arg) = doc.iter().next().ok_or_else(|| {
            StoreError::InvalidPipeline("empty operator expression".into())
        })?;

        match name.as_str() {
            "$literal" => Ok(Expr::Literal(arg.clone())),
            "$switch" => parse_switch(arg),
            "$cond" => parse_cond(arg),
            other => {
                let op = Op::from_name(other).ok_or_else(|| {
                    StoreError::InvalidPipeline(format!("unknown expression operator: {other}"))
                })?;
                let args = match arg {
                    Bson::Array(items) => items.iter().map(Expr::parse).collect::<Result<Vec<_>, _>>()?,
                    single => vec![Expr::parse(single)?],
                };
                if let Some(n) = op.arity() {
                    if args.len() != n {
                        return Err(StoreError::InvalidPipeline(format!(
                            "{other} takes {n} argument(s), got {}",
                            args.len()
                        )));
                    }
                }
                Ok(Expr::Operator(op, args))
            }
        }
    }

    /// Evaluate against a document. `Ok(None)` means the value is missing.
    pub(crate) fn eval(&self, doc: &Document) -> Result<Option<Bson>, StoreError> {
        match self {
            Expr::Literal(v) => Ok(Some(v.clone())),
            Expr::FieldPath(p) => Ok(path::resolve(doc, p)),
            Expr::Object(fields) => {
                let mut out = Document::new();
                for (key, expr) in fields {
                    if let Some(v) = expr.eval(doc)? {
                        out.insert(key.clone(), v);
                    }
                }
                Ok(Some(Bson::Document(out)))
            }
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.eval(doc)?.unwrap_or(Bson::Null));
                }
                Ok(Some(Bson::Array(out)))
            }
            Expr::Switch { branches, default } => {
                for (case, then) in branches {
                    if value::truthy(case.eval(doc)?.as_ref()) {
                        return then.eval(doc);
                    }
                }
                match default {
                    Some(d) => d.eval(doc),
                    None => Err(StoreError::InvalidPipeline(
                        "$switch could not find a matching branch and has no default".into(),
                    )),
                }
            }
            Expr::Cond {
                condition,
                then,
                otherwise,
            } => {
                if value::truthy(condition.eval(doc)?.as_ref()) {
                    then.eval(doc)
                } else {
                    otherwise.eval(doc)
                }
            }
            Expr::Operator(op, args) => eval_operator(*op, args, doc),
        }
    }
}

fn parse_switch(arg: &Bson) -> Result<Expr, StoreError> {
    let Bson::Document(spec) = arg else {
        return Err(StoreError::InvalidPipeline("$switch requires a document".into()));
    };
    let branches = spec
        .get_array("branches")
        .map_err(|_| StoreError::InvalidPipeline("$switch requires a branches array".into()))?
        .iter()
        .map(|branch| {
            let Bson::Document(b) = branch else {
                return Err(StoreError::InvalidPipeline(
                    "$switch branches must be documents".into(),
                ));
            };
            let case = b
                .get("case")
                .ok_or_else(|| StoreError::InvalidPipeline("$switch branch missing case".into()))?;
            let then = b
                .get("then")
                .ok_or_else(|| StoreError::InvalidPipeline("$switch branch missing then".into()))?;
            Ok((Expr::parse(case)?, Expr::parse(then)?))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    let default = spec.get("default").map(Expr::parse).transpose()?.map(Box::new);
    Ok(Expr::Switch { branches, default })
}

fn parse_cond(arg: &Bson) -> Result<Expr, StoreError> {
    let (condition, then, otherwise) = match arg {
        Bson::Array(items) if items.len() == 3 => (&items[0], &items[1], &items[2]),
        Bson::Document(d) => match (d.get("if"), d.get("then"), d.get("else")) {
            (Some(c), Some(t), Some(e)) => (c, t, e),
            _ => {
                return Err(StoreError::InvalidPipeline(
                    "$cond requires if, then and else".into(),
                ));
            }
        },
        _ => {
            return Err(StoreError::InvalidPipeline(
                "$cond requires an array of three or a document".into(),
            ));
        }
    };
    Ok(Expr::Cond {
        condition: Box::new(Expr::parse(condition)?),
        then: Box::new(Expr::parse(then)?),
        otherwise: Box::new(Expr::parse(otherwise)?),
    })
}

fn eval_operator(op: Op, args: &[Expr], doc: &Document) -> Result<Option<Bson>, StoreError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(arg.eval(doc)?);
    }

    let result = match op {
        Op::Eq | Op::Ne | Op::Gt | Op::Gte | Op::Lt | Op::Lte => {
            let a = values[0].clone().unwrap_or(Bson::Null);
            let b = values[1].clone().unwrap_or(Bson::Null);
            let ord = value::compare(&a, &b);
            let hit = match op {
                Op::Eq => ord.is_eq(),
                Op::Ne => ord.is_ne(),
                Op::Gt => ord.is_gt(),
                Op::Gte => ord.is_ge(),
                Op::Lt => ord.is_lt(),
                _ => ord.is_le(),
            };
            Bson::Boolean(hit)
        }
        Op::And => Bson::Boolean(values.iter().all(|v| value::truthy(v.as_ref()))),
        Op::Or => Bson::Boolean(values.iter().any(|v| value::truthy(v.as_ref()))),
        Op::Not => Bson::Boolean(!value::truthy(values[0].as_ref())),
        Op::IfNull => {
            if value::is_nullish(values[0].as_ref()) {
                values[1].clone().unwrap_or(Bson::Null)
            } else {
                values[0].clone().unwrap_or(Bson::Null)
            }
        }
        Op::Add | Op::Multiply | Op::Subtract | Op::Divide => {
            if values.iter().any(|v| value::is_nullish(v.as_ref())) {
                return Ok(Some(Bson::Null));
            }
            let mut numbers = Vec::with_capacity(values.len());
            for v in values.iter().flatten() {
                let n = value::as_number(v).ok_or_else(|| {
                    StoreError::InvalidPipeline(format!("arithmetic on non-numeric value: {v}"))
                })?;
                numbers.push((n, value::is_integral(v)));
            }
            arithmetic(op, &numbers)?
        }
        Op::Avg | Op::Sum => {
            let single_array = matches!(values.as_slice(), [Some(Bson::Array(_))]);
            let items: Vec<Bson> = match values.into_iter().flatten().collect::<Vec<_>>() {
                mut one if single_array => match one.pop() {
                    Some(Bson::Array(items)) => items,
                    _ => Vec::new(),
                },
                many => many,
            };
            if op == Op::Avg {
                average(&items)
            } else {
                sum(&items)
            }
        }
        Op::Size => match &values[0] {
            Some(Bson::Array(items)) => value::integer(items.len() as i64),
            other => {
                return Err(StoreError::InvalidPipeline(format!(
                    "the argument to $size must be an array, got {other:?}"
                )));
            }
        },
        Op::Year | Op::Month | Op::DayOfMonth => match &values[0] {
            None | Some(Bson::Null) => Bson::Null,
            Some(Bson::DateTime(dt)) => {
                let when = DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
                    .ok_or_else(|| StoreError::InvalidPipeline("date out of range".into()))?;
                let part = match op {
                    Op::Year => when.year(),
                    Op::Month => when.month() as i32,
                    _ => when.day() as i32,
                };
                Bson::Int32(part)
            }
            Some(other) => {
                return Err(StoreError::InvalidPipeline(format!(
                    "can't convert from {other} to a date"
                )));
            }
        },
    };
    Ok(Some(result))
}

fn arithmetic(op: Op, numbers: &[(f64, bool)]) -> Result<Bson, StoreError> {
    let all_int = numbers.iter().all(|(_, int)| *int);
    let total = match op {
        Op::Add => numbers.iter().map(|(n, _)| n).sum(),
        Op::Multiply => numbers.iter().map(|(n, _)| n).product(),
        Op::Subtract => numbers[0].0 - numbers[1].0,
        _ => {
            let divisor = numbers[1].0;
            if divisor == 0.0 {
                return Err(StoreError::InvalidPipeline("can't $divide by zero".into()));
            }
            return Ok(Bson::Double(numbers[0].0 / divisor));
        }
    };
    Ok(if all_int {
        value::integer(total as i64)
    } else {
        Bson::Double(total)
    })
}

/// `$avg` over numeric items; non-numeric items are ignored.
pub(crate) fn average(items: &[Bson]) -> Bson {
    let numbers: Vec<f64> = items.iter().filter_map(value::as_number).collect();
    if numbers.is_empty() {
        return Bson::Null;
    }
    Bson::Double(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

/// `$sum` over numeric items; stays integral when every item is.
pub(crate) fn sum(items: &[Bson]) -> Bson {
    let mut total_int: i64 = 0;
    let mut total = 0.0;
    let mut all_int = true;
    for item in items {
        if let Some(n) = value::as_number(item) {
            total += n;
            match item {
                Bson::Int32(i) => total_int += *i as i64,
                Bson::Int64(i) => total_int += *i,
                _ => all_int = false,
            }
        }
    }
    if all_int {
        value::integer(total_int)
    } else {
        Bson::Double(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{DateTime, doc};

    fn eval(expr: Bson, d: &Document) -> Option<Bson> {
        Expr::parse(&expr).unwrap().eval(d).unwrap()
    }

    #[test]
    fn field_paths_and_objects() {
        let d = doc! { "movie": { "title": "Heat", "year": 1995 } };
        assert_eq!(
            eval(Bson::Document(doc! { "t": "$movie.title", "y": "$movie.year", "z": "$nope" }), &d),
            Some(Bson::Document(doc! { "t": "Heat", "y": 1995 }))
        );
    }

    #[test]
    fn avg_and_size_over_arrays() {
        let d = doc! { "reviews": [{ "rating": 8 }, { "rating": 10 }] };
        assert_eq!(eval(Bson::Document(doc! { "$avg": "$reviews.rating" }), &d), Some(Bson::Double(9.0)));
        assert_eq!(eval(Bson::Document(doc! { "$size": "$reviews" }), &d), Some(Bson::Int32(2)));
        let empty = doc! { "reviews": [] };
        assert_eq!(eval(Bson::Document(doc! { "$avg": "$reviews.rating" }), &empty), Some(Bson::Null));
    }

    #[test]
    fn switch_buckets() {
        let switch = Bson::Document(doc! { "$switch": {
            "branches": [
                { "case": { "$lte": ["$rating", 2] }, "then": "0-2" },
                { "case": { "$lte": ["$rating", 4] }, "then": "2-4" },
            ],
            "default": "other",
        } });
        assert_eq!(eval(switch.clone(), &doc! { "rating": 2 }), Some(Bson::String("0-2".into())));
        assert_eq!(eval(switch.clone(), &doc! { "rating": 3 }), Some(Bson::String("2-4".into())));
        assert_eq!(eval(switch, &doc! { "rating": 9 }), Some(Bson::String("other".into())));
    }

    #[test]
    fn divide_and_cond_guard() {
        let d = doc! { "helpful": 3, "total": 4, "zero": 0 };
        assert_eq!(eval(Bson::Document(doc! { "$divide": ["$helpful", "$total"] }), &d), Some(Bson::Double(0.75)));
        let guarded = Bson::Document(doc! { "$cond": [
            { "$eq": ["$zero", 0] }, 0, { "$divide": ["$helpful", "$zero"] }
        ] });
        assert_eq!(eval(guarded, &d), Some(Bson::Int32(0)));

        let err = Expr::parse(&Bson::Document(doc! { "$divide": ["$helpful", "$zero"] }))
            .unwrap()
            .eval(&d)
            .unwrap_err();
        assert!(err.to_string().contains("divide by zero"));
    }

    #[test]
    fn date_parts() {
        // 2021-03-15T12:00:00Z
        let d = doc! { "review_date": DateTime::from_millis(1_615_809_600_000) };
        assert_eq!(eval(Bson::Document(doc! { "$year": "$review_date" }), &d), Some(Bson::Int32(2021)));
        assert_eq!(eval(Bson::Document(doc! { "$month": "$review_date" }), &d), Some(Bson::Int32(3)));
        assert_eq!(eval(Bson::Document(doc! { "$dayOfMonth": "$review_date" }), &d), Some(Bson::Int32(15)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert!(Expr::parse(&Bson::Document(doc! { "$frobnicate": 1 })).is_err());
        assert!(Expr::parse(&Bson::Document(doc! { "$divide": [1] })).is_err());
    }
}
