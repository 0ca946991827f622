use std::collections::HashMap;

use bson::{Bson, Document};

use super::expr::{self, Expr};
use crate::error::StoreError;
use crate::value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accumulator {
    Sum,
    Avg,
    First,
    Last,
    Min,
    Max,
    Push,
}

impl Accumulator {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "$sum" => Accumulator::Sum,
            "$avg" => Accumulator::Avg,
            "$first" => Accumulator::First,
            "$last" => Accumulator::Last,
            "$min" => Accumulator::Min,
            "$max" => Accumulator::Max,
            "$push" => Accumulator::Push,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GroupStage {
    key: Expr,
    fields: Vec<(String, Accumulator, Expr)>,
}

impl GroupStage {
    pub(crate) fn parse(spec: &Document) -> Result<Self, StoreError> {
        let key = spec
            .get("_id")
            .ok_or_else(|| StoreError::InvalidPipeline("$group requires an _id".into()))?;
        let key = Expr::parse(key)?;

        let mut fields = Vec::new();
        for (name, acc) in spec {
            if name == "_id" {
                continue;
            }
            let Bson::Document(acc) = acc else {
                return Err(StoreError::InvalidPipeline(format!(
                    "$group field {name} must be an accumulator document"
                )));
            };
            let (op, arg) = match acc.iter().next() {
                Some(entry) if acc.len() == 1 => entry,
                _ => {
                    return Err(StoreError::InvalidPipeline(format!(
                        "$group field {name} must have exactly one accumulator"
                    )));
                }
            };
            let op = Accumulator::from_name(op).ok_or_else(|| {
                StoreError::InvalidPipeline(format!("unknown group accumulator: {op}"))
            })?;
            fields.push((name.clone(), op, Expr::parse(arg)?));
        }
        Ok(Self { key, fields })
    }

    /// Groups come out in the order their key was first seen.
    pub(crate) fn apply(&self, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(Bson, Vec<Vec<Option<Bson>>>)> = Vec::new();

        for doc in &docs {
            let key = self.key.eval(doc)?.unwrap_or(Bson::Null);
            let slot = *slots.entry(value::key_of(&key)).or_insert_with(|| {
                groups.push((key, vec![Vec::new(); self.fields.len()]));
                groups.len() - 1
            });
            for (i, (_, _, arg)) in self.fields.iter().enumerate() {
                groups[slot].1[i].push(arg.eval(doc)?);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(key, inputs)| {
                let mut out = Document::new();
                out.insert("_id", key);
                for ((name, op, _), values) in self.fields.iter().zip(inputs) {
                    out.insert(name.clone(), accumulate(*op, values));
                }
                out
            })
            .collect())
    }
}

fn accumulate(op: Accumulator, values: Vec<Option<Bson>>) -> Bson {
    match op {
        Accumulator::Sum => expr::sum(&values.into_iter().flatten().collect::<Vec<_>>()),
        Accumulator::Avg => expr::average(&values.into_iter().flatten().collect::<Vec<_>>()),
        Accumulator::First => values.into_iter().next().flatten().unwrap_or(Bson::Null),
        Accumulator::Last => values.into_iter().last().flatten().unwrap_or(Bson::Null),
        Accumulator::Min | Accumulator::Max => {
            let present = values
                .into_iter()
                .flatten()
                .filter(|v| !matches!(v, Bson::Null | Bson::Undefined));
            let picked = if op == Accumulator::Min {
                present.min_by(value::compare)
            } else {
                present.max_by(value::compare)
            };
            picked.unwrap_or(Bson::Null)
        }
        Accumulator::Push => Bson::Array(values.into_iter().flatten().collect()),
    }
}
