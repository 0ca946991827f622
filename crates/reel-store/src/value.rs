use std::cmp::Ordering;

use bson::Bson;

/// Numeric view of a BSON value. Only int32, int64 and double qualify.
pub fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

/// Narrow an integral total back to the smallest BSON integer type.
pub(crate) fn integer(total: i64) -> Bson {
    match i32::try_from(total) {
        Ok(small) => Bson::Int32(small),
        Err(_) => Bson::Int64(total),
    }
}

pub(crate) fn is_integral(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_))
}

pub(crate) fn is_nullish(value: Option<&Bson>) -> bool {
    matches!(value, None | Some(Bson::Null) | Some(Bson::Undefined))
}

/// Aggregation truthiness: false, null, missing and zero are false.
pub(crate) fn truthy(value: Option<&Bson>) -> bool {
    match value {
        None | Some(Bson::Null) | Some(Bson::Undefined) => false,
        Some(Bson::Boolean(b)) => *b,
        Some(v) => as_number(v).is_none_or(|n| n != 0.0),
    }
}

/// Canonical BSON type bracket used for cross-type ordering.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

pub(crate) fn same_bracket(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b)
}

/// Total order over BSON values following the document-database sort order:
/// null < numbers < strings < documents < arrays < ObjectId < booleans < dates.
pub fn compare(a: &Bson, b: &Bson) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Symbol(x), Bson::Symbol(y)) => x.cmp(y),
        (Bson::Document(x), Bson::Document(y)) => {
            for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                let ord = ka.cmp(kb).then_with(|| compare(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Array(x), Bson::Array(y)) => {
            for (va, vb) in x.iter().zip(y.iter()) {
                let ord = compare(va, vb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

pub fn equal(a: &Bson, b: &Bson) -> bool {
    compare(a, b) == Ordering::Equal
}

/// Stable hashable key for a value. Numerically equal values of different
/// integer/double types produce the same key.
pub(crate) fn key_of(value: &Bson) -> String {
    match value {
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
            let n = as_number(value).unwrap_or_default();
            if n.fract() == 0.0 && n.abs() < 9.0e15 {
                format!("n:{}", n as i64)
            } else {
                format!("n:{n}")
            }
        }
        Bson::String(s) => format!("s:{s}"),
        Bson::ObjectId(oid) => format!("o:{}", oid.to_hex()),
        Bson::DateTime(dt) => format!("d:{}", dt.timestamp_millis()),
        Bson::Boolean(b) => format!("b:{b}"),
        Bson::Null | Bson::Undefined => "z".to_string(),
        Bson::Document(doc) => {
            let parts: Vec<String> = doc
                .iter()
                .map(|(k, v)| format!("{k}={}", key_of(v)))
                .collect();
            format!("D{{{}}}", parts.join(","))
        }
        Bson::Array(items) => {
            let parts: Vec<String> = items.iter().map(key_of).collect();
            format!("A[{}]", parts.join(","))
        }
        other => format!("x:{other}"),
    }
}
