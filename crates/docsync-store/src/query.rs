//! Listing helpers shared by backends that evaluate `build_query` in memory.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use docsync_core::Body;

use crate::traits::{QueryOptions, QueryRow, SortOrder};

/// Turn `(id, body)` pairs into query rows.
///
/// Rows are ordered by id, then by each `sort_on` key in turn (stable), then
/// windowed by `limit` and projected by `select_list`.
pub fn apply_query(mut docs: Vec<(String, Body)>, options: &QueryOptions) -> Vec<QueryRow> {
    docs.sort_by(|a, b| a.0.cmp(&b.0));

    if !options.sort_on.is_empty() {
        docs.sort_by(|(_, a), (_, b)| {
            for key in &options.sort_on {
                let ordering = compare_values(field(a, &key.0), field(b, &key.0));
                let ordering = match key.1 {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    let (skip, count) = options.limit.unwrap_or((0, usize::MAX));

    docs.into_iter()
        .skip(skip)
        .take(count)
        .map(|(id, body)| {
            let mut value = Map::new();
            for name in &options.select_list {
                if let Some(v) = body.get(name) {
                    value.insert(name.clone(), v.clone());
                }
            }
            QueryRow {
                id,
                value,
                doc: options.include_docs.then_some(body),
            }
        })
        .collect()
}

fn field<'a>(body: &'a Body, name: &str) -> &'a Value {
    body.get(name).unwrap_or(&Value::Null)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (a, b) in x.iter().zip(y.iter()) {
                let ordering = compare_values(a, b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
