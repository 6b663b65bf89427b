//! Query Matcher
//!
//! Evaluates a Mongo-style filter object against a single record.
//!
//! A filter maps field names to either a plain scalar (exact equality) or an
//! operator object such as `{"$gte": 18, "$lt": 65}`. All top-level keys are
//! ANDed. An empty filter matches every record.
//!
//! Supported operators: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`. An unrecognized operator is a client configuration error and
//! surfaces as [`DbError::UnknownOperator`] rather than a silent non-match.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::error::{DbError, Result};

/// A record as stored on disk: a flat field → value mapping.
pub type Record = Map<String, Value>;

/// Match a record against a query filter.
///
/// Returns `Ok(true)` if every filter key is present on the record and its
/// condition holds. A record lacking a filtered key never matches.
pub fn matches(record: &Record, query: &Record) -> Result<bool> {
    if query.is_empty() {
        return Ok(true);
    }

    for (key, condition) in query {
        let value = match record.get(key) {
            Some(v) => v,
            None => return Ok(false),
        };

        if !match_condition(value, condition)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Evaluate one field value against its condition.
///
/// A non-object condition is an exact-equality test; an object is a
/// conjunction of operator clauses.
fn match_condition(value: &Value, condition: &Value) -> Result<bool> {
    let clauses = match condition.as_object() {
        Some(c) => c,
        None => return Ok(values_equal(value, condition)),
    };

    for (op, operand) in clauses {
        let holds = match op.as_str() {
            "$eq" => values_equal(value, operand),
            "$ne" => !values_equal(value, operand),
            "$gt" => compare(value, operand) == Some(Ordering::Greater),
            "$gte" => matches!(
                compare(value, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            "$lt" => compare(value, operand) == Some(Ordering::Less),
            "$lte" => matches!(
                compare(value, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            "$in" => membership(value, operand),
            "$nin" => !membership(value, operand),
            other => {
                return Err(DbError::UnknownOperator {
                    operator: other.to_string(),
                })
            }
        };

        if !holds {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Equality with numeric widening so `30` and `30.0` compare equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Relational comparison. Numbers compare numerically across integer/float,
/// strings lexicographically. Mixed or non-orderable types do not compare,
/// so `$gt`-style clauses fail for them.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Some(x.cmp(y));
    }
    None
}

/// `$in` / `$nin` membership. A non-array operand never matches.
fn membership(value: &Value, operand: &Value) -> bool {
    operand
        .as_array()
        .map(|items| items.iter().any(|item| values_equal(value, item)))
        .unwrap_or(false)
}
