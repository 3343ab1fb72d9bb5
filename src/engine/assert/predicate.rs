use serde_json::{Number, Value, json};

use crate::domain::error::AssertionMismatch;
use crate::domain::fixture::{Predicate, SequenceMatch};
use crate::engine::resolve::node_kind;

/// Result of checking one resolved value against one predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// `observed` is what the predicate looked at (the value, a size, a key).
    Pass { observed: Value },
    Mismatch(AssertionMismatch),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }
}

pub fn evaluate(actual: &Value, predicate: &Predicate) -> Verdict {
    match predicate {
        Predicate::Equals(expected) => {
            if values_equal(actual, expected) {
                pass(actual.clone())
            } else {
                mismatch("value_mismatch", expected.clone(), actual.clone())
            }
        }
        Predicate::ContainsSubstring(needle) => match actual {
            Value::String(text) if text.contains(needle.as_str()) => pass(actual.clone()),
            Value::String(_) => mismatch("substring_missing", json!(needle), actual.clone()),
            other => mismatch("not_a_string", json!(needle), kind_of(other)),
        },
        Predicate::HasSize(expected) => match collection_size(actual) {
            Some(size) if size == *expected => pass(json!(size)),
            Some(size) => mismatch("size_mismatch", json!(expected), json!(size)),
            None => mismatch("not_a_collection", json!(expected), kind_of(actual)),
        },
        Predicate::HasKey(key) => match actual {
            Value::Object(map) if map.contains_key(key) => pass(json!(key)),
            Value::Object(map) => mismatch(
                "key_missing",
                json!(key),
                Value::Array(map.keys().cloned().map(Value::String).collect()),
            ),
            other => mismatch("not_a_mapping", json!(key), kind_of(other)),
        },
        Predicate::ContainsAll(sequence) => match actual {
            Value::Array(items) => contains_all(items, sequence, actual),
            other => mismatch(
                "not_a_sequence",
                Value::Array(sequence.items.clone()),
                kind_of(other),
            ),
        },
    }
}

fn contains_all(items: &[Value], sequence: &SequenceMatch, actual: &Value) -> Verdict {
    let expected = Value::Array(sequence.items.clone());
    if sequence.ordered {
        let same = items.len() == sequence.items.len()
            && items
                .iter()
                .zip(&sequence.items)
                .all(|(left, right)| values_equal(left, right));
        if same {
            pass(actual.clone())
        } else {
            mismatch("sequence_mismatch", expected, actual.clone())
        }
    } else {
        let all_present = sequence
            .items
            .iter()
            .all(|wanted| items.iter().any(|item| values_equal(item, wanted)));
        if all_present {
            pass(actual.clone())
        } else {
            mismatch("item_missing", expected, actual.clone())
        }
    }
}

/// Deep equality that is type sensitive but compares numbers by value.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, value)| {
                    right
                        .get(key)
                        .is_some_and(|other| values_equal(value, other))
                })
        }
        _ => left == right,
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }
    if left.is_f64() || right.is_f64() {
        return left.as_f64() == right.as_f64();
    }
    false
}

fn collection_size(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> Value {
    Value::String(node_kind(value).to_string())
}

fn pass(observed: Value) -> Verdict {
    Verdict::Pass { observed }
}

fn mismatch(reason: &'static str, expected: Value, actual: Value) -> Verdict {
    Verdict::Mismatch(AssertionMismatch {
        reason,
        expected,
        actual,
    })
}
