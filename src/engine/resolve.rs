use std::borrow::Cow;

use serde_json::Value;

use crate::domain::doc_path::{DocPath, PathStep};
use crate::domain::error::ResolutionError;

/// Resolves `path` against `root`.
///
/// Nodes are borrowed from the document; only a key step applied to a
/// sequence (projection over its mapping elements) produces an owned node.
pub fn resolve<'a>(root: &'a Value, path: &DocPath) -> Result<Cow<'a, Value>, ResolutionError> {
    let mut current = Cow::Borrowed(root);
    for (position, step) in path.steps().iter().enumerate() {
        current = match current {
            Cow::Borrowed(node) => apply_step(node, step, path, position)?,
            Cow::Owned(node) => Cow::Owned(apply_step(&node, step, path, position)?.into_owned()),
        };
    }
    Ok(current)
}

fn apply_step<'a>(
    node: &'a Value,
    step: &PathStep,
    path: &DocPath,
    position: usize,
) -> Result<Cow<'a, Value>, ResolutionError> {
    match (step, node) {
        (PathStep::Key(key), Value::Object(map)) => map
            .get(key)
            .map(Cow::Borrowed)
            .ok_or_else(|| ResolutionError::MissingKey {
                at: location(path, position),
                key: key.clone(),
            }),
        (PathStep::Key(key), Value::Array(items)) => project(items, key, path, position),
        (PathStep::Index(index), Value::Array(items)) => items
            .get(*index)
            .map(Cow::Borrowed)
            .ok_or_else(|| ResolutionError::IndexOutOfRange {
                at: location(path, position),
                index: *index,
                len: items.len(),
            }),
        (PathStep::Wildcard, Value::Array(_)) => Ok(Cow::Borrowed(node)),
        (step, other) => Err(not_traversable(step, other, path, position)),
    }
}

/// Collects `key` from every mapping element that has it; elements without
/// the key are skipped. Nested sequences are not flattened.
fn project<'a>(
    items: &'a [Value],
    key: &str,
    path: &DocPath,
    position: usize,
) -> Result<Cow<'a, Value>, ResolutionError> {
    let mut projected = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => {
                if let Some(value) = map.get(key) {
                    projected.push(value.clone());
                }
            }
            other => {
                return Err(ResolutionError::NotTraversable {
                    at: format!("{}[{index}]", location(path, position)),
                    step: format!(".{key}"),
                    kind: node_kind(other),
                });
            }
        }
    }
    if projected.is_empty() {
        return Err(ResolutionError::MissingKey {
            at: location(path, position),
            key: key.to_string(),
        });
    }
    Ok(Cow::Owned(Value::Array(projected)))
}

fn not_traversable(step: &PathStep, node: &Value, path: &DocPath, position: usize) -> ResolutionError {
    let step = match step {
        PathStep::Key(key) => format!(".{key}"),
        PathStep::Index(index) => format!("[{index}]"),
        PathStep::Wildcard => "[*]".to_string(),
    };
    ResolutionError::NotTraversable {
        at: location(path, position),
        step,
        kind: node_kind(node),
    }
}

fn location(path: &DocPath, position: usize) -> String {
    path.prefix(position).to_string()
}

/// Node kind name used in resolution errors and mismatch reports.
pub fn node_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
