//! Path-addressed mutation of a document tree.

use serde_json::Value;
use thiserror::Error;

use super::path::{DocPath, Step};

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    Set { path: DocPath, value: Value },
    Delete { path: DocPath },
}

impl MutationOp {
    pub fn path(&self) -> &DocPath {
        match self {
            MutationOp::Set { path, .. } | MutationOp::Delete { path } => path,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl PatchError {
    fn invalid(path: &DocPath, reason: impl Into<String>) -> Self {
        PatchError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Apply `ops` in order to a deep copy of `document`.
///
/// All-or-nothing: if any op fails the error is returned and no partial
/// result escapes. Deleting an array element leaves a `null` hole so that
/// indices computed for the same batch stay valid.
pub fn apply(document: &Value, ops: &[MutationOp]) -> Result<Value, PatchError> {
    let mut patched = document.clone();
    for op in ops {
        apply_one(&mut patched, op)?;
    }
    Ok(patched)
}

fn apply_one(root: &mut Value, op: &MutationOp) -> Result<(), PatchError> {
    let path = op.path();
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| PatchError::invalid(path, "empty path"))?;
    let parent = navigate(root, parents, path)?;

    match op {
        MutationOp::Set { value, .. } => set_child(parent, last, value.clone(), path),
        MutationOp::Delete { .. } => delete_child(parent, last, path),
    }
}

/// Walk `steps` from `root`, failing instead of creating missing structure.
fn navigate<'a>(
    root: &'a mut Value,
    steps: &[Step],
    full: &DocPath,
) -> Result<&'a mut Value, PatchError> {
    let mut current = root;
    for (depth, step) in steps.iter().enumerate() {
        let fail = |what: &str| {
            let here = DocPath::from(&steps[..=depth]);
            PatchError::invalid(full, format!("{what} at {here}"))
        };
        current = match (current, step) {
            (Value::Object(map), Step::Key(key)) => {
                map.get_mut(key).ok_or_else(|| fail("no key"))?
            }
            (Value::Object(map), Step::Index(idx)) => {
                map.get_mut(&idx.to_string()).ok_or_else(|| fail("no key"))?
            }
            (Value::Array(items), Step::Index(idx)) => {
                items.get_mut(*idx).ok_or_else(|| fail("index out of bounds"))?
            }
            (Value::Array(_), Step::Key(_)) => return Err(fail("key step into array")),
            _ => return Err(fail("step into scalar")),
        };
    }
    Ok(current)
}

fn set_child(
    parent: &mut Value,
    step: &Step,
    value: Value,
    path: &DocPath,
) -> Result<(), PatchError> {
    match (parent, step) {
        (Value::Object(map), Step::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Object(map), Step::Index(idx)) => {
            map.insert(idx.to_string(), value);
            Ok(())
        }
        (Value::Array(items), Step::Index(idx)) => {
            let slot = items
                .get_mut(*idx)
                .ok_or_else(|| PatchError::invalid(path, "index out of bounds"))?;
            *slot = value;
            Ok(())
        }
        (Value::Array(_), Step::Key(_)) => Err(PatchError::invalid(path, "key step into array")),
        _ => Err(PatchError::invalid(path, "parent is not a container")),
    }
}

fn delete_child(parent: &mut Value, step: &Step, path: &DocPath) -> Result<(), PatchError> {
    let removed = match (parent, step) {
        (Value::Object(map), Step::Key(key)) => map.remove(key).is_some(),
        (Value::Object(map), Step::Index(idx)) => map.remove(&idx.to_string()).is_some(),
        (Value::Array(items), Step::Index(idx)) => match items.get_mut(*idx) {
            Some(slot) => {
                *slot = Value::Null;
                true
            }
            None => false,
        },
        (Value::Array(_), Step::Key(_)) => {
            return Err(PatchError::invalid(path, "key step into array"));
        }
        _ => return Err(PatchError::invalid(path, "parent is not a container")),
    };
    if removed {
        Ok(())
    } else {
        Err(PatchError::invalid(path, "nothing to delete"))
    }
}
