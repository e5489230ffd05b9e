//! The outbound mutation mirror.
//!
//! Local writes to a subscribed document go through [`DocumentMut`], which
//! applies the write and records a wire op for the next sync tick when the
//! path is observable. A path is observable iff its last segment does not
//! begin with `_`, the segment is not in the excluded set, and the path is
//! not under `/entities` (entity transforms travel on the fast channel, and
//! entity subtrees are too large to mirror field-by-field).

use std::collections::HashSet;

use serde_json::Value;

use scenesync_shared::WireOp;

use crate::error::MirrorError;

use super::document::DocumentState;

pub struct DocumentMut<'a> {
    state: &'a mut DocumentState,
    changes: &'a mut Vec<WireOp>,
    observing: bool,
    excluded: &'a HashSet<String>,
}

impl<'a> DocumentMut<'a> {
    pub(crate) fn new(
        state: &'a mut DocumentState,
        changes: &'a mut Vec<WireOp>,
        observing: bool,
        excluded: &'a HashSet<String>,
    ) -> Self {
        Self {
            state,
            changes,
            observing,
            excluded,
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.state.doc.pointer(path)
    }

    /// Write a field, recording the mutation for the next sync tick when the
    /// path is observable.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), MirrorError> {
        write_field(&mut self.state.doc, path, value.clone())?;
        if self.observing && observable(path, self.excluded) {
            self.changes.push(WireOp::replace(path, value));
        }
        Ok(())
    }

    /// Delete a field. Deleting a field that does not exist is a no-op.
    pub fn remove(&mut self, path: &str) -> Result<(), MirrorError> {
        let existed = remove_field(&mut self.state.doc, path)?;
        if existed && self.observing && observable(path, self.excluded) {
            self.changes.push(WireOp::remove(path));
        }
        Ok(())
    }
}

fn observable(path: &str, excluded: &HashSet<String>) -> bool {
    let Some((first, leaf)) = first_and_leaf(path) else {
        return false;
    };
    if first == "entities" {
        return false;
    }
    if leaf.starts_with('_') {
        return false;
    }
    !excluded.contains(leaf)
}

fn first_and_leaf(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    let first = rest.split('/').next().unwrap_or(rest);
    let leaf = rest.rsplit('/').next().unwrap_or(rest);
    Some((first, leaf))
}

fn split_parent(path: &str) -> Option<(&str, &str)> {
    if !path.starts_with('/') {
        return None;
    }
    let split_at = path.rfind('/')?;
    let leaf = &path[split_at + 1..];
    if leaf.is_empty() {
        return None;
    }
    Some((&path[..split_at], leaf))
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn write_field(doc: &mut Value, path: &str, value: Value) -> Result<(), MirrorError> {
    let (parent, leaf) = split_parent(path).ok_or_else(|| MirrorError::InvalidPath {
        path: path.to_owned(),
    })?;
    let target = doc
        .pointer_mut(parent)
        .ok_or_else(|| MirrorError::MissingParent {
            path: path.to_owned(),
        })?;
    match target {
        Value::Object(map) => {
            map.insert(unescape(leaf), value);
            Ok(())
        }
        Value::Array(items) => {
            let index: usize = leaf.parse().map_err(|_| MirrorError::InvalidPath {
                path: path.to_owned(),
            })?;
            if index < items.len() {
                items[index] = value;
                Ok(())
            } else if index == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(MirrorError::InvalidPath {
                    path: path.to_owned(),
                })
            }
        }
        _ => Err(MirrorError::MissingParent {
            path: path.to_owned(),
        }),
    }
}

fn remove_field(doc: &mut Value, path: &str) -> Result<bool, MirrorError> {
    let (parent, leaf) = split_parent(path).ok_or_else(|| MirrorError::InvalidPath {
        path: path.to_owned(),
    })?;
    let target = doc
        .pointer_mut(parent)
        .ok_or_else(|| MirrorError::MissingParent {
            path: path.to_owned(),
        })?;
    match target {
        Value::Object(map) => Ok(map.remove(&unescape(leaf)).is_some()),
        Value::Array(items) => {
            let index: usize = leaf.parse().map_err(|_| MirrorError::InvalidPath {
                path: path.to_owned(),
            })?;
            if index < items.len() {
                items.remove(index);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        _ => Err(MirrorError::MissingParent {
            path: path.to_owned(),
        }),
    }
}
