//! Wire-compact patch ops and their translation to standard JSON-Patch.
//!
//! The wire form is `{p: path, v: value, o?: letter}` where an absent letter
//! means `replace`. Letters: `a` = add, `r` = remove, `d` = delete (applied
//! as remove; standard JSON-Patch has no delete op), `t` = test.

use json_patch::{
    AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation, TestOperation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PatchError;

/// A single patch operation in wire-compact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireOp {
    pub p: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o: Option<String>,
}

impl WireOp {
    pub fn replace(path: &str, value: Value) -> Self {
        Self {
            p: path.to_owned(),
            v: Some(value),
            o: None,
        }
    }

    pub fn remove(path: &str) -> Self {
        Self {
            p: path.to_owned(),
            v: None,
            o: Some("r".to_owned()),
        }
    }
}

/// Translate a wire op into standard `{op, path, value}` form.
pub fn to_standard(op: &WireOp) -> Result<PatchOperation, PatchError> {
    let path = op.p.clone();
    let value = || op.v.clone().unwrap_or(Value::Null);
    match op.o.as_deref() {
        None => Ok(PatchOperation::Replace(ReplaceOperation {
            path,
            value: value(),
        })),
        Some("a") => Ok(PatchOperation::Add(AddOperation {
            path,
            value: value(),
        })),
        Some("r") | Some("d") => Ok(PatchOperation::Remove(RemoveOperation { path })),
        Some("t") => Ok(PatchOperation::Test(TestOperation {
            path,
            value: value(),
        })),
        Some(other) => Err(PatchError::UnknownOpCode {
            code: other.to_owned(),
        }),
    }
}

/// Translate a standard op back into wire-compact form.
pub fn to_wire(op: &PatchOperation) -> Result<WireOp, PatchError> {
    match op {
        PatchOperation::Replace(inner) => Ok(WireOp {
            p: inner.path.clone(),
            v: Some(inner.value.clone()),
            o: None,
        }),
        PatchOperation::Add(inner) => Ok(WireOp {
            p: inner.path.clone(),
            v: Some(inner.value.clone()),
            o: Some("a".to_owned()),
        }),
        PatchOperation::Remove(inner) => Ok(WireOp {
            p: inner.path.clone(),
            v: None,
            o: Some("r".to_owned()),
        }),
        PatchOperation::Test(inner) => Ok(WireOp {
            p: inner.path.clone(),
            v: Some(inner.value.clone()),
            o: Some("t".to_owned()),
        }),
        PatchOperation::Move(_) => Err(PatchError::Unrepresentable { op: "move" }),
        PatchOperation::Copy(_) => Err(PatchError::Unrepresentable { op: "copy" }),
    }
}

/// Apply a single standard-form op to a document, isolating failures to the
/// offending op.
pub fn apply(doc: &mut Value, op: PatchOperation) -> Result<(), PatchError> {
    let path = op_path(&op).to_owned();
    json_patch::patch(doc, &Patch(vec![op])).map_err(|err| PatchError::Apply {
        path,
        detail: err.to_string(),
    })
}

fn op_path(op: &PatchOperation) -> &str {
    match op {
        PatchOperation::Add(inner) => &inner.path,
        PatchOperation::Remove(inner) => &inner.path,
        PatchOperation::Replace(inner) => &inner.path,
        PatchOperation::Move(inner) => &inner.path,
        PatchOperation::Copy(inner) => &inner.path,
        PatchOperation::Test(inner) => &inner.path,
    }
}
