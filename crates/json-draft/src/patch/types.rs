//! Core types for patches.

use json_draft_path::{format_json_pointer, Path};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DraftError;
use crate::value::Value;

// ── Error ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("NOT_FOUND")]
    NotFound,
    #[error("INVALID_INDEX")]
    InvalidIndex,
    #[error("INVALID_TARGET")]
    InvalidTarget,
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
    #[error(transparent)]
    Draft(#[from] DraftError),
}

// ── Patch ─────────────────────────────────────────────────────────────────

/// One recorded change.
///
/// On the wire: `{"op": "replace", "path": ["a", 0], "value": 2,
/// "origValue": 1}`. `origValue` is what an inverse patch needs and is
/// omitted when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Patch {
    Add {
        path: Path,
        value: Value,
    },
    Replace {
        path: Path,
        value: Value,
        #[serde(rename = "origValue", default, skip_serializing_if = "Option::is_none")]
        orig_value: Option<Value>,
    },
    Remove {
        path: Path,
        #[serde(rename = "origValue", default, skip_serializing_if = "Option::is_none")]
        orig_value: Option<Value>,
    },
}

impl Patch {
    pub fn op_name(&self) -> &'static str {
        match self {
            Patch::Add { .. } => "add",
            Patch::Replace { .. } => "replace",
            Patch::Remove { .. } => "remove",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Patch::Add { path, .. } | Patch::Replace { path, .. } | Patch::Remove { path, .. } => {
                path
            }
        }
    }

    /// The written value, for `add` and `replace`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Patch::Add { value, .. } | Patch::Replace { value, .. } => Some(value),
            Patch::Remove { .. } => None,
        }
    }

    /// The patch that undoes this one, if enough is known to build it.
    pub fn invert(&self) -> Option<Patch> {
        match self {
            Patch::Add { path, value } => Some(Patch::Remove {
                path: path.clone(),
                orig_value: Some(value.clone()),
            }),
            Patch::Replace {
                path,
                value,
                orig_value,
            } => orig_value.as_ref().map(|orig| Patch::Replace {
                path: path.clone(),
                value: orig.clone(),
                orig_value: Some(value.clone()),
            }),
            Patch::Remove { path, orig_value } => orig_value.as_ref().map(|orig| Patch::Add {
                path: path.clone(),
                value: orig.clone(),
            }),
        }
    }

    /// The path as a JSON Pointer string.
    pub fn pointer(&self) -> String {
        format_json_pointer(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_draft_path::PathStep;
    use serde_json::json;

    #[test]
    fn wire_shape() {
        let patch = Patch::Replace {
            path: vec!["list".into(), 0.into()],
            value: Value::from(2),
            orig_value: Some(Value::from(1)),
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            json!({"op": "replace", "path": ["list", 0], "value": 2, "origValue": 1})
        );
        let back: Patch = serde_json::from_value(json).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn remove_without_orig_value() {
        let patch: Patch = serde_json::from_value(json!({"op": "remove", "path": ["a"]})).unwrap();
        assert_eq!(
            patch,
            Patch::Remove {
                path: vec![PathStep::from("a")],
                orig_value: None
            }
        );
        assert_eq!(patch.invert(), None);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"op": "remove", "path": ["a"]})
        );
    }

    #[test]
    fn unknown_op_is_rejected() {
        let res = serde_json::from_value::<Patch>(json!({"op": "move", "path": []}));
        assert!(res.is_err());
    }

    #[test]
    fn invert_swaps_values() {
        let add = Patch::Add {
            path: vec!["a".into()],
            value: Value::from(1),
        };
        let remove = add.invert().unwrap();
        assert_eq!(remove.op_name(), "remove");
        assert_eq!(remove.invert(), Some(add));

        let replace = Patch::Replace {
            path: vec![],
            value: Value::from("new"),
            orig_value: Some(Value::from("old")),
        };
        assert_eq!(replace.invert().unwrap().value(), Some(&Value::from("old")));
        assert_eq!(replace.pointer(), "");
    }
}
