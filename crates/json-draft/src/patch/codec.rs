//! JSON codec for patches in RFC 6902 form.
//!
//! Paths are JSON Pointer strings (`/list/0`). Every step decodes to a key;
//! digit keys still address array elements when the patch is applied.

use json_draft_path::{format_json_pointer, parse_json_pointer, validate_json_pointer, Path};
use serde_json::{json, Map};

use super::types::{Patch, PatchError};
use crate::value::Value;

fn encode_value(value: &Value) -> Result<serde_json::Value, PatchError> {
    Ok(value.to_json()?)
}

fn decode_path(v: &serde_json::Value) -> Result<Path, PatchError> {
    let s = v
        .as_str()
        .ok_or_else(|| PatchError::InvalidOp("path must be a string".into()))?;
    validate_json_pointer(s).map_err(|e| PatchError::InvalidOp(e.to_string()))?;
    Ok(parse_json_pointer(s))
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize a [`Patch`] to a JSON Patch operation.
pub fn to_json(patch: &Patch) -> Result<serde_json::Value, PatchError> {
    let path = format_json_pointer(patch.path());
    Ok(match patch {
        Patch::Add { value, .. } => json!({
            "op": "add",
            "path": path,
            "value": encode_value(value)?
        }),
        Patch::Replace {
            value, orig_value, ..
        } => {
            let mut m = Map::new();
            m.insert("op".into(), json!("replace"));
            m.insert("path".into(), json!(path));
            m.insert("value".into(), encode_value(value)?);
            if let Some(orig) = orig_value {
                m.insert("origValue".into(), encode_value(orig)?);
            }
            serde_json::Value::Object(m)
        }
        Patch::Remove { orig_value, .. } => {
            let mut m = Map::new();
            m.insert("op".into(), json!("remove"));
            m.insert("path".into(), json!(path));
            if let Some(orig) = orig_value {
                m.insert("origValue".into(), encode_value(orig)?);
            }
            serde_json::Value::Object(m)
        }
    })
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Deserialize a JSON Patch operation. Only `add`, `replace` and `remove`
/// are understood.
pub fn from_json(v: &serde_json::Value) -> Result<Patch, PatchError> {
    let obj = v
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("operation must be an object".into()))?;
    let op = obj
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PatchError::InvalidOp("missing 'op' field".into()))?;
    let path = decode_path(obj.get("path").unwrap_or(&json!("")))?;
    let orig_value = obj.get("origValue").cloned().map(Value::from);

    match op {
        "add" => {
            let value = obj
                .get("value")
                .ok_or_else(|| PatchError::InvalidOp("add requires 'value'".into()))?;
            Ok(Patch::Add {
                path,
                value: Value::from(value.clone()),
            })
        }
        "replace" => {
            let value = obj
                .get("value")
                .ok_or_else(|| PatchError::InvalidOp("replace requires 'value'".into()))?;
            Ok(Patch::Replace {
                path,
                value: Value::from(value.clone()),
                orig_value,
            })
        }
        "remove" => Ok(Patch::Remove { path, orig_value }),
        other => Err(PatchError::InvalidOp(format!("unsupported op: {other}"))),
    }
}

/// Serialize patches to a JSON Patch document.
pub fn to_json_patch(patches: &[Patch]) -> Result<serde_json::Value, PatchError> {
    patches
        .iter()
        .map(to_json)
        .collect::<Result<Vec<_>, _>>()
        .map(serde_json::Value::Array)
}

/// Deserialize a JSON Patch document.
pub fn from_json_patch(v: &serde_json::Value) -> Result<Vec<Patch>, PatchError> {
    let arr = v
        .as_array()
        .ok_or_else(|| PatchError::InvalidOp("patch must be an array".into()))?;
    arr.iter().map(from_json).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_draft_path::PathStep;

    #[test]
    fn replace_uses_pointer_paths() {
        let patch = Patch::Replace {
            path: vec!["a/b".into(), 0.into()],
            value: Value::from("new"),
            orig_value: Some(Value::from("old")),
        };
        let v = to_json(&patch).unwrap();
        assert_eq!(v["path"], "/a~1b/0");
        assert_eq!(v["origValue"], "old");
        let back = from_json(&v).unwrap();
        assert_eq!(back.path(), &vec![PathStep::from("a/b"), PathStep::from("0")]);
    }

    #[test]
    fn decode_rfc6902_patch() {
        let patch_json = json!([
            {"op": "add", "path": "/foo", "value": 1},
            {"op": "remove", "path": "/bar"},
            {"op": "replace", "path": "/baz", "value": "new"},
        ]);
        let patches = from_json_patch(&patch_json).unwrap();
        let ops: Vec<_> = patches.iter().map(Patch::op_name).collect();
        assert_eq!(ops, ["add", "remove", "replace"]);
        assert_eq!(to_json_patch(&patches).unwrap(), patch_json);
    }

    #[test]
    fn rejects_unsupported_ops() {
        let err = from_json(&json!({"op": "move", "path": "/a", "from": "/b"})).unwrap_err();
        assert!(matches!(err, PatchError::InvalidOp(_)));
        let err = from_json(&json!({"op": "add", "path": "a", "value": 1})).unwrap_err();
        assert!(matches!(err, PatchError::InvalidOp(_)));
        let err = from_json(&json!({"op": "add", "path": "/a"})).unwrap_err();
        assert!(matches!(err, PatchError::InvalidOp(_)));
    }
}
