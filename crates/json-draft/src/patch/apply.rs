//! Patch replay onto a draft.
//!
//! Semantics follow RFC 6902: `add` on an object inserts or overwrites, on
//! an array inserts at `index <= len` (`-` appends); `replace` and `remove`
//! need the target to exist.

use json_draft_path::PathStep;

use super::types::{Patch, PatchError};
use crate::draft::Draft;
use crate::value::Value;

/// Applies one patch below `root`. Whole-document patches (empty path) are
/// handled by the caller.
pub(crate) fn apply_patch(root: &Draft, patch: &Patch) -> Result<(), PatchError> {
    let path = patch.path();
    let Some((last, parents)) = path.split_last() else {
        return Err(PatchError::InvalidTarget);
    };
    let mut target = root.clone();
    for (depth, step) in parents.iter().enumerate() {
        match target.get(step)? {
            Some(Value::Draft(child)) => target = child,
            // A container written earlier in this call is not drafted; update
            // it as a plain value and write it back.
            Some(plain) if plain.is_draftable() => {
                let updated = apply_plain(&plain, &path[depth + 1..], patch)?;
                target.set(step, updated)?;
                return Ok(());
            }
            Some(_) => return Err(PatchError::InvalidTarget),
            None => return Err(PatchError::NotFound),
        }
    }
    apply_to_draft(&target, last, patch)
}

fn array_index(step: &PathStep, len: usize, append: bool) -> Result<usize, PatchError> {
    if append && step.is_array_end() {
        return Ok(len);
    }
    step.as_index().ok_or(PatchError::InvalidIndex)
}

fn apply_to_draft(draft: &Draft, key: &PathStep, patch: &Patch) -> Result<(), PatchError> {
    if draft.is_array() {
        let len = draft.len()?;
        match patch {
            Patch::Add { value, .. } => {
                let index = array_index(key, len, true)?;
                if index > len {
                    return Err(PatchError::InvalidIndex);
                }
                draft.insert(index, value.clone())?;
            }
            Patch::Replace { value, .. } => {
                let index = array_index(key, len, false)?;
                if index >= len {
                    return Err(PatchError::NotFound);
                }
                draft.set(index, value.clone())?;
            }
            Patch::Remove { .. } => {
                let index = array_index(key, len, false)?;
                if index >= len {
                    return Err(PatchError::NotFound);
                }
                draft.remove(index)?;
            }
        }
        return Ok(());
    }
    match patch {
        Patch::Add { value, .. } => draft.set(key, value.clone())?,
        Patch::Replace { value, .. } => {
            if !draft.contains_key(key)? {
                return Err(PatchError::NotFound);
            }
            draft.set(key, value.clone())?;
        }
        Patch::Remove { .. } => {
            if !draft.delete(key)? {
                return Err(PatchError::NotFound);
            }
        }
    }
    Ok(())
}

/// Applies `patch` at `path` relative to `doc`, copying only the nodes on
/// the way down.
fn apply_plain(doc: &Value, path: &[PathStep], patch: &Patch) -> Result<Value, PatchError> {
    let Some((step, rest)) = path.split_first() else {
        return Err(PatchError::InvalidTarget);
    };
    let mut out = doc.clone();
    if rest.is_empty() {
        apply_in_place(&mut out, step, patch)?;
        return Ok(out);
    }
    let child = doc.lookup(step).ok_or(PatchError::NotFound)?;
    if !child.is_draftable() {
        return Err(PatchError::InvalidTarget);
    }
    let updated = apply_plain(child, rest, patch)?;
    out.cow_set(step, updated);
    Ok(out)
}

fn apply_in_place(container: &mut Value, step: &PathStep, patch: &Patch) -> Result<(), PatchError> {
    match container {
        Value::Object(obj) => {
            let key = step.to_key();
            let present = obj.contains_key(&key);
            let map = obj.make_mut();
            match patch {
                Patch::Add { value, .. } => {
                    map.insert(key, value.clone());
                }
                Patch::Replace { value, .. } => {
                    if !present {
                        return Err(PatchError::NotFound);
                    }
                    map.insert(key, value.clone());
                }
                Patch::Remove { .. } => {
                    map.shift_remove(&key).ok_or(PatchError::NotFound)?;
                }
            }
            Ok(())
        }
        Value::Array(arr) => {
            let len = arr.len();
            let index = array_index(step, len, matches!(patch, Patch::Add { .. }))?;
            match patch {
                Patch::Add { value, .. } => {
                    if index > len {
                        return Err(PatchError::InvalidIndex);
                    }
                    arr.make_mut().insert(index, value.clone());
                }
                Patch::Replace { value, .. } => {
                    if index >= len {
                        return Err(PatchError::NotFound);
                    }
                    arr.make_mut()[index] = value.clone();
                }
                Patch::Remove { .. } => {
                    if index >= len {
                        return Err(PatchError::NotFound);
                    }
                    arr.make_mut().remove(index);
                }
            }
            Ok(())
        }
        _ => Err(PatchError::InvalidTarget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(json: serde_json::Value) -> Patch {
        serde_json::from_value(json).unwrap()
    }

    fn plain(doc: serde_json::Value, p: serde_json::Value) -> Result<Value, PatchError> {
        let p = patch(p);
        apply_plain(&Value::from(doc), p.path(), &p)
    }

    #[test]
    fn add_to_object() {
        let out = plain(json!({"a": 1}), json!({"op": "add", "path": ["b"], "value": 2})).unwrap();
        assert_eq!(out, Value::from(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn add_to_array() {
        let out = plain(json!([1, 3]), json!({"op": "add", "path": [1], "value": 2})).unwrap();
        assert_eq!(out, Value::from(json!([1, 2, 3])));
        let out = plain(json!([1]), json!({"op": "add", "path": ["-"], "value": 2})).unwrap();
        assert_eq!(out, Value::from(json!([1, 2])));
    }

    #[test]
    fn add_past_the_end_is_invalid() {
        let err = plain(json!([1]), json!({"op": "add", "path": [5], "value": 2})).unwrap_err();
        assert_eq!(err, PatchError::InvalidIndex);
    }

    #[test]
    fn replace_and_remove_need_a_target() {
        let err = plain(json!({}), json!({"op": "replace", "path": ["a"], "value": 1})).unwrap_err();
        assert_eq!(err, PatchError::NotFound);
        let err = plain(json!([]), json!({"op": "remove", "path": [0]})).unwrap_err();
        assert_eq!(err, PatchError::NotFound);
        let err = plain(json!({"a": 1}), json!({"op": "remove", "path": ["a", "b"]})).unwrap_err();
        assert_eq!(err, PatchError::InvalidTarget);
    }

    #[test]
    fn nested_plain_update_copies_the_spine() {
        let doc = Value::from(json!({"a": {"b": [1]}, "c": {}}));
        let p = patch(json!({"op": "replace", "path": ["a", "b", 0], "value": 9}));
        let out = apply_plain(&doc, p.path(), &p).unwrap();
        assert_eq!(out, Value::from(json!({"a": {"b": [9]}, "c": {}})));
        assert!(out.get("c").unwrap().is(doc.get("c").unwrap()));
        assert_eq!(doc, Value::from(json!({"a": {"b": [1]}, "c": {}})));
    }
}
