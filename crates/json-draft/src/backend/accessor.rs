use json_draft_path::PathStep;

use super::{mark_finalizing, trap, Interceptor, Strategy};
use crate::draft::Draft;
use crate::error::DraftError;
use crate::scope::Scope;
use crate::state::{new_draft, slot_value, ParentLink, Slots};
use crate::sweep;
use crate::value::Value;

/// Instruments the keys present at creation; everything else is a plain
/// slot edit that the change sweep picks up before finalize.
pub(crate) struct Accessor;

/// Runs `edit` on the slot view, or returns `None` when the draft has none.
fn with_slots<T>(
    draft: &Draft,
    edit: impl FnOnce(&mut Slots) -> T,
) -> Result<Option<T>, DraftError> {
    let mut state = draft.0.borrow_mut();
    state.check_live()?;
    Ok(state.slots.as_mut().map(edit))
}

impl Interceptor for Accessor {
    fn create(&self, base: Value, parent: Option<ParentLink>, scope: &Scope) -> Draft {
        let slots = Slots::install(&base);
        new_draft(base, parent, scope, Strategy::Accessor, Some(slots))
    }

    fn get(&self, draft: &Draft, key: &PathStep) -> Result<Option<Value>, DraftError> {
        {
            let state = draft.0.borrow();
            state.check_live()?;
            if let Some(slots) = &state.slots {
                if !slots.is_accessor(key) {
                    return Ok(slots.get(key).and_then(|slot| slot_value(state.source(), key, slot)));
                }
            }
        }
        trap::get(draft, key)
    }

    fn peek(&self, draft: &Draft, key: &PathStep) -> Result<Option<Value>, DraftError> {
        let state = draft.0.borrow();
        state.check_live()?;
        Ok(match &state.slots {
            Some(slots) => slots.get(key).and_then(|slot| slot_value(state.source(), key, slot)),
            None => state.source().lookup(key).cloned(),
        })
    }

    fn set(&self, draft: &Draft, key: &PathStep, value: Value) -> Result<(), DraftError> {
        let mut state = draft.0.borrow_mut();
        state.check_writable()?;
        let untracked = state.slots.as_ref().is_some_and(|s| !s.is_accessor(key));
        if untracked {
            let state = &mut *state;
            if let Some(slots) = state.slots.as_mut() {
                let readded = slots.get(key).is_none() && state.base.contains(key);
                slots.put(key, value);
                if readded {
                    slots.restore_base_position(key, &state.base);
                }
            }
            return Ok(());
        }
        drop(state);
        trap::set(draft, key, value)
    }

    fn delete(&self, draft: &Draft, key: &PathStep) -> Result<bool, DraftError> {
        draft.0.borrow().check_writable()?;
        match with_slots(draft, |slots| slots.remove(key))? {
            Some(removed) => Ok(removed),
            None => trap::delete(draft, key),
        }
    }

    fn len(&self, draft: &Draft) -> Result<usize, DraftError> {
        match with_slots(draft, |slots| slots.len())? {
            Some(len) => Ok(len),
            None => Ok(draft.0.borrow().source().container_len()),
        }
    }

    fn keys(&self, draft: &Draft) -> Result<Vec<PathStep>, DraftError> {
        match with_slots(draft, |slots| slots.keys())? {
            Some(keys) => Ok(keys),
            None => Ok(draft.0.borrow().source().own_keys()),
        }
    }

    fn set_len(&self, draft: &Draft, len: usize) -> Result<(), DraftError> {
        draft.0.borrow().check_writable()?;
        match with_slots(draft, |slots| slots.resize(len))? {
            Some(()) => Ok(()),
            None => trap::set_len(draft, len),
        }
    }

    fn will_finalize(&self, scope: &Scope, root: &Draft, result_is_root: bool, need_patches: bool) {
        mark_finalizing(scope);
        if result_is_root && need_patches {
            sweep::mark_changes_recursively(root);
        }
        // Runs for replaced results too; conflict detection reads `modified`.
        sweep::mark_changes_sweep(scope);
    }

    fn materialize(&self, draft: &Draft) {
        let mut state = draft.0.borrow_mut();
        let view = match &state.slots {
            Some(slots) => slots.materialize(state.source()),
            None => return,
        };
        state.copy = Some(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeStack;
    use serde_json::json;

    #[test]
    fn new_keys_bypass_tracking() {
        let stack = ScopeStack::new();
        let scope = stack.open();
        let draft = Accessor.create(Value::from(json!({"a": 1})), None, &scope);
        Accessor.set(&draft, &PathStep::from("b"), Value::from(2)).unwrap();
        assert!(!draft.is_modified());
        assert_eq!(Accessor.get(&draft, &PathStep::from("b")).unwrap(), Some(Value::from(2)));
        assert_eq!(Accessor.len(&draft).unwrap(), 2);
    }

    #[test]
    fn known_keys_are_tracked() {
        let stack = ScopeStack::new();
        let scope = stack.open();
        let draft = Accessor.create(Value::from(json!({"a": 1})), None, &scope);
        Accessor.set(&draft, &PathStep::from("a"), Value::from(2)).unwrap();
        assert!(draft.is_modified());
    }

    #[test]
    fn materialize_writes_the_view_into_copy() {
        let stack = ScopeStack::new();
        let scope = stack.open();
        let draft = Accessor.create(Value::from(json!([1, 2, 3])), None, &scope);
        Accessor.set_len(&draft, 2).unwrap();
        Accessor.set(&draft, &PathStep::Index(2), Value::from(9)).unwrap();
        Accessor.materialize(&draft);
        assert_eq!(draft.0.borrow().copy, Some(Value::from(json!([1, 2, 9]))));
    }

    #[test]
    fn sweep_finds_untracked_edits() {
        let stack = ScopeStack::new();
        let scope = stack.open();
        let draft = Accessor.create(Value::from(json!({"a": 1})), None, &scope);
        Accessor.delete(&draft, &PathStep::from("a")).unwrap();
        assert!(!draft.is_modified());
        Accessor.will_finalize(&scope, &draft, true, false);
        assert!(draft.is_modified());
    }

    #[test]
    fn readded_keys_keep_their_slot_position() {
        let stack = ScopeStack::new();
        let scope = stack.open();
        let draft = Accessor.create(Value::from(json!({"a": 1, "b": 2})), None, &scope);
        Accessor.delete(&draft, &PathStep::from("a")).unwrap();
        Accessor.set(&draft, &PathStep::from("a"), Value::from(1)).unwrap();
        assert_eq!(
            Accessor.keys(&draft).unwrap(),
            vec![PathStep::from("a"), PathStep::from("b")]
        );
    }
}
