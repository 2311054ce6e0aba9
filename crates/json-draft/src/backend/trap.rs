use json_draft_path::PathStep;

use super::{mark_finalizing, Interceptor, Strategy};
use crate::draft::Draft;
use crate::error::DraftError;
use crate::scope::Scope;
use crate::state::{mark_changed, new_draft, spawn_child, ParentLink};
use crate::value::Value;

/// Intercepts every read and write.
pub(crate) struct Trap;

/// Tracked read. An untouched draftable member is wrapped in a child draft
/// the first time it is read.
pub(super) fn get(draft: &Draft, key: &PathStep) -> Result<Option<Value>, DraftError> {
    let mut state = draft.0.borrow_mut();
    state.check_live()?;
    let Some(value) = state.source().lookup(key).cloned() else {
        return Ok(None);
    };
    let pristine = state.base.lookup(key).is_some_and(|b| b.is(&value));
    if !state.finalizing && pristine && value.is_draftable() {
        let child = spawn_child(&mut state, draft, key, value)?;
        return Ok(Some(Value::Draft(child)));
    }
    Ok(Some(value))
}

/// Tracked write. Writing the current value is not a modification; a removed
/// base key written again goes back to its base position.
pub(super) fn set(draft: &Draft, key: &PathStep, value: Value) -> Result<(), DraftError> {
    let mut state = draft.0.borrow_mut();
    state.check_writable()?;
    state.assigned.insert(key.clone(), true);
    if !state.modified {
        if state.source().lookup(key).is_some_and(|current| current.is(&value)) {
            return Ok(());
        }
        drop(state);
        mark_changed(&draft.0);
        state = draft.0.borrow_mut();
    }
    let readded = !state.source().contains(key) && state.base.contains(key);
    state.copy_mut().cow_set(key, value);
    if readded {
        let state = &mut *state;
        if let Some(copy) = state.copy.as_mut() {
            copy.cow_restore_position(key, &state.base);
        }
    }
    Ok(())
}

pub(super) fn delete(draft: &Draft, key: &PathStep) -> Result<bool, DraftError> {
    let mut state = draft.0.borrow_mut();
    state.check_writable()?;
    if !state.source().contains(key) {
        return Ok(false);
    }
    if state.base.contains(key) {
        state.assigned.insert(key.clone(), false);
    } else {
        state.assigned.shift_remove(key);
    }
    drop(state);
    mark_changed(&draft.0);
    draft.0.borrow_mut().copy_mut().cow_remove(key);
    Ok(true)
}

pub(super) fn set_len(draft: &Draft, len: usize) -> Result<(), DraftError> {
    let mut state = draft.0.borrow_mut();
    state.check_writable()?;
    let current = state.source().container_len();
    if len == current {
        return Ok(());
    }
    let base_len = state.base.container_len();
    for i in len..current {
        if i < base_len {
            state.assigned.insert(PathStep::Index(i), false);
        } else {
            state.assigned.shift_remove(&PathStep::Index(i));
        }
    }
    for i in current..len {
        state.assigned.insert(PathStep::Index(i), true);
    }
    drop(state);
    mark_changed(&draft.0);
    draft.0.borrow_mut().copy_mut().cow_resize(len);
    Ok(())
}

impl Interceptor for Trap {
    fn create(&self, base: Value, parent: Option<ParentLink>, scope: &Scope) -> Draft {
        new_draft(base, parent, scope, Strategy::Trap, None)
    }

    fn get(&self, draft: &Draft, key: &PathStep) -> Result<Option<Value>, DraftError> {
        get(draft, key)
    }

    fn peek(&self, draft: &Draft, key: &PathStep) -> Result<Option<Value>, DraftError> {
        let state = draft.0.borrow();
        state.check_live()?;
        Ok(state.source().lookup(key).cloned())
    }

    fn set(&self, draft: &Draft, key: &PathStep, value: Value) -> Result<(), DraftError> {
        set(draft, key, value)
    }

    fn delete(&self, draft: &Draft, key: &PathStep) -> Result<bool, DraftError> {
        delete(draft, key)
    }

    fn len(&self, draft: &Draft) -> Result<usize, DraftError> {
        let state = draft.0.borrow();
        state.check_live()?;
        Ok(state.source().container_len())
    }

    fn keys(&self, draft: &Draft) -> Result<Vec<PathStep>, DraftError> {
        let state = draft.0.borrow();
        state.check_live()?;
        Ok(state.source().own_keys())
    }

    fn set_len(&self, draft: &Draft, len: usize) -> Result<(), DraftError> {
        set_len(draft, len)
    }

    fn will_finalize(&self, scope: &Scope, _root: &Draft, _result_is_root: bool, _need_patches: bool) {
        mark_finalizing(scope);
    }

    fn materialize(&self, _draft: &Draft) {}
}
