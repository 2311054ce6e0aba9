//! Change detection for accessor-strategy drafts.
//!
//! Plain slot edits (new keys, deletions, array resizes) are not intercepted,
//! so before finalizing every draft is compared with its base.

use json_draft_path::PathStep;

use crate::draft::Draft;
use crate::scope::Scope;
use crate::state::{mark_changed, slot_value, Slot, Slots};
use crate::value::Value;

/// Marks every draft of `scope` whose slot view differs from its base.
/// Drafts are visited newest first, so children are settled before their
/// parents.
pub(crate) fn mark_changes_sweep(scope: &Scope) {
    for draft in scope.drafts().iter().rev() {
        let changed = {
            let state = draft.0.borrow();
            !state.modified
                && match &state.slots {
                    Some(slots) => has_changes(&state.base, slots),
                    None => false,
                }
        };
        if changed {
            mark_changed(&draft.0);
        }
    }
}

fn has_changes(base: &Value, slots: &Slots) -> bool {
    match slots {
        Slots::Object(map) => {
            // A key that is new or was overwritten without its accessor.
            let replaced = map.iter().rev().any(|(key, slot)| {
                matches!(slot, Slot::Plain(_)) || !base.contains(&PathStep::Key(key.clone()))
            });
            replaced || map.len() != base.container_len()
        }
        Slots::Array(items) => {
            // Plain slots only ever sit at the tail, so a plain last slot
            // means the array was shrunk and regrown.
            items.len() != base.container_len() || matches!(items.last(), Some(Slot::Plain(_)))
        }
    }
}

/// Fills in `assigned` for the draft tree under `root` from the slot views,
/// so that patches can be generated for untracked edits.
pub(crate) fn mark_changes_recursively(root: &Draft) {
    let mut pending = vec![root.clone()];
    while let Some(draft) = pending.pop() {
        let (changed, untouched) = mark_one(&draft);
        if changed {
            mark_changed(&draft.0);
        }
        pending.extend(untouched.into_iter().filter_map(|v| match v {
            Value::Draft(d) => Some(d),
            _ => None,
        }));
    }
}

/// Marks the keys of one draft and returns whether any were marked, along
/// with the values of keys left untouched.
fn mark_one(draft: &Draft) -> (bool, Vec<Value>) {
    let mut guard = draft.0.borrow_mut();
    let state = &mut *guard;
    let Some(slots) = &state.slots else {
        return (false, Vec::new());
    };
    let mut marks = Vec::new();
    match slots {
        Slots::Object(map) => {
            for (key, slot) in map {
                let step = PathStep::Key(key.clone());
                if matches!(slot, Slot::Plain(_)) || !state.base.contains(&step) {
                    marks.push((step, true));
                }
            }
            for step in state.base.own_keys() {
                if !map.contains_key(&step.to_key()) {
                    marks.push((step, false));
                }
            }
        }
        Slots::Array(items) => {
            let base_len = state.base.container_len();
            for i in items.len()..base_len {
                marks.push((PathStep::Index(i), false));
            }
            for (i, slot) in items.iter().enumerate() {
                if i >= base_len || matches!(slot, Slot::Plain(_)) {
                    marks.push((PathStep::Index(i), true));
                }
            }
        }
    }
    let changed = !marks.is_empty();
    for (step, flag) in marks {
        state.assigned.insert(step, flag);
    }
    let untouched = slots
        .keys()
        .into_iter()
        .filter(|step| !state.assigned.contains_key(step))
        .filter_map(|step| {
            let slot = slots.get(&step)?;
            slot_value(state.source(), &step, slot)
        })
        .collect();
    (changed, untouched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Strategy;
    use crate::scope::ScopeStack;
    use serde_json::json;

    fn accessor_draft(stack: &ScopeStack, base: serde_json::Value) -> (Scope, Draft) {
        let scope = stack.open();
        let draft = Strategy::Accessor
            .interceptor()
            .create(Value::from(base), None, &scope);
        (scope, draft)
    }

    #[test]
    fn added_key_is_a_change() {
        let base = Value::from(json!({"a": 1}));
        let mut slots = Slots::install(&base);
        assert!(!has_changes(&base, &slots));
        slots.put(&PathStep::from("b"), Value::Null);
        assert!(has_changes(&base, &slots));
    }

    #[test]
    fn swapped_key_keeps_count() {
        let base = Value::from(json!({"a": 1, "b": 2}));
        let mut slots = Slots::install(&base);
        slots.remove(&PathStep::from("a"));
        slots.put(&PathStep::from("c"), Value::Null);
        assert!(has_changes(&base, &slots));
    }

    #[test]
    fn regrown_array_is_a_change() {
        let base = Value::from(json!([1, 2]));
        let mut slots = Slots::install(&base);
        slots.resize(1);
        slots.put(&PathStep::Index(1), Value::from(2));
        assert!(has_changes(&base, &slots));
    }

    #[test]
    fn sweep_propagates_to_parents() {
        let stack = ScopeStack::new();
        let (scope, root) = accessor_draft(&stack, json!({"n": {"x": 1}}));
        let n = root.child("n").unwrap();
        n.set("y", 2).unwrap();
        assert!(!root.is_modified());
        mark_changes_sweep(&scope);
        assert!(n.is_modified());
        assert!(root.is_modified());
    }

    #[test]
    fn recursive_marking_fills_assigned() {
        let stack = ScopeStack::new();
        let (_scope, root) = accessor_draft(&stack, json!({"a": 1, "list": [1, 2, 3]}));
        let list = root.child("list").unwrap();
        list.truncate(1).unwrap();
        list.push(5).unwrap();
        root.delete("a").unwrap();
        mark_changes_recursively(&root);

        let root_state = root.0.borrow();
        assert_eq!(root_state.assigned.get(&PathStep::from("a")), Some(&false));
        assert_eq!(root_state.assigned.get(&PathStep::from("list")), None);
        drop(root_state);

        let state = list.0.borrow();
        assert_eq!(state.assigned.get(&PathStep::Index(1)), Some(&true));
        assert_eq!(state.assigned.get(&PathStep::Index(2)), Some(&false));
        assert_eq!(state.assigned.get(&PathStep::Index(0)), None);
        assert!(state.modified);
    }
}
