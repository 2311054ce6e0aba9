//! Bookkeeping behind every draft.
//!
//! One [`DraftState`] exists per drafted node. States are created lazily, the
//! first time a draftable value is read through its parent draft, and are
//! revoked when the scope that owns them closes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use json_draft_path::{format_json_pointer, join, Path, PathStep};

use crate::backend::Strategy;
use crate::draft::Draft;
use crate::error::DraftError;
use crate::scope::{Scope, ScopeInner};
use crate::value::{restore_base_position, Value};

pub(crate) type StateCell = RefCell<DraftState>;

/// What one key of an accessor-strategy draft holds.
#[derive(Clone, Debug)]
pub(crate) enum Slot {
    /// Installed at creation; reads and writes take the tracked path.
    Accessor,
    /// Written where no accessor existed. Invisible to change tracking.
    Plain(Value),
}

/// The accessor strategy's own view of a draft.
#[derive(Clone, Debug)]
pub(crate) enum Slots {
    Object(IndexMap<String, Slot>),
    Array(Vec<Slot>),
}

impl Slots {
    /// One accessor per own key of `base`.
    pub(crate) fn install(base: &Value) -> Slots {
        match base {
            Value::Array(a) => Slots::Array(vec![Slot::Accessor; a.len()]),
            other => Slots::Object(
                other
                    .own_keys()
                    .into_iter()
                    .map(|k| (k.to_key(), Slot::Accessor))
                    .collect(),
            ),
        }
    }

    pub(crate) fn get(&self, step: &PathStep) -> Option<&Slot> {
        match self {
            Slots::Object(map) => map.get(&step.to_key()),
            Slots::Array(items) => step.as_index().and_then(|i| items.get(i)),
        }
    }

    pub(crate) fn is_accessor(&self, step: &PathStep) -> bool {
        matches!(self.get(step), Some(Slot::Accessor))
    }

    /// Stores a plain value, growing an array with `Null` past its end.
    pub(crate) fn put(&mut self, step: &PathStep, value: Value) {
        match self {
            Slots::Object(map) => {
                map.insert(step.to_key(), Slot::Plain(value));
            }
            Slots::Array(items) => {
                let Some(index) = step.as_index() else {
                    return;
                };
                if index < items.len() {
                    items[index] = Slot::Plain(value);
                } else {
                    items.resize(index, Slot::Plain(Value::Null));
                    items.push(Slot::Plain(value));
                }
            }
        }
    }

    /// Moves a re-added object key back to its place in `base`.
    pub(crate) fn restore_base_position(&mut self, step: &PathStep, base: &Value) {
        if let Slots::Object(map) = self {
            restore_base_position(map, &step.to_key(), base);
        }
    }

    pub(crate) fn remove(&mut self, step: &PathStep) -> bool {
        match self {
            Slots::Object(map) => map.shift_remove(&step.to_key()).is_some(),
            Slots::Array(items) => match step.as_index() {
                Some(i) if i < items.len() => {
                    items.remove(i);
                    true
                }
                _ => false,
            },
        }
    }

    pub(crate) fn resize(&mut self, len: usize) {
        if let Slots::Array(items) = self {
            items.resize(len, Slot::Plain(Value::Null));
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Slots::Object(map) => map.len(),
            Slots::Array(items) => items.len(),
        }
    }

    pub(crate) fn keys(&self) -> Vec<PathStep> {
        match self {
            Slots::Object(map) => map.keys().map(PathStep::from).collect(),
            Slots::Array(items) => (0..items.len()).map(PathStep::Index).collect(),
        }
    }

    /// Reads every slot into a fresh container; accessors read `source`.
    pub(crate) fn materialize(&self, source: &Value) -> Value {
        match self {
            Slots::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, slot)| {
                        let step = PathStep::Key(k.clone());
                        (k.clone(), slot_value(source, &step, slot).unwrap_or_default())
                    })
                    .collect(),
            ),
            Slots::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, slot)| {
                        slot_value(source, &PathStep::Index(i), slot).unwrap_or_default()
                    })
                    .collect(),
            ),
        }
    }
}

pub(crate) fn slot_value(source: &Value, step: &PathStep, slot: &Slot) -> Option<Value> {
    match slot {
        Slot::Accessor => source.lookup(step).cloned(),
        Slot::Plain(v) => Some(v.clone()),
    }
}

/// Where a child draft hangs off its parent.
pub(crate) struct ParentLink {
    pub(crate) state: Weak<StateCell>,
    pub(crate) path: Path,
}

pub(crate) struct DraftState {
    pub(crate) base: Value,
    /// Shallow clone of `base`, created on first write or when a nested
    /// draft needs a place to live.
    pub(crate) copy: Option<Value>,
    pub(crate) slots: Option<Slots>,
    pub(crate) modified: bool,
    pub(crate) finalizing: bool,
    pub(crate) finalized: bool,
    pub(crate) revoked: bool,
    /// `true`: written, `false`: removed, absent: untouched.
    pub(crate) assigned: IndexMap<PathStep, bool>,
    pub(crate) parent: Option<Weak<StateCell>>,
    /// Drafts created for keys of this node, with the key they were created at.
    pub(crate) children: Vec<(PathStep, Draft)>,
    pub(crate) path: Path,
    pub(crate) scope: Weak<ScopeInner>,
    pub(crate) strategy: Strategy,
}

impl DraftState {
    fn new(
        base: Value,
        parent: Option<ParentLink>,
        scope: &Scope,
        strategy: Strategy,
        slots: Option<Slots>,
    ) -> Self {
        let (parent, path) = match parent {
            Some(link) => (Some(link.state), link.path),
            None => (None, Vec::new()),
        };
        Self {
            base,
            copy: None,
            slots,
            modified: false,
            finalizing: false,
            finalized: false,
            revoked: false,
            assigned: IndexMap::new(),
            parent,
            children: Vec::new(),
            path,
            scope: scope.downgrade(),
            strategy,
        }
    }

    /// The value reads currently see.
    pub(crate) fn source(&self) -> &Value {
        self.copy.as_ref().unwrap_or(&self.base)
    }

    pub(crate) fn copy_mut(&mut self) -> &mut Value {
        let base = &self.base;
        self.copy.get_or_insert_with(|| base.shallow_copy())
    }

    pub(crate) fn is_array(&self) -> bool {
        self.base.is_array()
    }

    pub(crate) fn check_live(&self) -> Result<(), DraftError> {
        if self.revoked {
            return Err(DraftError::RevokedAccess {
                path: format_json_pointer(&self.path),
            });
        }
        Ok(())
    }

    pub(crate) fn check_writable(&self) -> Result<(), DraftError> {
        self.check_live()?;
        if self.finalizing {
            return Err(DraftError::Finalizing);
        }
        Ok(())
    }

    fn scope(&self) -> Result<Scope, DraftError> {
        Scope::upgrade(&self.scope).ok_or_else(|| DraftError::RevokedAccess {
            path: format_json_pointer(&self.path),
        })
    }
}

/// Builds a draft over `base` and registers it with `scope`.
pub(crate) fn new_draft(
    base: Value,
    parent: Option<ParentLink>,
    scope: &Scope,
    strategy: Strategy,
    slots: Option<Slots>,
) -> Draft {
    let draft = Draft::from_state(DraftState::new(base, parent, scope, strategy, slots));
    scope.register(draft.clone());
    draft
}

/// Drafts `base`, the current value of `key` in `state`, and caches the new
/// draft in the copy.
pub(crate) fn spawn_child(
    state: &mut DraftState,
    owner: &Draft,
    key: &PathStep,
    base: Value,
) -> Result<Draft, DraftError> {
    let scope = state.scope()?;
    let link = ParentLink {
        state: Rc::downgrade(&owner.0),
        path: join(&state.path, key.clone()),
    };
    let child = state.strategy.interceptor().create(base, Some(link), &scope);
    state.copy_mut().cow_set(key, Value::Draft(child.clone()));
    state.children.push((key.clone(), child.clone()));
    Ok(child)
}

/// Marks `state` and every ancestor modified, stopping at the first one
/// already marked.
pub(crate) fn mark_changed(state: &Rc<StateCell>) {
    let mut current = Some(Rc::clone(state));
    while let Some(cell) = current {
        let mut s = cell.borrow_mut();
        if s.modified {
            break;
        }
        s.modified = true;
        current = s.parent.as_ref().and_then(Weak::upgrade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slots_cover_base_keys() {
        let slots = Slots::install(&Value::from(json!({"a": 1, "b": 2})));
        assert_eq!(slots.keys(), vec![PathStep::from("a"), PathStep::from("b")]);
        assert!(slots.is_accessor(&PathStep::from("a")));
        assert!(!slots.is_accessor(&PathStep::from("c")));
    }

    #[test]
    fn plain_array_writes_replace_accessors() {
        let base = Value::from(json!([1, 2, 3]));
        let mut slots = Slots::install(&base);
        slots.resize(1);
        slots.put(&PathStep::Index(2), Value::from(9));
        assert_eq!(slots.len(), 3);
        assert!(slots.is_accessor(&PathStep::Index(0)));
        assert!(!slots.is_accessor(&PathStep::Index(1)));
        assert_eq!(slots.materialize(&base), Value::from(json!([1, null, 9])));
    }

    #[test]
    fn materialize_reads_accessors_from_source() {
        let source = Value::from(json!({"a": 1, "b": 2}));
        let mut slots = Slots::install(&source);
        slots.remove(&PathStep::from("a"));
        slots.put(&PathStep::from("c"), Value::from(3));
        assert_eq!(slots.materialize(&source), Value::from(json!({"b": 2, "c": 3})));
    }
}
