//! Turns a draft tree back into plain values.

use std::cell::OnceCell;
use std::collections::HashSet;

use json_draft_path::{format_json_pointer, join, PathStep};
use tracing::trace;

use crate::config::Hooks;
use crate::draft::Draft;
use crate::patch::generate::{generate_patches, PatchSet};
use crate::scope::Scope;
use crate::value::Value;

pub(crate) struct Finalizer<'a> {
    scope: &'a Scope,
    auto_freeze: bool,
    hooks: &'a Hooks,
    /// The value the producer started from. Its nodes belong to the caller
    /// and are never frozen.
    base: &'a Value,
    base_nodes: OnceCell<HashSet<*const ()>>,
}

impl<'a> Finalizer<'a> {
    pub(crate) fn new(scope: &'a Scope, base: &'a Value, auto_freeze: bool, hooks: &'a Hooks) -> Self {
        Self {
            scope,
            auto_freeze,
            hooks,
            base,
            base_nodes: OnceCell::new(),
        }
    }

    /// Whether `value` is a container node of the base tree. The node set is
    /// collected on first use.
    fn is_base_node(&self, value: &Value) -> bool {
        let Some(id) = value.node_id() else {
            return false;
        };
        self.base_nodes
            .get_or_init(|| {
                let mut nodes = HashSet::new();
                let mut stack = vec![self.base];
                while let Some(node) = stack.pop() {
                    let Some(id) = node.node_id() else {
                        continue;
                    };
                    if nodes.insert(id) {
                        stack.extend(node.own_keys().iter().filter_map(|k| node.lookup(k)));
                    }
                }
                nodes
            })
            .contains(&id)
    }

    /// Replaces every draft of this scope reachable from `value` with its
    /// final value. Untouched subtrees are returned as they are.
    pub(crate) fn finalize(
        &self,
        value: &Value,
        path: &[PathStep],
        patches: Option<&mut PatchSet>,
    ) -> Value {
        match value {
            Value::Draft(draft) if self.scope.owns(draft) => {
                self.finalize_draft(draft, path, patches)
            }
            v if v.is_draftable() && !v.is_frozen() && !self.is_base_node(v) => {
                self.finalize_tree(v, path)
            }
            _ => value.clone(),
        }
    }

    fn finalize_draft(
        &self,
        draft: &Draft,
        path: &[PathStep],
        patches: Option<&mut PatchSet>,
    ) -> Value {
        let strategy = {
            let mut state = draft.0.borrow_mut();
            if !state.modified {
                return state.base.clone();
            }
            if state.finalized {
                return state.copy.clone().unwrap_or_else(|| state.base.clone());
            }
            state.finalized = true;
            state.strategy
        };
        strategy.interceptor().materialize(draft);

        let (base, mut copy) = {
            let mut state = draft.0.borrow_mut();
            let copy = match state.copy.take() {
                Some(copy) => copy,
                None => state.base.shallow_copy(),
            };
            (state.base.clone(), copy)
        };
        for key in copy.own_keys() {
            let Some(value) = copy.lookup(&key).cloned() else {
                continue;
            };
            if base.lookup(&key).is_some_and(|b| b.is(&value)) {
                continue;
            }
            let finalized = self.finalize(&value, &join(path, key.clone()), None);
            if !finalized.is(&value) {
                copy.cow_set(&key, finalized);
            }
        }

        let assigned: Vec<(PathStep, Value)> = if self.hooks.has_on_assign() {
            copy.own_keys()
                .into_iter()
                .filter_map(|key| {
                    let value = copy.lookup(&key)?;
                    match base.lookup(&key) {
                        Some(orig) if orig.is(value) => None,
                        _ => Some((key, value.clone())),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };
        let deleted: Vec<PathStep> = base
            .own_keys()
            .into_iter()
            .filter(|key| !copy.contains(key))
            .collect();
        draft.0.borrow_mut().copy = Some(copy.clone());

        for (key, value) in &assigned {
            self.hooks.assign(draft, key, value);
        }
        for key in &deleted {
            self.hooks.delete(draft, key);
        }
        self.hooks.copy(draft);

        if self.auto_freeze {
            copy.freeze();
        }
        if let Some(set) = patches {
            generate_patches(draft, path, set);
        }
        trace!(path = %format_json_pointer(path), "draft finalized");
        copy
    }

    /// Walks a container the recipe built, rebuilding only the nodes below
    /// which a draft was replaced.
    fn finalize_tree(&self, value: &Value, path: &[PathStep]) -> Value {
        let mut out = value.clone();
        for key in value.own_keys() {
            let Some(child) = value.lookup(&key) else {
                continue;
            };
            if !child.is_draft() && (child.is_frozen() || !child.is_draftable()) {
                continue;
            }
            let finalized = self.finalize(child, &join(path, key.clone()), None);
            if !finalized.is(child) {
                out.cow_set(&key, finalized);
            }
        }
        if self.auto_freeze {
            out.freeze();
        }
        out
    }
}
