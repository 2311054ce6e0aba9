//! Patch generation from finalized drafts.

use json_draft_path::{join, PathStep};

use super::types::Patch;
use crate::draft::Draft;
use crate::value::Value;

/// Patches and their inverses, each in replay order.
#[derive(Debug, Default)]
pub(crate) struct PatchSet {
    pub(crate) patches: Vec<Patch>,
    pub(crate) inverse: Vec<Patch>,
}

impl PatchSet {
    pub(crate) fn into_parts(self) -> (Vec<Patch>, Vec<Patch>) {
        (self.patches, self.inverse)
    }

    /// Records a wholesale replacement of the document.
    pub(crate) fn replace_root(&mut self, base: &Value, result: &Value) {
        self.patches.push(Patch::Replace {
            path: Vec::new(),
            value: result.clone(),
            orig_value: Some(base.clone()),
        });
        self.inverse.push(Patch::Replace {
            path: Vec::new(),
            value: base.clone(),
            orig_value: Some(result.clone()),
        });
    }
}

/// Appends the patches for a finalized draft at `path`. Children still at
/// the key they were drafted from contribute their own, finer patches
/// first.
pub(crate) fn generate_patches(draft: &Draft, path: &[PathStep], set: &mut PatchSet) {
    let home: Vec<(PathStep, Draft)> = {
        let state = draft.0.borrow();
        state
            .children
            .iter()
            .filter(|(key, child)| !state.assigned.contains_key(key) && child.is_modified())
            .cloned()
            .collect()
    };
    for (key, child) in home {
        generate_patches(&child, &join(path, key), set);
    }

    let state = draft.0.borrow();
    let copy = state.source();
    if state.is_array() {
        array_patches(path, &state.base, copy, &state.assigned, set);
    } else {
        object_patches(path, &state.base, copy, &state.assigned, set);
    }
}

fn object_patches(
    path: &[PathStep],
    base: &Value,
    copy: &Value,
    assigned: &indexmap::IndexMap<PathStep, bool>,
    set: &mut PatchSet,
) {
    // Base keys in base order, then added keys in insertion order.
    let added = copy.own_keys().into_iter().filter(|k| !base.contains(k));
    for key in base.own_keys().into_iter().chain(added) {
        let Some(&present) = assigned.get(&key) else {
            continue;
        };
        let orig = base.lookup(&key);
        let value = copy.lookup(&key);
        let at = join(path, key);
        match (present, orig, value) {
            (false, Some(orig), _) => {
                set.patches.push(Patch::Remove {
                    path: at.clone(),
                    orig_value: Some(orig.clone()),
                });
                set.inverse.push(Patch::Add {
                    path: at,
                    value: orig.clone(),
                });
            }
            (true, None, Some(value)) => {
                set.patches.push(Patch::Add {
                    path: at.clone(),
                    value: value.clone(),
                });
                set.inverse.push(Patch::Remove {
                    path: at,
                    orig_value: Some(value.clone()),
                });
            }
            (true, Some(orig), Some(value)) if !orig.is(value) => {
                set.patches.push(Patch::Replace {
                    path: at.clone(),
                    value: value.clone(),
                    orig_value: Some(orig.clone()),
                });
                set.inverse.push(Patch::Replace {
                    path: at,
                    value: orig.clone(),
                    orig_value: Some(value.clone()),
                });
            }
            _ => {}
        }
    }
}

fn array_patches(
    path: &[PathStep],
    base: &Value,
    copy: &Value,
    assigned: &indexmap::IndexMap<PathStep, bool>,
    set: &mut PatchSet,
) {
    let (Value::Array(base), Value::Array(copy)) = (base, copy) else {
        return;
    };
    let shared = base.len().min(copy.len());

    for i in 0..shared {
        if assigned.get(&PathStep::Index(i)) != Some(&true) {
            continue;
        }
        let (orig, value) = (&base.as_slice()[i], &copy.as_slice()[i]);
        if orig.is(value) {
            continue;
        }
        let at = join(path, PathStep::Index(i));
        set.patches.push(Patch::Replace {
            path: at.clone(),
            value: value.clone(),
            orig_value: Some(orig.clone()),
        });
        set.inverse.push(Patch::Replace {
            path: at,
            value: orig.clone(),
            orig_value: Some(value.clone()),
        });
    }

    // Removals run from the end so earlier indices stay valid.
    for i in (shared..base.len()).rev() {
        set.patches.push(Patch::Remove {
            path: join(path, PathStep::Index(i)),
            orig_value: Some(base.as_slice()[i].clone()),
        });
    }
    for (i, orig) in base.iter().enumerate().skip(shared) {
        set.inverse.push(Patch::Add {
            path: join(path, PathStep::Index(i)),
            value: orig.clone(),
        });
    }

    for (i, value) in copy.iter().enumerate().skip(shared) {
        set.patches.push(Patch::Add {
            path: join(path, PathStep::Index(i)),
            value: value.clone(),
        });
    }
    for i in (shared..copy.len()).rev() {
        set.inverse.push(Patch::Remove {
            path: join(path, PathStep::Index(i)),
            orig_value: Some(copy.as_slice()[i].clone()),
        });
    }
}
