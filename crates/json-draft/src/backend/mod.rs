//! Interception strategies.
//!
//! Both strategies track the same things and produce the same results. The
//! trap strategy sees every read and write. The accessor strategy only
//! instruments keys that existed when its draft was created, so writes to
//! anything else are found later by the change sweep.

mod accessor;
mod trap;

use json_draft_path::PathStep;
use serde::{Deserialize, Serialize};

use crate::draft::Draft;
use crate::error::DraftError;
use crate::scope::Scope;
use crate::state::ParentLink;
use crate::value::Value;

pub(crate) use accessor::Accessor;
pub(crate) use trap::Trap;

/// Which interception strategy a producer drafts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Trap,
    Accessor,
}

impl Strategy {
    /// Maps the `use_proxies` flag: `true` selects [`Strategy::Trap`].
    pub fn from_use_proxies(use_proxies: bool) -> Self {
        if use_proxies {
            Strategy::Trap
        } else {
            Strategy::Accessor
        }
    }

    pub fn uses_proxies(self) -> bool {
        self == Strategy::Trap
    }

    pub(crate) fn interceptor(self) -> &'static dyn Interceptor {
        match self {
            Strategy::Trap => &Trap,
            Strategy::Accessor => &Accessor,
        }
    }
}

/// Operations every strategy implements. Keys arrive normalized: indices for
/// arrays, string keys for objects.
pub(crate) trait Interceptor {
    fn create(&self, base: Value, parent: Option<ParentLink>, scope: &Scope) -> Draft;

    fn get(&self, draft: &Draft, key: &PathStep) -> Result<Option<Value>, DraftError>;

    /// Like `get`, without drafting the value.
    fn peek(&self, draft: &Draft, key: &PathStep) -> Result<Option<Value>, DraftError>;

    fn set(&self, draft: &Draft, key: &PathStep, value: Value) -> Result<(), DraftError>;

    fn delete(&self, draft: &Draft, key: &PathStep) -> Result<bool, DraftError>;

    fn len(&self, draft: &Draft) -> Result<usize, DraftError>;

    fn keys(&self, draft: &Draft) -> Result<Vec<PathStep>, DraftError>;

    fn set_len(&self, draft: &Draft, len: usize) -> Result<(), DraftError>;

    /// Runs once after the recipe returns and before anything is finalized.
    fn will_finalize(&self, scope: &Scope, root: &Draft, result_is_root: bool, need_patches: bool);

    /// Brings `copy` up to date with what reads currently see.
    fn materialize(&self, draft: &Draft);
}

/// Locks every draft of `scope` against further writes.
fn mark_finalizing(scope: &Scope) {
    for draft in scope.drafts() {
        draft.0.borrow_mut().finalizing = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_proxies_maps_to_strategy() {
        assert_eq!(Strategy::from_use_proxies(true), Strategy::Trap);
        assert_eq!(Strategy::from_use_proxies(false), Strategy::Accessor);
        assert!(!Strategy::Accessor.uses_proxies());
        assert_eq!(Strategy::default(), Strategy::Trap);
    }

    #[test]
    fn strategy_names_on_the_wire() {
        assert_eq!(serde_json::to_string(&Strategy::Accessor).unwrap(), "\"accessor\"");
        let s: Strategy = serde_json::from_str("\"trap\"").unwrap();
        assert_eq!(s, Strategy::Trap);
    }
}
