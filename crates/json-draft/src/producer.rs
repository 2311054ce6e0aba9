//! The producer: runs a recipe against a draft and returns the next value.

use tracing::debug;

use crate::config::{Hooks, ProducerConfig};
use crate::error::DraftError;
use crate::finalize::Finalizer;
use crate::patch::apply::apply_patch;
use crate::patch::generate::PatchSet;
use crate::patch::{Patch, PatchError};
use crate::scope::ScopeStack;
use crate::value::Value;

/// Produces new values from old ones through drafts.
///
/// A recipe receives a draft of the base (as [`Value::Draft`]) and either
/// mutates it and returns `Ok(None)`, or returns a replacement value. The
/// base is never changed; the result shares every subtree the recipe did not
/// touch. All drafts created during a call are revoked when it returns.
#[derive(Debug, Default)]
pub struct Producer {
    config: ProducerConfig,
    hooks: Hooks,
    scopes: ScopeStack,
}

impl Producer {
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config,
            hooks: Hooks::default(),
            scopes: ScopeStack::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn set_auto_freeze(&mut self, auto_freeze: bool) {
        self.config.auto_freeze = auto_freeze;
    }

    /// `true` drafts with the trap strategy, `false` with the accessor
    /// strategy.
    pub fn set_use_proxies(&mut self, use_proxies: bool) {
        self.config = self.config.with_use_proxies(use_proxies);
    }

    /// Number of producer calls currently running on this producer.
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Runs `recipe` and returns the next value.
    ///
    /// # Errors
    ///
    /// Whatever `recipe` returns, and [`DraftError::ConflictingResult`] if it
    /// both modified its draft and returned a replacement.
    pub fn produce<E, F>(&self, base: &Value, recipe: F) -> Result<Value, E>
    where
        F: FnOnce(&Value) -> Result<Option<Value>, E>,
        E: From<DraftError>,
    {
        self.run(base, recipe, None)
    }

    /// Like [`Producer::produce`], also returning the patches that turn
    /// `base` into the result and the inverse patches that turn it back.
    pub fn produce_with_patches<E, F>(
        &self,
        base: &Value,
        recipe: F,
    ) -> Result<(Value, Vec<Patch>, Vec<Patch>), E>
    where
        F: FnOnce(&Value) -> Result<Option<Value>, E>,
        E: From<DraftError>,
    {
        let mut set = PatchSet::default();
        let result = self.run(base, recipe, Some(&mut set))?;
        let (patches, inverse) = set.into_parts();
        Ok((result, patches, inverse))
    }

    /// Like [`Producer::produce_with_patches`], handing the patches to
    /// `listener` once the call has finished.
    pub fn produce_with_listener<E, F, L>(
        &self,
        base: &Value,
        recipe: F,
        listener: L,
    ) -> Result<Value, E>
    where
        F: FnOnce(&Value) -> Result<Option<Value>, E>,
        E: From<DraftError>,
        L: FnOnce(Vec<Patch>, Vec<Patch>),
    {
        let (result, patches, inverse) = self.produce_with_patches(base, recipe)?;
        listener(patches, inverse);
        Ok(result)
    }

    /// Binds `recipe` into a reusable function of the base.
    pub fn curry<'a, E, F>(&'a self, recipe: F) -> impl Fn(&Value) -> Result<Value, E> + 'a
    where
        F: Fn(&Value) -> Result<Option<Value>, E> + 'a,
        E: From<DraftError> + 'a,
    {
        move |base: &Value| self.produce(base, &recipe)
    }

    /// Like [`Producer::curry`]; a missing base falls back to `default`.
    pub fn curry_with_default<'a, E, F>(
        &'a self,
        default: Value,
        recipe: F,
    ) -> impl Fn(Option<&Value>) -> Result<Value, E> + 'a
    where
        F: Fn(&Value) -> Result<Option<Value>, E> + 'a,
        E: From<DraftError> + 'a,
    {
        move |base: Option<&Value>| self.produce(base.unwrap_or(&default), &recipe)
    }

    /// Replays `patches` on `base` through a producer call, so untouched
    /// substructure is shared with `base`.
    ///
    /// Replay starts from the last whole-document `add` or `replace`, if
    /// there is one.
    pub fn apply_patches(&self, base: &Value, patches: &[Patch]) -> Result<Value, PatchError> {
        let swap = patches
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, patch)| match patch {
                Patch::Add { path, value } | Patch::Replace { path, value, .. }
                    if path.is_empty() =>
                {
                    Some((i, value))
                }
                _ => None,
            });
        let (start, rest) = match swap {
            Some((i, value)) => (value.clone(), &patches[i + 1..]),
            None => (base.clone(), patches),
        };
        if rest.is_empty() {
            return Ok(start);
        }
        debug!(patches = rest.len(), "applying patches");
        self.produce(&start, |doc| {
            let root = doc.as_draft().ok_or(PatchError::InvalidTarget)?;
            for patch in rest {
                apply_patch(root, patch)?;
            }
            Ok(None)
        })
    }

    fn run<E, F>(
        &self,
        base: &Value,
        recipe: F,
        patches: Option<&mut PatchSet>,
    ) -> Result<Value, E>
    where
        F: FnOnce(&Value) -> Result<Option<Value>, E>,
        E: From<DraftError>,
    {
        if !base.is_draftable() {
            return Ok(recipe(base)?.unwrap_or_else(|| base.clone()));
        }

        let strategy = self.config.strategy;
        let interceptor = strategy.interceptor();
        let guard = self.scopes.enter();
        let scope = guard.scope().clone();
        let root = interceptor.create(base.clone(), None, &scope);
        debug!(?strategy, depth = self.scopes.depth(), "producing");

        let returned = recipe(&Value::Draft(root.clone()))?;
        let replacement = match returned {
            Some(Value::Draft(d)) if d.ptr_eq(&root) => None,
            other => other,
        };
        interceptor.will_finalize(&scope, &root, replacement.is_none(), patches.is_some());

        let finalizer = Finalizer::new(&scope, base, self.config.auto_freeze, &self.hooks);
        let result = match replacement {
            None => finalizer.finalize(&Value::Draft(root), &[], patches),
            Some(replacement) => {
                if root.is_modified() {
                    return Err(DraftError::ConflictingResult.into());
                }
                let result = finalizer.finalize(&replacement, &[], None);
                if let Some(set) = patches {
                    set.replace_root(base, &result);
                }
                result
            }
        };
        debug!(changed = !result.is(base), drafts = scope.len(), "produced");
        drop(guard);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Strategy;
    use serde_json::json;

    fn producer() -> Producer {
        Producer::new(ProducerConfig::default().with_auto_freeze(true))
    }

    #[test]
    fn primitive_base_runs_recipe_directly() {
        let p = producer();
        let out = p
            .produce(&Value::from(1), |v| Ok::<_, DraftError>(Some(Value::from(v.as_i64().unwrap() + 1))))
            .unwrap();
        assert_eq!(out, Value::from(2));
        let out = p.produce(&Value::from("x"), |_| Ok::<_, DraftError>(None)).unwrap();
        assert_eq!(out, Value::from("x"));
    }

    #[test]
    fn returning_the_root_draft_counts_as_no_replacement() {
        let p = producer();
        let base = Value::from(json!({"a": 1}));
        let out = p
            .produce(&base, |d| {
                d.draft()?.set("a", 2)?;
                Ok::<_, DraftError>(Some(d.clone()))
            })
            .unwrap();
        assert_eq!(out, Value::from(json!({"a": 2})));
    }

    #[test]
    fn replacement_with_untouched_draft_inside() {
        let p = producer();
        let base = Value::from(json!({"keep": {"x": 1}}));
        let out = p
            .produce(&base, |d| {
                let keep = d.draft()?.get("keep")?.unwrap_or_default();
                Ok::<_, DraftError>(Some(Value::from(vec![keep])))
            })
            .unwrap();
        assert!(out.get(0).unwrap().is(base.get("keep").unwrap()));
        assert!(out.is_frozen());
    }

    #[test]
    fn scope_is_closed_after_each_call() {
        let p = producer();
        let base = Value::from(json!({}));
        p.produce(&base, |_| {
            assert_eq!(p.scope_depth(), 1);
            Ok::<_, DraftError>(None)
        })
        .unwrap();
        assert_eq!(p.scope_depth(), 0);
        let err = p
            .produce(&base, |_| Err::<Option<Value>, _>(DraftError::InvalidArgument("stop".into())))
            .unwrap_err();
        assert_eq!(err, DraftError::InvalidArgument("stop".into()));
        assert_eq!(p.scope_depth(), 0);
    }

    #[test]
    fn setters_update_config() {
        let mut p = Producer::default();
        p.set_auto_freeze(false);
        p.set_use_proxies(false);
        assert!(!p.config().auto_freeze);
        assert_eq!(p.config().strategy, Strategy::Accessor);
    }

    #[test]
    fn apply_patches_starts_from_last_root_replacement() {
        let p = producer();
        let patches = vec![
            Patch::Replace {
                path: vec![],
                value: Value::from(json!({"a": 1})),
                orig_value: None,
            },
            Patch::Add {
                path: vec!["b".into()],
                value: Value::from(2),
            },
        ];
        let out = p.apply_patches(&Value::Null, &patches).unwrap();
        assert_eq!(out, Value::from(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn apply_patches_rejects_root_removal() {
        let p = producer();
        let patches = vec![Patch::Remove {
            path: vec![],
            orig_value: None,
        }];
        let err = p.apply_patches(&Value::from(json!({})), &patches).unwrap_err();
        assert_eq!(err, PatchError::InvalidTarget);
    }
}
