//! The handle a recipe mutates.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use json_draft_path::{format_json_pointer, Path, PathStep};

use crate::backend::Interceptor;
use crate::error::DraftError;
use crate::state::{DraftState, StateCell};
use crate::value::{out_of_bounds, Value};

/// A mutable view over a base value.
///
/// Reads see the latest writes; the base itself is never touched. Reading a
/// nested record or sequence returns a nested draft (as [`Value::Draft`]) so
/// that writes below it are tracked too. Every method fails with
/// [`DraftError::RevokedAccess`] once the producer call that created the
/// draft has returned.
#[derive(Clone)]
pub struct Draft(pub(crate) Rc<StateCell>);

impl Draft {
    pub(crate) fn from_state(state: DraftState) -> Self {
        Draft(Rc::new(RefCell::new(state)))
    }

    fn interceptor(&self) -> &'static dyn Interceptor {
        self.0.borrow().strategy.interceptor()
    }

    /// Normalizes `key` for this draft's container kind: arrays take
    /// indices, objects take string keys. `-` resolves to the array length
    /// when `allow_end` is set.
    fn resolve(&self, key: PathStep, allow_end: bool) -> Result<PathStep, DraftError> {
        if !self.is_array() {
            return Ok(PathStep::Key(key.to_key()));
        }
        if allow_end && key.is_array_end() {
            return self.len().map(PathStep::Index);
        }
        key.as_index()
            .map(PathStep::Index)
            .ok_or_else(|| DraftError::InvalidArgument(format!("\"{key}\" is not an array index")))
    }

    /// Reads one member. Draftable members come back as nested drafts.
    pub fn get(&self, key: impl Into<PathStep>) -> Result<Option<Value>, DraftError> {
        let key = key.into();
        if self.is_array() && key.as_index().is_none() {
            self.0.borrow().check_live()?;
            return Ok(None);
        }
        let key = self.resolve(key, false)?;
        self.interceptor().get(self, &key)
    }

    /// Reads a member that must be a record or sequence.
    ///
    /// # Errors
    ///
    /// [`DraftError::InvalidArgument`] if the member is missing or is not
    /// draftable.
    pub fn child(&self, key: impl Into<PathStep>) -> Result<Draft, DraftError> {
        let key = key.into();
        match self.get(key.clone())? {
            Some(Value::Draft(d)) => Ok(d),
            Some(other) => Err(DraftError::InvalidArgument(format!(
                "\"{key}\" holds {}, not a record or sequence",
                other.kind()
            ))),
            None => Err(DraftError::InvalidArgument(format!("\"{key}\" does not exist"))),
        }
    }

    /// Writes one member. On arrays the index may be at most the current
    /// length (`-` appends).
    pub fn set(&self, key: impl Into<PathStep>, value: impl Into<Value>) -> Result<(), DraftError> {
        let key = self.resolve(key.into(), true)?;
        if let PathStep::Index(index) = key {
            let len = self.len()?;
            if index > len {
                return Err(out_of_bounds(index, len));
            }
        }
        self.interceptor().set(self, &key, value.into())
    }

    /// Removes one member, returning whether it existed. On arrays the
    /// following elements shift down.
    pub fn delete(&self, key: impl Into<PathStep>) -> Result<bool, DraftError> {
        if self.is_array() {
            let key = self.resolve(key.into(), false)?;
            let len = self.len()?;
            return match key {
                PathStep::Index(i) if i < len => self.remove(i).map(|_| true),
                _ => Ok(false),
            };
        }
        let key = self.resolve(key.into(), false)?;
        self.interceptor().delete(self, &key)
    }

    pub fn len(&self) -> Result<usize, DraftError> {
        self.interceptor().len(self)
    }

    pub fn is_empty(&self) -> Result<bool, DraftError> {
        self.len().map(|n| n == 0)
    }

    pub fn keys(&self) -> Result<Vec<PathStep>, DraftError> {
        self.interceptor().keys(self)
    }

    pub fn contains_key(&self, key: impl Into<PathStep>) -> Result<bool, DraftError> {
        let key = key.into();
        if self.is_array() {
            let len = self.len()?;
            return Ok(key.as_index().is_some_and(|i| i < len));
        }
        let key = PathStep::Key(key.to_key());
        Ok(self.keys()?.contains(&key))
    }

    pub fn is_array(&self) -> bool {
        self.0.borrow().is_array()
    }

    // ── Array helpers ─────────────────────────────────────────────────────

    pub fn push(&self, value: impl Into<Value>) -> Result<(), DraftError> {
        let len = self.array_len()?;
        self.set(len, value)
    }

    pub fn pop(&self) -> Result<Option<Value>, DraftError> {
        let len = self.array_len()?;
        if len == 0 {
            return Ok(None);
        }
        let last = self.peek(len - 1)?;
        self.truncate(len - 1)?;
        Ok(last)
    }

    /// Inserts at `index`, shifting later elements up. Shifted records and
    /// sequences move as drafts and stay editable.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), DraftError> {
        let len = self.array_len()?;
        if index > len {
            return Err(out_of_bounds(index, len));
        }
        let interceptor = self.interceptor();
        interceptor.set_len(self, len + 1)?;
        for i in (index + 1..=len).rev() {
            let moved = interceptor.get(self, &PathStep::Index(i - 1))?.unwrap_or_default();
            interceptor.set(self, &PathStep::Index(i), moved)?;
        }
        interceptor.set(self, &PathStep::Index(index), value.into())
    }

    /// Removes the element at `index`, shifting later elements down.
    pub fn remove(&self, index: usize) -> Result<Option<Value>, DraftError> {
        let len = self.array_len()?;
        if index >= len {
            return Ok(None);
        }
        let removed = self.peek(index)?;
        let interceptor = self.interceptor();
        for i in index..len - 1 {
            let moved = interceptor.get(self, &PathStep::Index(i + 1))?.unwrap_or_default();
            interceptor.set(self, &PathStep::Index(i), moved)?;
        }
        interceptor.set_len(self, len - 1)?;
        Ok(removed)
    }

    /// Shortens or lengthens the array. New elements are `null`.
    pub fn truncate(&self, len: usize) -> Result<(), DraftError> {
        self.array_len()?;
        self.interceptor().set_len(self, len)
    }

    fn array_len(&self) -> Result<usize, DraftError> {
        if !self.is_array() {
            return Err(DraftError::InvalidArgument(format!(
                "the draft at \"{}\" is not an array",
                format_json_pointer(&self.path())
            )));
        }
        self.len()
    }

    /// Reads without creating a nested draft.
    fn peek(&self, index: usize) -> Result<Option<Value>, DraftError> {
        self.interceptor().peek(self, &PathStep::Index(index))
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// Keys from the root draft to this one.
    pub fn path(&self) -> Path {
        self.0.borrow().path.clone()
    }

    /// The value this draft was created over.
    pub fn base(&self) -> Value {
        self.0.borrow().base.clone()
    }

    pub fn is_modified(&self) -> bool {
        self.0.borrow().modified
    }

    pub fn is_revoked(&self) -> bool {
        self.0.borrow().revoked
    }

    pub fn ptr_eq(&self, other: &Draft) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(state) => f
                .debug_struct("Draft")
                .field("path", &format_json_pointer(&state.path))
                .field("modified", &state.modified)
                .field("revoked", &state.revoked)
                .finish(),
            Err(_) => f.write_str("Draft { .. }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Strategy;
    use crate::scope::ScopeStack;
    use crate::state::new_draft;
    use serde_json::json;

    fn with_draft(base: serde_json::Value, strategy: Strategy, f: impl FnOnce(&Draft)) {
        let stack = ScopeStack::new();
        let scope = stack.open();
        let draft = strategy.interceptor().create(Value::from(base), None, &scope);
        f(&draft);
        stack.close();
        assert!(draft.is_revoked());
    }

    #[test]
    fn reads_see_writes() {
        for strategy in [Strategy::Trap, Strategy::Accessor] {
            with_draft(json!({"a": 1}), strategy, |d| {
                d.set("a", 2).unwrap();
                d.set("b", 3).unwrap();
                assert_eq!(d.get("a").unwrap(), Some(Value::from(2)));
                assert_eq!(d.get("b").unwrap(), Some(Value::from(3)));
                assert_eq!(d.len().unwrap(), 2);
                assert!(d.is_modified());
                assert_eq!(d.base(), Value::from(json!({"a": 1})));
            });
        }
    }

    #[test]
    fn nested_reads_return_drafts() {
        with_draft(json!({"n": {"x": 1}, "p": 1}), Strategy::Trap, |d| {
            let n = d.child("n").unwrap();
            assert_eq!(n.path(), vec![PathStep::from("n")]);
            assert!(d.child("n").unwrap().ptr_eq(&n));
            assert!(matches!(d.child("p"), Err(DraftError::InvalidArgument(_))));
            assert!(matches!(d.child("q"), Err(DraftError::InvalidArgument(_))));
        });
    }

    #[test]
    fn child_write_marks_ancestors() {
        with_draft(json!({"n": {"m": {"x": 1}}}), Strategy::Trap, |d| {
            let m = d.child("n").unwrap().child("m").unwrap();
            assert!(!d.is_modified());
            m.set("x", 2).unwrap();
            assert!(d.is_modified());
            assert!(d.child("n").unwrap().is_modified());
        });
    }

    #[test]
    fn array_helpers() {
        for strategy in [Strategy::Trap, Strategy::Accessor] {
            with_draft(json!([1, 2, 3]), strategy, |d| {
                d.push(4).unwrap();
                d.insert(0, 0).unwrap();
                assert_eq!(d.remove(2).unwrap(), Some(Value::from(2)));
                assert_eq!(d.pop().unwrap(), Some(Value::from(4)));
                d.set("-", 5).unwrap();
                assert!(d.delete(0).unwrap());
                let items: Vec<_> = (0..d.len().unwrap())
                    .map(|i| d.get(i).unwrap().unwrap())
                    .collect();
                assert_eq!(items, vec![Value::from(1), Value::from(3), Value::from(5)]);
            });
        }
    }

    #[test]
    fn array_writes_past_the_end_are_rejected() {
        with_draft(json!([1]), Strategy::Trap, |d| {
            assert!(matches!(d.set(3, 1), Err(DraftError::InvalidArgument(_))));
            assert!(matches!(d.set("x", 1), Err(DraftError::InvalidArgument(_))));
            assert_eq!(d.get("x").unwrap(), None);
        });
    }

    #[test]
    fn object_rejects_array_helpers() {
        with_draft(json!({}), Strategy::Trap, |d| {
            assert!(matches!(d.push(1), Err(DraftError::InvalidArgument(_))));
        });
    }

    #[test]
    fn delete_reports_presence() {
        for strategy in [Strategy::Trap, Strategy::Accessor] {
            with_draft(json!({"a": 1}), strategy, |d| {
                assert!(!d.delete("zz").unwrap());
                assert!(d.delete("a").unwrap());
                assert!(!d.contains_key("a").unwrap());
                assert!(d.is_empty().unwrap());
            });
        }
    }

    #[test]
    fn revoked_draft_names_its_path() {
        let stack = ScopeStack::new();
        let scope = stack.open();
        let root = new_draft(
            Value::from(json!({"todos": [{"done": false}]})),
            None,
            &scope,
            Strategy::Trap,
            None,
        );
        let todo = root.child("todos").unwrap().child(0).unwrap();
        stack.close();
        assert_eq!(
            todo.set("done", true),
            Err(DraftError::RevokedAccess {
                path: "/todos/0".into()
            })
        );
        assert!(root.get("todos").is_err());
    }
}
