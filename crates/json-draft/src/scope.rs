//! Scopes own the drafts of one producer call.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::draft::Draft;

pub(crate) struct ScopeInner {
    drafts: RefCell<Vec<Draft>>,
}

/// The drafts created during one producer call, in creation order.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    fn new() -> Self {
        Scope(Rc::new(ScopeInner {
            drafts: RefCell::new(Vec::new()),
        }))
    }

    pub(crate) fn upgrade(weak: &Weak<ScopeInner>) -> Option<Scope> {
        weak.upgrade().map(Scope)
    }

    pub(crate) fn downgrade(&self) -> Weak<ScopeInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn register(&self, draft: Draft) {
        self.0.drafts.borrow_mut().push(draft);
    }

    pub(crate) fn owns(&self, draft: &Draft) -> bool {
        Weak::ptr_eq(&draft.0.borrow().scope, &Rc::downgrade(&self.0))
    }

    /// Snapshot of the registered drafts.
    pub(crate) fn drafts(&self) -> Vec<Draft> {
        self.0.drafts.borrow().clone()
    }

    /// Number of drafts created in this scope so far.
    pub fn len(&self) -> usize {
        self.0.drafts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn revoke_all(&self) -> usize {
        let drafts = std::mem::take(&mut *self.0.drafts.borrow_mut());
        for draft in &drafts {
            draft.0.borrow_mut().revoked = true;
        }
        drafts.len()
    }
}

/// Stack of open scopes; nested producer calls push their own.
#[derive(Default)]
pub struct ScopeStack {
    scopes: RefCell<Vec<Scope>>,
}

impl fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeStack")
            .field("depth", &self.depth())
            .finish()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new, empty scope.
    pub fn open(&self) -> Scope {
        let scope = Scope::new();
        let mut scopes = self.scopes.borrow_mut();
        scopes.push(scope.clone());
        trace!(depth = scopes.len(), "scope opened");
        scope
    }

    pub fn current(&self) -> Option<Scope> {
        self.scopes.borrow().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.scopes.borrow().len()
    }

    /// Pops the innermost scope and revokes its drafts, returning how many
    /// were revoked.
    pub fn close(&self) -> usize {
        let (scope, depth) = {
            let mut scopes = self.scopes.borrow_mut();
            let depth = scopes.len();
            (scopes.pop(), depth)
        };
        let Some(scope) = scope else {
            return 0;
        };
        let revoked = scope.revoke_all();
        debug!(depth, revoked, "scope closed");
        revoked
    }

    /// Opens a scope that closes when the guard drops, on every exit path.
    pub(crate) fn enter(&self) -> ScopeGuard<'_> {
        ScopeGuard {
            scope: self.open(),
            stack: self,
        }
    }
}

pub(crate) struct ScopeGuard<'a> {
    stack: &'a ScopeStack,
    scope: Scope,
}

impl ScopeGuard<'_> {
    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.stack.close();
    }
}
