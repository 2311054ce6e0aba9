//! JSON-shaped values whose containers are shared by reference.
//!
//! Containers ([`Object`], [`Array`]) live behind an `Rc`, so two values can
//! share a subtree and [`Value::is`] can tell whether they do. A container
//! can be frozen; the public mutators refuse to touch a frozen node and every
//! write to a shared node is copy-on-write, so a value handed to a producer
//! is never changed underneath its owner.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use json_draft_path::{format_json_pointer, PathStep};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

use crate::draft::Draft;
use crate::error::DraftError;

/// Insertion-ordered storage of an [`Object`].
pub type Map = IndexMap<String, Value>;

struct Node<T> {
    items: T,
    frozen: Cell<bool>,
}

impl<T> Node<T> {
    fn new(items: T) -> Self {
        Self {
            items,
            frozen: Cell::new(false),
        }
    }
}

// A cloned node is a fresh, writable node.
impl<T: Clone> Clone for Node<T> {
    fn clone(&self) -> Self {
        Node::new(self.items.clone())
    }
}

// ── Object ────────────────────────────────────────────────────────────────

/// A shared, insertion-ordered record.
#[derive(Clone)]
pub struct Object(Rc<Node<Map>>);

impl Object {
    pub fn new() -> Self {
        Self::from(Map::new())
    }

    pub fn len(&self) -> usize {
        self.0.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.items.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.items.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.items.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.items.iter()
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    /// Freezes this node (not its children).
    pub fn freeze(&self) {
        self.0.frozen.set(true);
    }

    /// Returns true if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Inserts `value` at `key`, returning the previous value.
    ///
    /// # Errors
    ///
    /// [`DraftError::Frozen`] if this node is frozen.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, DraftError> {
        self.check_writable()?;
        Ok(self.make_mut().insert(key.into(), value.into()))
    }

    /// Removes `key`, keeping the order of the remaining members.
    ///
    /// # Errors
    ///
    /// [`DraftError::Frozen`] if this node is frozen.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, DraftError> {
        self.check_writable()?;
        Ok(self.make_mut().shift_remove(key))
    }

    fn check_writable(&self) -> Result<(), DraftError> {
        if self.is_frozen() {
            return Err(DraftError::Frozen);
        }
        Ok(())
    }

    /// Copy-on-write access that ignores the frozen flag: a frozen node is
    /// replaced by a writable clone instead of being written.
    pub(crate) fn make_mut(&mut self) -> &mut Map {
        if self.is_frozen() {
            self.0 = Rc::new(Node::new(self.0.items.clone()));
        }
        &mut Rc::make_mut(&mut self.0).items
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map> for Object {
    fn from(map: Map) -> Self {
        Object(Rc::new(Node::new(map)))
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Object::from(iter.into_iter().collect::<Map>())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ── Array ─────────────────────────────────────────────────────────────────

/// A shared, ordered sequence.
#[derive(Clone)]
pub struct Array(Rc<Node<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.items.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0.items
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    /// Freezes this node (not its children).
    pub fn freeze(&self) {
        self.0.frozen.set(true);
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// # Errors
    ///
    /// [`DraftError::Frozen`] if this node is frozen.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), DraftError> {
        self.check_writable()?;
        self.make_mut().push(value.into());
        Ok(())
    }

    /// Replaces the element at `index`, returning the old one.
    ///
    /// # Errors
    ///
    /// [`DraftError::Frozen`] if this node is frozen,
    /// [`DraftError::InvalidArgument`] if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<Value, DraftError> {
        self.check_writable()?;
        if index >= self.len() {
            return Err(out_of_bounds(index, self.len()));
        }
        Ok(std::mem::replace(&mut self.make_mut()[index], value.into()))
    }

    /// # Errors
    ///
    /// [`DraftError::Frozen`] if this node is frozen,
    /// [`DraftError::InvalidArgument`] if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Result<Value, DraftError> {
        self.check_writable()?;
        if index >= self.len() {
            return Err(out_of_bounds(index, self.len()));
        }
        Ok(self.make_mut().remove(index))
    }

    fn check_writable(&self) -> Result<(), DraftError> {
        if self.is_frozen() {
            return Err(DraftError::Frozen);
        }
        Ok(())
    }

    pub(crate) fn make_mut(&mut self) -> &mut Vec<Value> {
        if self.is_frozen() {
            self.0 = Rc::new(Node::new(self.0.items.clone()));
        }
        &mut Rc::make_mut(&mut self.0).items
    }
}

pub(crate) fn out_of_bounds(index: usize, len: usize) -> DraftError {
    DraftError::InvalidArgument(format!("index {index} is out of bounds for length {len}"))
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Array(Rc::new(Node::new(items)))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Array::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// ── Value ─────────────────────────────────────────────────────────────────

/// A JSON value, or a live [`Draft`] while a producer call is running.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Array),
    Object(Object),
    Draft(Draft),
}

impl Value {
    /// Identity comparison: containers and drafts by reference, primitives by
    /// value.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Draft(a), Value::Draft(b)) => a.ptr_eq(b),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Only records and sequences get drafts.
    pub fn is_draftable(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Value::Draft(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_draft(&self) -> Option<&Draft> {
        match self {
            Value::Draft(d) => Some(d),
            _ => None,
        }
    }

    /// Like [`Value::as_draft`], for use with `?` inside a recipe.
    ///
    /// # Errors
    ///
    /// [`DraftError::InvalidArgument`] if this value is not a draft.
    pub fn draft(&self) -> Result<&Draft, DraftError> {
        self.as_draft().ok_or_else(|| {
            DraftError::InvalidArgument(format!("expected a draft, found {}", self.kind()))
        })
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Primitives count as frozen; drafts never are.
    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Object(o) => o.is_frozen(),
            Value::Array(a) => a.is_frozen(),
            Value::Draft(_) => false,
            _ => true,
        }
    }

    /// Freezes the top-level container. No-op for anything else.
    pub fn freeze(&self) {
        match self {
            Value::Object(o) => o.freeze(),
            Value::Array(a) => a.freeze(),
            _ => {}
        }
    }

    /// Looks up one step below this value. Drafts are not looked through.
    pub fn get(&self, step: impl Into<PathStep>) -> Option<&Value> {
        self.lookup(&step.into())
    }

    /// Follows `path` from this value.
    pub fn get_in(&self, path: &[PathStep]) -> Option<&Value> {
        path.iter().try_fold(self, |current, step| current.lookup(step))
    }

    /// Converts to a `serde_json::Value`.
    ///
    /// # Errors
    ///
    /// [`DraftError::InvalidArgument`] if a live draft is reachable.
    pub fn to_json(&self) -> Result<serde_json::Value, DraftError> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(a) => {
                serde_json::Value::Array(a.iter().map(Value::to_json).collect::<Result<_, _>>()?)
            }
            Value::Object(o) => serde_json::Value::Object(
                o.iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<Result<_, DraftError>>()?,
            ),
            Value::Draft(d) => {
                return Err(DraftError::InvalidArgument(format!(
                    "cannot convert the live draft at \"{}\" to JSON",
                    format_json_pointer(&d.path())
                )))
            }
        })
    }

    /// The kind of value, with its article, for error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
            Value::Draft(_) => "a draft",
        }
    }

    pub(crate) fn lookup(&self, step: &PathStep) -> Option<&Value> {
        match self {
            Value::Object(o) => match step {
                PathStep::Key(k) => o.get(k),
                PathStep::Index(i) => o.get(&i.to_string()),
            },
            Value::Array(a) => step.as_index().and_then(|i| a.get(i)),
            _ => None,
        }
    }

    pub(crate) fn contains(&self, step: &PathStep) -> bool {
        self.lookup(step).is_some()
    }

    /// Object keys as [`PathStep::Key`], array positions as
    /// [`PathStep::Index`].
    pub(crate) fn own_keys(&self) -> Vec<PathStep> {
        match self {
            Value::Object(o) => o.keys().map(PathStep::from).collect(),
            Value::Array(a) => (0..a.len()).map(PathStep::Index).collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn container_len(&self) -> usize {
        match self {
            Value::Object(o) => o.len(),
            Value::Array(a) => a.len(),
            _ => 0,
        }
    }

    /// A writable, unshared clone of the top-level container.
    pub(crate) fn shallow_copy(&self) -> Value {
        match self {
            Value::Object(o) => Value::Object(Object::from(o.0.items.clone())),
            Value::Array(a) => Value::Array(Array::from(a.0.items.clone())),
            other => other.clone(),
        }
    }

    /// Writes one member, growing an array with `Null` if `step` is past the
    /// end.
    pub(crate) fn cow_set(&mut self, step: &PathStep, value: Value) {
        match self {
            Value::Object(o) => {
                o.make_mut().insert(step.to_key(), value);
            }
            Value::Array(a) => {
                let Some(index) = step.as_index() else {
                    return;
                };
                let items = a.make_mut();
                if index < items.len() {
                    items[index] = value;
                } else {
                    items.resize(index, Value::Null);
                    items.push(value);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn cow_remove(&mut self, step: &PathStep) -> Option<Value> {
        match self {
            Value::Object(o) => o.make_mut().shift_remove(&step.to_key()),
            Value::Array(a) => {
                let index = step.as_index()?;
                if index < a.len() {
                    Some(a.make_mut().remove(index))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub(crate) fn cow_resize(&mut self, len: usize) {
        if let Value::Array(a) = self {
            a.make_mut().resize(len, Value::Null);
        }
    }

    /// Moves an object key that was just re-added back to its place in
    /// `base`.
    pub(crate) fn cow_restore_position(&mut self, step: &PathStep, base: &Value) {
        if let Value::Object(o) = self {
            restore_base_position(o.make_mut(), &step.to_key(), base);
        }
    }

    /// Identity of the container node, if this is one.
    pub(crate) fn node_id(&self) -> Option<*const ()> {
        match self {
            Value::Object(o) => Some(Rc::as_ptr(&o.0).cast()),
            Value::Array(a) => Some(Rc::as_ptr(&a.0).cast()),
            _ => None,
        }
    }
}

/// Moves `key` in `map` to where `base` holds it: right after the nearest
/// earlier base key still present, or first if there is none.
pub(crate) fn restore_base_position<T>(map: &mut IndexMap<String, T>, key: &str, base: &Value) {
    let (Value::Object(base), Some(from)) = (base, map.get_index_of(key)) else {
        return;
    };
    let Some(at) = base.0.items.get_index_of(key) else {
        return;
    };
    let to = base
        .0
        .items
        .keys()
        .take(at)
        .rev()
        .find_map(|k| map.get_index_of(k.as_str()))
        .map_or(0, |i| i + 1);
    map.move_index(from, if to > from { to - 1 } else { to });
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b) || a.0.items == b.0.items,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || a.0.items == b.0.items,
            _ => self.is(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(json) => write!(f, "{json}"),
            Err(_) => f.write_str("<draft>"),
        }
    }
}

// ── Serde ─────────────────────────────────────────────────────────────────

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for item in a.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (k, v) in o.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Draft(_) => Err(S::Error::custom("cannot serialize a live draft")),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(Object::from(map))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from(items))
    }
}

impl From<Draft> for Value {
    fn from(d: Draft) -> Self {
        Value::Draft(d)
    }
}

impl From<&Draft> for Value {
    fn from(d: &Draft) -> Self {
        Value::Draft(d.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
