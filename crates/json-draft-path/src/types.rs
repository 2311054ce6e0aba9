//! Type definitions for draft paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A step in a draft path.
///
/// Object members are addressed by [`PathStep::Key`], array elements by
/// [`PathStep::Index`]. On the wire a key is a JSON string and an index is a
/// JSON number, so `["list", 0]` round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    Index(usize),
    Key(String),
}

/// A path from the document root to a value.
pub type Path = Vec<PathStep>;

impl PathStep {
    /// Returns the array index addressed by this step, if any.
    ///
    /// Keys made only of digits (without a leading zero) also count, so a
    /// step parsed from a JSON Pointer can still address an array element.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathStep::Index(i) => Some(*i),
            PathStep::Key(k) if crate::is_valid_index(k) => k.parse().ok(),
            PathStep::Key(_) => None,
        }
    }

    /// Returns the object key addressed by this step.
    pub fn to_key(&self) -> String {
        match self {
            PathStep::Index(i) => i.to_string(),
            PathStep::Key(k) => k.clone(),
        }
    }

    /// Returns true for the `-` step (one past the end of an array).
    pub fn is_array_end(&self) -> bool {
        matches!(self, PathStep::Key(k) if k == "-")
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Index(i) => write!(f, "{i}"),
            PathStep::Key(k) => f.write_str(k),
        }
    }
}

impl From<usize> for PathStep {
    fn from(i: usize) -> Self {
        PathStep::Index(i)
    }
}

/// Negative numbers cannot index an array and are kept as keys.
impl From<i32> for PathStep {
    fn from(i: i32) -> Self {
        usize::try_from(i).map_or_else(|_| PathStep::Key(i.to_string()), PathStep::Index)
    }
}

impl From<&str> for PathStep {
    fn from(k: &str) -> Self {
        PathStep::Key(k.to_string())
    }
}

impl From<String> for PathStep {
    fn from(k: String) -> Self {
        PathStep::Key(k)
    }
}

impl From<&String> for PathStep {
    fn from(k: &String) -> Self {
        PathStep::Key(k.clone())
    }
}

impl From<&PathStep> for PathStep {
    fn from(step: &PathStep) -> Self {
        step.clone()
    }
}
