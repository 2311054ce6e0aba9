//! Paths for json-draft patches.
//!
//! A patch path is a list of [`PathStep`]s from the document root. This crate
//! also converts paths to and from [JSON Pointer (RFC 6901)](https://tools.ietf.org/html/rfc6901)
//! strings, which is how RFC 6902 patch documents spell them.
//!
//! # Example
//!
//! ```
//! use json_draft_path::{format_json_pointer, parse_json_pointer, PathStep};
//!
//! let path = vec![PathStep::from("todos"), PathStep::from(0), PathStep::from("done")];
//! assert_eq!(format_json_pointer(&path), "/todos/0/done");
//!
//! let parsed = parse_json_pointer("/todos/0/done");
//! assert_eq!(parsed[1].as_index(), Some(0));
//! ```

pub mod types;
pub use types::{Path, PathStep};

pub mod validate;
pub use validate::{validate_json_pointer, ValidationError};

/// Unescapes a JSON Pointer path component.
///
/// Per RFC 6901, `~1` is replaced with `/` and `~0` is replaced with `~`.
///
/// ```
/// use json_draft_path::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 first, otherwise "~01" would decode to "/"
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a JSON Pointer path component.
///
/// ```
/// use json_draft_path::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parse a JSON Pointer string into path steps.
///
/// Every step comes back as a [`PathStep::Key`]; whether a step addresses an
/// array element is only known once it meets the document, see
/// [`PathStep::as_index`].
///
/// ```
/// use json_draft_path::{parse_json_pointer, PathStep};
///
/// assert!(parse_json_pointer("").is_empty());
/// assert_eq!(parse_json_pointer("/"), vec![PathStep::from("")]);
/// assert_eq!(parse_json_pointer("/a~0b/c~1d"), vec![PathStep::from("a~b"), PathStep::from("c/d")]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Vec::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/')
        .map(|c| PathStep::Key(unescape_component(c)))
        .collect()
}

/// Format path steps into a JSON Pointer string.
///
/// ```
/// use json_draft_path::{format_json_pointer, PathStep};
///
/// assert_eq!(format_json_pointer(&[]), "");
/// assert_eq!(format_json_pointer(&[PathStep::from("a"), PathStep::from(1)]), "/a/1");
/// ```
pub fn format_json_pointer(path: &[PathStep]) -> String {
    let mut out = String::new();
    for step in path {
        out.push('/');
        match step {
            PathStep::Index(i) => out.push_str(&i.to_string()),
            PathStep::Key(k) => out.push_str(&escape_component(k)),
        }
    }
    out
}

/// Extend `path` by one step without touching the original.
pub fn join(path: &[PathStep], step: impl Into<PathStep>) -> Path {
    let mut out = Vec::with_capacity(path.len() + 1);
    out.extend_from_slice(path);
    out.push(step.into());
    out
}

/// Check if a string is a canonical non-negative array index.
///
/// ```
/// use json_draft_path::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("123"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(steps: &[&str]) -> Path {
        steps.iter().map(|s| PathStep::from(*s)).collect()
    }

    #[test]
    fn format_escapes_keys() {
        assert_eq!(format_json_pointer(&p(&["a/b", "c~d"])), "/a~1b/c~0d");
    }

    #[test]
    fn parse_then_format_is_stable() {
        for ptr in ["", "/", "/foo", "/foo/0", "/a~1b/c~0d", "//x"] {
            assert_eq!(format_json_pointer(&parse_json_pointer(ptr)), ptr);
        }
    }

    #[test]
    fn join_appends_one_step() {
        let base = p(&["a"]);
        let joined = join(&base, 3usize);
        assert_eq!(joined, vec![PathStep::from("a"), PathStep::Index(3)]);
        assert_eq!(base.len(), 1);
    }
}
