//! Validation of JSON Pointer strings.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a JSON Pointer must be empty or start with '/'")]
    PointerInvalid,
}

/// Checks that a JSON Pointer string can be parsed into a patch path.
/// Pointers of any length and depth are accepted.
///
/// # Errors
///
/// [`ValidationError::PointerInvalid`] if the pointer is non-empty but
/// doesn't start with `/`.
///
/// ```
/// use json_draft_path::validate_json_pointer;
///
/// validate_json_pointer("").unwrap();
/// validate_json_pointer("/foo/bar").unwrap();
/// validate_json_pointer("foo").unwrap_err();
/// ```
pub fn validate_json_pointer(pointer: &str) -> Result<(), ValidationError> {
    if pointer.is_empty() || pointer.starts_with('/') {
        return Ok(());
    }
    Err(ValidationError::PointerInvalid)
}
