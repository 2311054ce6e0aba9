//! Errors raised by drafts and producers.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// A draft was used after the producer call that created it returned.
    #[error(
        "cannot use a draft that has been revoked (path: \"{path}\"); \
         was it kept past the end of its producer call?"
    )]
    RevokedAccess { path: String },
    /// The recipe modified its draft and also returned a different value.
    #[error(
        "a producer returned a new value and modified its draft; \
         either return a new value or modify the draft"
    )]
    ConflictingResult,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot modify a frozen value")]
    Frozen,
    #[error("cannot modify a draft while it is being finalized")]
    Finalizing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_message_names_the_path() {
        let err = DraftError::RevokedAccess {
            path: "/todos/0".into(),
        };
        assert!(err.to_string().contains("/todos/0"));
    }
}
