// Path: crates/types/src/prelude.rs

//! A curated set of commonly used traits and types.

use crate::error::StateError;

/// Turns a missing record into [`StateError::NotFound`].
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, StateError>`, describing the
    /// missing entity with `what`.
    fn found_or(self, what: impl FnOnce() -> String) -> Result<T, StateError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn found_or(self, what: impl FnOnce() -> String) -> Result<T, StateError> {
        self.ok_or_else(|| StateError::NotFound(what()))
    }
}
