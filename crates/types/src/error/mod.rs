// Path: crates/types/src/error/mod.rs
//! Core error types for the staking ledger.

use crate::ids::Id;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors raised by the staker registries, layered state and time advancement.
///
/// `NotFound` is a recoverable absence and is frequently used as control flow.
/// Every other variant is fatal to the operation that produced it: a block
/// verifier converts it into rejection of the candidate block.
#[derive(Error, Debug)]
pub enum StateError {
    /// A queried entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The parent of a layered state could not be resolved.
    #[error("Missing parent state: {0}")]
    MissingParentState(Id),
    /// A caller broke a documented precondition.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    /// Supply, reward or weight accumulation exceeded the representable range.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
    /// Supply, reward or weight accumulation dropped below zero.
    #[error("Arithmetic underflow: {0}")]
    Underflow(String),
    /// Persisted bytes could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The persistence collaborator failed.
    #[error("State backend error: {0}")]
    Backend(String),
    /// A staker record violates its own invariants (e.g. zero duration).
    #[error("Invalid staker: {0}")]
    InvalidStaker(String),
    /// A staking transaction cannot be applied to the current state.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StateError {
    /// Returns `true` for the recoverable absence variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STATE_NOT_FOUND",
            Self::MissingParentState(_) => "STATE_MISSING_PARENT",
            Self::InvariantViolation(_) => "STATE_INVARIANT_VIOLATION",
            Self::Overflow(_) => "STATE_OVERFLOW",
            Self::Underflow(_) => "STATE_UNDERFLOW",
            Self::Decode(_) => "STATE_DECODE_ERROR",
            Self::Backend(_) => "STATE_BACKEND_ERROR",
            Self::InvalidStaker(_) => "STATE_INVALID_STAKER",
            Self::InvalidTransaction(_) => "STATE_INVALID_TRANSACTION",
            Self::InvalidConfig(_) => "STATE_INVALID_CONFIG",
        }
    }
}

impl From<parity_scale_codec::Error> for StateError {
    fn from(e: parity_scale_codec::Error) -> Self {
        StateError::Decode(e.to_string())
    }
}

/// Adds `a + b`, reporting `what` on overflow.
pub fn checked_add(a: u64, b: u64, what: &str) -> Result<u64, StateError> {
    a.checked_add(b)
        .ok_or_else(|| StateError::Overflow(format!("{what}: {a} + {b}")))
}

/// Subtracts `a - b`, reporting `what` on underflow.
pub fn checked_sub(a: u64, b: u64, what: &str) -> Result<u64, StateError> {
    a.checked_sub(b)
        .ok_or_else(|| StateError::Underflow(format!("{what}: {a} - {b}")))
}
