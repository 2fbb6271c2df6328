// Path: crates/api/src/lib.rs

//! # Staking Ledger API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
#![deny(missing_docs)]
//! # Staking Ledger API
//!
//! Capability traits shared by every ledger component: the `Chain` read/write
//! contract, parent resolution through `Versions`, pluggable reward curves and
//! the key-value persistence collaborator. Also home of the staker iterator
//! algebra, which every state layer uses to expose its staker sets lazily.

/// Pluggable reward-curve capabilities.
pub mod reward;
/// The `Chain` contract, parent resolution and the staker iterator algebra.
pub mod state;
/// The key-value persistence collaborator.
pub mod storage;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::reward::{RewardCalculator, RewardCalculators};
    pub use crate::state::{Chain, StakerDiffIterator, StakerIterator, StakerTree, Versions};
    pub use crate::storage::{KvStore, StorageError, WriteBatch};
    pub use pchain_types::error::{ErrorCode, StateError};
}
