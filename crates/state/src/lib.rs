// Path: crates/state/src/lib.rs
//! # Platform Chain Staking State Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
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
//! # Platform Chain Staking State
//!
//! The staker registries, the durable root state and its copy-on-write
//! layers, and the time advancement engine that promotes and retires
//! stakers.

/// Chain time advancement: promotions, retirements and reward funding.
pub mod advance;
/// Copy-on-write state layers for speculative block execution.
pub mod diff;
/// Ledger-state effects of staking and supernet transactions.
pub mod executor;
/// The staking reward curve.
pub mod reward;
/// Committed and per-layer staker registries.
pub mod stakers;
/// The durable root state.
pub mod state;
/// Current and historical validator sets.
pub mod validators;

pub use advance::{
    advance_time_to, fund_reward, next_staker_change_time, verify_advance_time, Funding,
    Promotion, StateChanges,
};
pub use diff::{Diff, DiffChanges, VersionSet};
pub use executor::{apply_staker_tx, max_validator_weight, reward_staker};
pub use reward::{ConfiguredRewards, RewardCurve};
pub use state::State;
pub use validators::{validator_set, validator_set_at};

/// A prelude for easily importing the most common types.
pub mod prelude {
    pub use crate::{Diff, State, VersionSet};
    pub use pchain_api::prelude::*;
}
