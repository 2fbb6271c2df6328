// Path: crates/types/src/lib.rs
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

//! # Platform Chain Staking Types
//!
//! This crate is the foundational library for the staking ledger, containing the
//! staker record, ledger records, error types and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `pchain-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This prevents circular
//! dependencies and provides one canonical definition for shared types like
//! `Staker`, `Id`, `NodeId` and the `StateError` taxonomy.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::StateError> = std::result::Result<T, E>;

/// The canonical, deterministic binary codec for consensus-critical state.
pub mod codec;
/// Shared configuration structures (staking parameters, reward curves, genesis).
pub mod config;
/// A unified set of all error types used by the ledger.
pub mod error;
/// Fixed-width identifiers for transactions, supernets, chains and nodes.
pub mod ids;
/// Constants and builders for the keys used by the persistence layer.
pub mod keys;
/// Ledger records other than stakers: UTXOs, supernets, chains, transactions.
pub mod ledger;
/// A prelude containing useful extension traits like `OptionExt`.
pub mod prelude;
/// The staker record, its priorities and the staking transaction it derives from.
pub mod staker;

pub use ids::{Id, NodeId, PRIMARY_NETWORK_ID};
pub use staker::{Priority, Staker, StakerKey, StakerKind, StakerTx};
