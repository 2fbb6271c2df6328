// Path: crates/storage/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Pure-Rust key-value stores for the staking ledger.
//!
//! `MemoryStore` keeps everything in an ordered map and suits tests and
//! throwaway nodes. `RedbStore` persists into a single redb table. Both scan
//! in raw key byte order, which the ledger's key layout depends on.

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;
