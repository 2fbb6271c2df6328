// Path: crates/api/src/state/mod.rs
//! Core traits for ledger state, split into a read/write contract and a
//! parent-resolution capability.
//!
//! - `Chain`: the full ledger read/write contract implemented by the durable
//!   root state and by every copy-on-write layer built on top of it.
//! - `Versions`: resolves a layer's parent by block id.
//! - The staker iterator algebra (`StakerIterator`, `StakerDiffIterator`),
//!   through which every layer exposes its staker sets without copying them.

use pchain_types::error::StateError;
use pchain_types::ledger::{
    ChainRecord, StoredTx, SupernetRecord, SupernetTransformation, TxStatus, Utxo, UtxoId,
};
use pchain_types::{Id, NodeId, Staker};

mod iterator;

pub use iterator::*;

/// The ledger read/write contract.
///
/// Staker lookups return `Ok(None)` for a recoverable absence; errors are
/// reserved for fatal conditions such as an unresolvable parent layer.
///
/// The registry mutators trust their caller: `put_*` requires the staker to be
/// absent and `delete_*` requires it to be present. Neither re-checks.
pub trait Chain: Send + Sync {
    /// The chain time, in Unix seconds.
    fn timestamp(&self) -> u64;
    /// Sets the chain time.
    fn set_timestamp(&mut self, timestamp: u64);

    /// The circulating supply of a supernet's staking asset.
    fn current_supply(&self, supernet_id: &Id) -> Result<u64, StateError>;
    /// Sets the circulating supply of a supernet's staking asset.
    fn set_current_supply(&mut self, supernet_id: &Id, supply: u64);
    /// The balance available to pay a supernet's staking rewards.
    fn reward_pool_supply(&self, supernet_id: &Id) -> Result<u64, StateError>;
    /// Sets the balance available to pay a supernet's staking rewards.
    fn set_reward_pool_supply(&mut self, supernet_id: &Id, supply: u64);
    /// The accumulated fee pool.
    fn fee_pool(&self) -> u64;
    /// Sets the accumulated fee pool.
    fn set_fee_pool(&mut self, fee_pool: u64);

    /// The current validator of `node_id` on `supernet_id`.
    fn current_validator(&self, supernet_id: &Id, node_id: &NodeId)
        -> Result<Option<&Staker>, StateError>;
    /// Adds a current validator.
    fn put_current_validator(&mut self, staker: Staker);
    /// Removes a current validator.
    fn delete_current_validator(&mut self, staker: &Staker);
    /// The current delegators of `node_id` on `supernet_id`, in staker order.
    fn current_delegator_iterator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<StakerIterator<'_>, StateError>;
    /// Adds a current delegator.
    fn put_current_delegator(&mut self, staker: Staker);
    /// Removes a current delegator.
    fn delete_current_delegator(&mut self, staker: &Staker);
    /// Every current staker, in staker order.
    fn current_staker_iterator(&self) -> Result<StakerIterator<'_>, StateError>;

    /// The pending validator of `node_id` on `supernet_id`.
    fn pending_validator(&self, supernet_id: &Id, node_id: &NodeId)
        -> Result<Option<&Staker>, StateError>;
    /// Adds a pending validator.
    fn put_pending_validator(&mut self, staker: Staker);
    /// Removes a pending validator.
    fn delete_pending_validator(&mut self, staker: &Staker);
    /// The pending delegators of `node_id` on `supernet_id`, in staker order.
    fn pending_delegator_iterator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<StakerIterator<'_>, StateError>;
    /// Adds a pending delegator.
    fn put_pending_delegator(&mut self, staker: Staker);
    /// Removes a pending delegator.
    fn delete_pending_delegator(&mut self, staker: &Staker);
    /// Every pending staker, in staker order.
    fn pending_staker_iterator(&self) -> Result<StakerIterator<'_>, StateError>;

    /// An unspent output.
    fn utxo(&self, id: &UtxoId) -> Result<Option<Utxo>, StateError>;
    /// Adds an unspent output.
    fn add_utxo(&mut self, utxo: Utxo);
    /// Spends an unspent output.
    fn delete_utxo(&mut self, id: &UtxoId);
    /// The reward outputs created when the staker of `staker_tx_id` retired.
    fn reward_utxos(&self, staker_tx_id: &Id) -> Result<Vec<Utxo>, StateError>;
    /// Records a reward output of the staker of `staker_tx_id`.
    fn add_reward_utxo(&mut self, staker_tx_id: &Id, utxo: Utxo);

    /// A supernet record.
    fn supernet(&self, supernet_id: &Id) -> Result<Option<SupernetRecord>, StateError>;
    /// Registers a supernet.
    fn add_supernet(&mut self, supernet: SupernetRecord);
    /// The transformation that made a supernet permissionless.
    fn supernet_transformation(
        &self,
        supernet_id: &Id,
    ) -> Result<Option<SupernetTransformation>, StateError>;
    /// Records a supernet transformation.
    fn add_supernet_transformation(&mut self, transformation: SupernetTransformation);
    /// The chains validated by a supernet, ordered by chain id.
    fn chains(&self, supernet_id: &Id) -> Result<Vec<ChainRecord>, StateError>;
    /// Registers a chain.
    fn add_chain(&mut self, chain: ChainRecord);

    /// A stored transaction and its status.
    fn tx(&self, tx_id: &Id) -> Result<Option<(StoredTx, TxStatus)>, StateError>;
    /// Records a transaction with its status.
    fn add_tx(&mut self, tx: StoredTx, status: TxStatus);
}

/// Resolves ledger states by the id of the block that produced them.
///
/// A layer holds only its parent's id; the parent must stay resolvable for as
/// long as the layer is alive.
pub trait Versions: Send + Sync {
    /// Returns the state produced by `block_id`, if it is still available.
    fn get_state(&self, block_id: &Id) -> Option<&dyn Chain>;
}
