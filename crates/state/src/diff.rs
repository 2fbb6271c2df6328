// Path: crates/state/src/diff.rs

//! A copy-on-write ledger layer for speculative block execution.

use crate::stakers::{DiffStakers, Registry};
use pchain_api::state::{Chain, StakerIterator, Versions};
use pchain_types::error::StateError;
use pchain_types::ledger::{
    ChainRecord, StoredTx, SupernetRecord, SupernetTransformation, TxStatus, Utxo, UtxoId,
};
use pchain_types::{Id, NodeId, Staker};
use std::collections::{BTreeMap, HashMap};

/// Resolves parent states from a fixed set of borrowed states.
#[derive(Default)]
pub struct VersionSet<'a> {
    states: HashMap<Id, &'a dyn Chain>,
}

impl<'a> VersionSet<'a> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `state` resolvable as the state produced by `block_id`.
    pub fn insert(&mut self, block_id: Id, state: &'a dyn Chain) {
        self.states.insert(block_id, state);
    }

    /// Makes `block_id` unresolvable.
    pub fn remove(&mut self, block_id: &Id) {
        self.states.remove(block_id);
    }
}

impl Versions for VersionSet<'_> {
    fn get_state(&self, block_id: &Id) -> Option<&dyn Chain> {
        self.states.get(block_id).copied()
    }
}

/// The overrides recorded by one layer, detached from its parent.
#[derive(Debug, Default, Clone)]
pub struct DiffChanges {
    timestamp: u64,
    fee_pool: u64,
    current_supply: BTreeMap<Id, u64>,
    reward_pool_supply: BTreeMap<Id, u64>,
    current_stakers: DiffStakers,
    pending_stakers: DiffStakers,
    utxos: BTreeMap<UtxoId, Option<Utxo>>,
    reward_utxos: BTreeMap<Id, Vec<Utxo>>,
    supernets: BTreeMap<Id, SupernetRecord>,
    transformations: BTreeMap<Id, SupernetTransformation>,
    chains: BTreeMap<Id, BTreeMap<Id, ChainRecord>>,
    txs: BTreeMap<Id, (StoredTx, TxStatus)>,
}

impl DiffChanges {
    /// Folds every override into `target`. Consumes the changes, so they can
    /// be folded only once.
    pub fn apply(self, target: &mut dyn Chain) -> Result<(), StateError> {
        target.set_timestamp(self.timestamp);
        target.set_fee_pool(self.fee_pool);
        for (supernet_id, supply) in &self.current_supply {
            target.set_current_supply(supernet_id, *supply);
        }
        for (supernet_id, supply) in &self.reward_pool_supply {
            target.set_reward_pool_supply(supernet_id, *supply);
        }
        self.current_stakers.apply(target, Registry::Current);
        self.pending_stakers.apply(target, Registry::Pending);
        for (id, utxo) in self.utxos {
            match utxo {
                Some(utxo) => target.add_utxo(utxo),
                None => target.delete_utxo(&id),
            }
        }
        for (staker_tx_id, utxos) in self.reward_utxos {
            for utxo in utxos {
                target.add_reward_utxo(&staker_tx_id, utxo);
            }
        }
        for supernet in self.supernets.into_values() {
            target.add_supernet(supernet);
        }
        for transformation in self.transformations.into_values() {
            target.add_supernet_transformation(transformation);
        }
        for chain in self.chains.into_values().flat_map(BTreeMap::into_values) {
            target.add_chain(chain);
        }
        for (tx, status) in self.txs.into_values() {
            target.add_tx(tx, status);
        }
        tracing::debug!(target: "state", timestamp = self.timestamp, "applied diff");
        Ok(())
    }
}

/// A ledger layer on top of the state produced by `parent_id`.
///
/// Reads fall through to the parent for anything this layer has not
/// overridden; writes stay local. The parent is looked up through `Versions`
/// on every fall-through and must stay resolvable while the layer lives.
/// Consuming the layer with [`Diff::apply`] or [`Diff::into_changes`] is the
/// only way to get its changes out, which makes it single use.
pub struct Diff<'v> {
    parent_id: Id,
    versions: &'v dyn Versions,
    changes: DiffChanges,
}

impl<'v> Diff<'v> {
    /// Opens an empty layer on top of `parent_id`.
    pub fn new(parent_id: Id, versions: &'v dyn Versions) -> Result<Self, StateError> {
        let parent = versions
            .get_state(&parent_id)
            .ok_or(StateError::MissingParentState(parent_id))?;
        let changes = DiffChanges {
            timestamp: parent.timestamp(),
            fee_pool: parent.fee_pool(),
            ..DiffChanges::default()
        };
        Ok(Self {
            parent_id,
            versions,
            changes,
        })
    }

    /// The id of the block whose state this layer builds on.
    pub fn parent_id(&self) -> Id {
        self.parent_id
    }

    /// Detaches the changes from the parent, ending the layer.
    pub fn into_changes(self) -> DiffChanges {
        self.changes
    }

    /// Folds the changes into `target`, ending the layer.
    ///
    /// When `target` is the parent itself, detach first with
    /// [`Diff::into_changes`] so the parent is no longer borrowed.
    pub fn apply(self, target: &mut dyn Chain) -> Result<(), StateError> {
        self.changes.apply(target)
    }

    fn parent(&self) -> Result<&'v dyn Chain, StateError> {
        self.versions
            .get_state(&self.parent_id)
            .ok_or(StateError::MissingParentState(self.parent_id))
    }
}

impl Chain for Diff<'_> {
    fn timestamp(&self) -> u64 {
        self.changes.timestamp
    }

    fn set_timestamp(&mut self, timestamp: u64) {
        self.changes.timestamp = timestamp;
    }

    fn current_supply(&self, supernet_id: &Id) -> Result<u64, StateError> {
        match self.changes.current_supply.get(supernet_id) {
            Some(supply) => Ok(*supply),
            None => self.parent()?.current_supply(supernet_id),
        }
    }

    fn set_current_supply(&mut self, supernet_id: &Id, supply: u64) {
        self.changes.current_supply.insert(*supernet_id, supply);
    }

    fn reward_pool_supply(&self, supernet_id: &Id) -> Result<u64, StateError> {
        match self.changes.reward_pool_supply.get(supernet_id) {
            Some(supply) => Ok(*supply),
            None => self.parent()?.reward_pool_supply(supernet_id),
        }
    }

    fn set_reward_pool_supply(&mut self, supernet_id: &Id, supply: u64) {
        self.changes.reward_pool_supply.insert(*supernet_id, supply);
    }

    fn fee_pool(&self) -> u64 {
        self.changes.fee_pool
    }

    fn set_fee_pool(&mut self, fee_pool: u64) {
        self.changes.fee_pool = fee_pool;
    }

    fn current_validator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<Option<&Staker>, StateError> {
        match self.changes.current_stakers.get_validator(supernet_id, node_id) {
            Some(local) => Ok(local),
            None => self.parent()?.current_validator(supernet_id, node_id),
        }
    }

    fn put_current_validator(&mut self, staker: Staker) {
        self.changes.current_stakers.put_validator(staker);
    }

    fn delete_current_validator(&mut self, staker: &Staker) {
        self.changes.current_stakers.delete_validator(staker);
    }

    fn current_delegator_iterator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<StakerIterator<'_>, StateError> {
        let parent = self
            .parent()?
            .current_delegator_iterator(supernet_id, node_id)?;
        Ok(self
            .changes
            .current_stakers
            .delegator_iterator(parent, supernet_id, node_id))
    }

    fn put_current_delegator(&mut self, staker: Staker) {
        self.changes.current_stakers.put_delegator(staker);
    }

    fn delete_current_delegator(&mut self, staker: &Staker) {
        self.changes.current_stakers.delete_delegator(staker);
    }

    fn current_staker_iterator(&self) -> Result<StakerIterator<'_>, StateError> {
        let parent = self.parent()?.current_staker_iterator()?;
        Ok(self.changes.current_stakers.staker_iterator(parent))
    }

    fn pending_validator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<Option<&Staker>, StateError> {
        match self.changes.pending_stakers.get_validator(supernet_id, node_id) {
            Some(local) => Ok(local),
            None => self.parent()?.pending_validator(supernet_id, node_id),
        }
    }

    fn put_pending_validator(&mut self, staker: Staker) {
        self.changes.pending_stakers.put_validator(staker);
    }

    fn delete_pending_validator(&mut self, staker: &Staker) {
        self.changes.pending_stakers.delete_validator(staker);
    }

    fn pending_delegator_iterator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<StakerIterator<'_>, StateError> {
        let parent = self
            .parent()?
            .pending_delegator_iterator(supernet_id, node_id)?;
        Ok(self
            .changes
            .pending_stakers
            .delegator_iterator(parent, supernet_id, node_id))
    }

    fn put_pending_delegator(&mut self, staker: Staker) {
        self.changes.pending_stakers.put_delegator(staker);
    }

    fn delete_pending_delegator(&mut self, staker: &Staker) {
        self.changes.pending_stakers.delete_delegator(staker);
    }

    fn pending_staker_iterator(&self) -> Result<StakerIterator<'_>, StateError> {
        let parent = self.parent()?.pending_staker_iterator()?;
        Ok(self.changes.pending_stakers.staker_iterator(parent))
    }

    fn utxo(&self, id: &UtxoId) -> Result<Option<Utxo>, StateError> {
        match self.changes.utxos.get(id) {
            Some(local) => Ok(local.clone()),
            None => self.parent()?.utxo(id),
        }
    }

    fn add_utxo(&mut self, utxo: Utxo) {
        self.changes.utxos.insert(utxo.id, Some(utxo));
    }

    fn delete_utxo(&mut self, id: &UtxoId) {
        self.changes.utxos.insert(*id, None);
    }

    fn reward_utxos(&self, staker_tx_id: &Id) -> Result<Vec<Utxo>, StateError> {
        let mut utxos = self.parent()?.reward_utxos(staker_tx_id)?;
        if let Some(local) = self.changes.reward_utxos.get(staker_tx_id) {
            utxos.extend(local.iter().cloned());
        }
        Ok(utxos)
    }

    fn add_reward_utxo(&mut self, staker_tx_id: &Id, utxo: Utxo) {
        self.changes
            .reward_utxos
            .entry(*staker_tx_id)
            .or_default()
            .push(utxo);
    }

    fn supernet(&self, supernet_id: &Id) -> Result<Option<SupernetRecord>, StateError> {
        match self.changes.supernets.get(supernet_id) {
            Some(local) => Ok(Some(local.clone())),
            None => self.parent()?.supernet(supernet_id),
        }
    }

    fn add_supernet(&mut self, supernet: SupernetRecord) {
        self.changes.supernets.insert(supernet.id, supernet);
    }

    fn supernet_transformation(
        &self,
        supernet_id: &Id,
    ) -> Result<Option<SupernetTransformation>, StateError> {
        match self.changes.transformations.get(supernet_id) {
            Some(local) => Ok(Some(local.clone())),
            None => self.parent()?.supernet_transformation(supernet_id),
        }
    }

    fn add_supernet_transformation(&mut self, transformation: SupernetTransformation) {
        self.changes
            .transformations
            .insert(transformation.supernet_id, transformation);
    }

    fn chains(&self, supernet_id: &Id) -> Result<Vec<ChainRecord>, StateError> {
        let mut chains = self.parent()?.chains(supernet_id)?;
        if let Some(local) = self.changes.chains.get(supernet_id) {
            chains.extend(local.values().cloned());
            chains.sort_by_key(|c| c.id);
        }
        Ok(chains)
    }

    fn add_chain(&mut self, chain: ChainRecord) {
        self.changes
            .chains
            .entry(chain.supernet_id)
            .or_default()
            .insert(chain.id, chain);
    }

    fn tx(&self, tx_id: &Id) -> Result<Option<(StoredTx, TxStatus)>, StateError> {
        match self.changes.txs.get(tx_id) {
            Some(local) => Ok(Some(local.clone())),
            None => self.parent()?.tx(tx_id),
        }
    }

    fn add_tx(&mut self, tx: StoredTx, status: TxStatus) {
        self.changes.txs.insert(tx.id, (tx, status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;
    use pchain_storage::MemoryStore;
    use pchain_types::config::{Genesis, StakingConfig};
    use pchain_types::{Priority, PRIMARY_NETWORK_ID};
    use std::sync::Arc;

    const TIP: Id = Id([7u8; 32]);

    fn genesis_state() -> State {
        let genesis = Genesis {
            timestamp: 1_000,
            initial_supply: 50,
            initial_reward_pool: 10,
            ..Genesis::default()
        };
        State::from_genesis(Arc::new(MemoryStore::new()), &genesis, &StakingConfig::default())
            .unwrap()
    }

    fn current_validator(id: u64) -> Staker {
        Staker {
            tx_id: Id::from_u64(id),
            node_id: NodeId([id as u8; 20]),
            public_key: None,
            supernet_id: PRIMARY_NETWORK_ID,
            weight: 5,
            start_time: 1_000,
            end_time: 2_000,
            potential_reward: 0,
            next_time: 2_000,
            priority: Priority::PrimaryNetworkValidatorCurrent,
        }
    }

    #[test]
    fn test_missing_parent_is_reported() {
        let versions = VersionSet::new();
        let err = Diff::new(TIP, &versions).err().unwrap();
        assert!(matches!(err, StateError::MissingParentState(id) if id == TIP));
    }

    #[test]
    fn test_reads_fall_through_and_writes_stay_local() {
        let state = genesis_state();
        let mut versions = VersionSet::new();
        versions.insert(TIP, &state);

        let mut diff = Diff::new(TIP, &versions).unwrap();
        assert_eq!(diff.timestamp(), 1_000);
        assert_eq!(diff.current_supply(&PRIMARY_NETWORK_ID).unwrap(), 50);

        diff.set_current_supply(&PRIMARY_NETWORK_ID, 100);
        diff.put_current_validator(current_validator(1));
        assert_eq!(diff.current_supply(&PRIMARY_NETWORK_ID).unwrap(), 100);
        assert_eq!(diff.current_staker_iterator().unwrap().count(), 1);

        assert_eq!(state.current_supply(&PRIMARY_NETWORK_ID).unwrap(), 50);
        assert_eq!(state.current_staker_iterator().unwrap().count(), 0);
    }

    #[test]
    fn test_apply_folds_supply_into_base() {
        let mut state = genesis_state();
        let changes = {
            let mut versions = VersionSet::new();
            versions.insert(TIP, &state);
            let mut diff = Diff::new(TIP, &versions).unwrap();
            diff.set_current_supply(&PRIMARY_NETWORK_ID, 100);
            diff.put_current_validator(current_validator(1));
            diff.into_changes()
        };
        changes.apply(&mut state).unwrap();
        assert_eq!(state.current_supply(&PRIMARY_NETWORK_ID).unwrap(), 100);
        assert!(state
            .current_validator(&PRIMARY_NETWORK_ID, &NodeId([1u8; 20]))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_put_then_delete_within_layer_leaves_base_untouched() {
        let mut state = genesis_state();
        let changes = {
            let mut versions = VersionSet::new();
            versions.insert(TIP, &state);
            let mut diff = Diff::new(TIP, &versions).unwrap();
            let v = current_validator(1);
            diff.put_current_validator(v.clone());
            diff.delete_current_validator(&v);
            assert!(diff
                .current_validator(&PRIMARY_NETWORK_ID, &v.node_id)
                .unwrap()
                .is_none());
            diff.into_changes()
        };
        changes.apply(&mut state).unwrap();
        assert_eq!(state.current_staker_iterator().unwrap().count(), 0);
    }

    #[test]
    fn test_layers_stack() {
        let state = genesis_state();
        let mut root_versions = VersionSet::new();
        root_versions.insert(TIP, &state);
        let mut first = Diff::new(TIP, &root_versions).unwrap();
        first.put_current_validator(current_validator(1));
        first.set_timestamp(1_500);

        let child_id = Id([8u8; 32]);
        let mut child_versions = VersionSet::new();
        child_versions.insert(child_id, &first);
        let mut second = Diff::new(child_id, &child_versions).unwrap();
        assert_eq!(second.timestamp(), 1_500);
        second.delete_current_validator(&current_validator(1));
        second.put_current_validator(current_validator(2));

        let ids: Vec<Id> = second
            .current_staker_iterator()
            .unwrap()
            .map(|s| s.tx_id)
            .collect();
        assert_eq!(ids, vec![Id::from_u64(2)]);
        assert_eq!(first.current_staker_iterator().unwrap().count(), 1);
    }

    fn pending_delegator(id: u64, node: u8) -> Staker {
        Staker {
            tx_id: Id::from_u64(id),
            node_id: NodeId([node; 20]),
            public_key: None,
            supernet_id: PRIMARY_NETWORK_ID,
            weight: 2,
            start_time: 1_200,
            end_time: 1_800,
            potential_reward: 0,
            next_time: 1_200,
            priority: Priority::PrimaryNetworkDelegatorPending,
        }
    }

    #[test]
    fn test_child_folds_into_parent_layer_then_base() {
        let mut state = genesis_state();
        let validator = current_validator(1);
        state.put_current_validator(validator.clone());
        let delegator = pending_delegator(3, 1);
        let promoted = delegator.promoted(0);

        let parent_changes = {
            let mut root_versions = VersionSet::new();
            root_versions.insert(TIP, &state);
            let mut parent = Diff::new(TIP, &root_versions).unwrap();
            parent.put_pending_delegator(delegator.clone());

            let child_changes = {
                let child_id = Id([8u8; 32]);
                let mut child_versions = VersionSet::new();
                child_versions.insert(child_id, &parent);
                let mut child = Diff::new(child_id, &child_versions).unwrap();
                child.delete_pending_delegator(&delegator);
                child.put_current_delegator(promoted.clone());
                child.delete_current_validator(&validator);
                child.into_changes()
            };
            child_changes.apply(&mut parent).unwrap();

            // The parent's own pending addition is cancelled, not masked.
            assert_eq!(parent.pending_staker_iterator().unwrap().count(), 0);
            assert!(parent
                .current_validator(&PRIMARY_NETWORK_ID, &validator.node_id)
                .unwrap()
                .is_none());
            parent.into_changes()
        };
        parent_changes.apply(&mut state).unwrap();

        assert_eq!(state.pending_staker_iterator().unwrap().count(), 0);
        let current: Vec<Id> = state
            .current_staker_iterator()
            .unwrap()
            .map(|s| s.tx_id)
            .collect();
        assert_eq!(current, vec![promoted.tx_id]);
        assert!(state
            .current_validator(&PRIMARY_NETWORK_ID, &validator.node_id)
            .unwrap()
            .is_none());
        let delegators: Vec<Id> = state
            .current_delegator_iterator(&PRIMARY_NETWORK_ID, &validator.node_id)
            .unwrap()
            .map(|s| s.tx_id)
            .collect();
        assert_eq!(delegators, vec![promoted.tx_id]);
    }

    #[test]
    fn test_dropped_parent_surfaces_on_read() {
        let state = genesis_state();
        let mut versions = VersionSet::new();
        versions.insert(TIP, &state);
        let diff = Diff::new(TIP, &versions).unwrap();
        // A diff keeps working only while its parent is resolvable.
        let detached = Diff {
            parent_id: Id([9u8; 32]),
            versions: &versions,
            changes: diff.into_changes(),
        };
        assert!(matches!(
            detached.current_supply(&PRIMARY_NETWORK_ID),
            Err(StateError::MissingParentState(_))
        ));
    }
}
