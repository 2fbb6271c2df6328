// Path: crates/state/src/stakers/base.rs
use super::{NodeMap, ValidatorDiff};
use pchain_api::state::{StakerIterator, StakerTree};
use pchain_types::{Id, NodeId, Staker};
use std::collections::btree_map::Entry;

#[derive(Debug, Default, Clone)]
struct BaseStaker {
    validator: Option<Staker>,
    delegators: StakerTree,
}

impl BaseStaker {
    fn is_empty(&self) -> bool {
        self.validator.is_none() && self.delegators.is_empty()
    }
}

/// The committed staker set, plus a record of what changed since the last
/// flush.
///
/// Entries for a `(supernet, node)` pair are dropped once they hold neither a
/// validator nor delegators, so memory tracks the live set only. Mutators
/// trust the caller: `put_*` expects an absent staker and `delete_*` a
/// present one.
#[derive(Debug, Default, Clone)]
pub struct BaseStakers {
    validators: NodeMap<BaseStaker>,
    stakers: StakerTree,
    validator_diffs: NodeMap<ValidatorDiff>,
}

impl BaseStakers {
    /// The validator of `node_id` on `supernet_id`.
    pub fn get_validator(&self, supernet_id: &Id, node_id: &NodeId) -> Option<&Staker> {
        self.validators.get(supernet_id)?.get(node_id)?.validator.as_ref()
    }

    /// Adds a validator. A validator already in the slot is replaced and
    /// dropped from the flat index.
    pub fn put_validator(&mut self, staker: Staker) {
        if let Some(replaced) = self.entry(&staker).validator.replace(staker.clone()) {
            self.stakers.remove(&replaced.key());
        }
        self.stakers.insert(staker.key(), staker.clone());
        self.diff(&staker).put_validator(staker);
    }

    /// Removes a validator.
    pub fn delete_validator(&mut self, staker: &Staker) {
        self.update_existing(staker, |entry| entry.validator = None);
        self.stakers.remove(&staker.key());
        self.diff(staker).delete_validator(staker);
        self.prune_diff(staker);
    }

    /// The delegators of `node_id` on `supernet_id`, in staker order.
    pub fn delegator_iterator(&self, supernet_id: &Id, node_id: &NodeId) -> StakerIterator<'_> {
        self.validators
            .get(supernet_id)
            .and_then(|nodes| nodes.get(node_id))
            .map_or(StakerIterator::Empty, |entry| {
                StakerIterator::tree(&entry.delegators)
            })
    }

    /// Adds a delegator.
    pub fn put_delegator(&mut self, staker: Staker) {
        self.entry(&staker)
            .delegators
            .insert(staker.key(), staker.clone());
        self.stakers.insert(staker.key(), staker.clone());
        self.diff(&staker).put_delegator(staker.clone());
        self.prune_diff(&staker);
    }

    /// Removes a delegator.
    pub fn delete_delegator(&mut self, staker: &Staker) {
        let key = staker.key();
        self.update_existing(staker, |entry| {
            entry.delegators.remove(&key);
        });
        self.stakers.remove(&key);
        self.diff(staker).delete_delegator(staker);
        self.prune_diff(staker);
    }

    /// Every staker, in staker order.
    pub fn staker_iterator(&self) -> StakerIterator<'_> {
        StakerIterator::tree(&self.stakers)
    }

    /// Number of stakers in the set.
    pub fn len(&self) -> usize {
        self.stakers.len()
    }

    /// Returns `true` if the set holds no staker.
    pub fn is_empty(&self) -> bool {
        self.stakers.is_empty()
    }

    /// Returns `true` if anything changed since the last flush.
    pub fn has_changes(&self) -> bool {
        !self.validator_diffs.is_empty()
    }

    /// The changes recorded since the last flush, by supernet then node.
    pub fn diffs(&self) -> &NodeMap<ValidatorDiff> {
        &self.validator_diffs
    }

    /// Forgets the recorded changes once they are flushed.
    pub fn clear_diffs(&mut self) {
        self.validator_diffs.clear();
    }

    fn entry(&mut self, staker: &Staker) -> &mut BaseStaker {
        self.validators
            .entry(staker.supernet_id)
            .or_default()
            .entry(staker.node_id)
            .or_default()
    }

    fn update_existing(&mut self, staker: &Staker, update: impl FnOnce(&mut BaseStaker)) {
        let Entry::Occupied(mut nodes) = self.validators.entry(staker.supernet_id) else {
            return;
        };
        if let Entry::Occupied(mut slot) = nodes.get_mut().entry(staker.node_id) {
            update(slot.get_mut());
            if slot.get().is_empty() {
                slot.remove();
            }
        }
        if nodes.get().is_empty() {
            nodes.remove();
        }
    }

    fn diff(&mut self, staker: &Staker) -> &mut ValidatorDiff {
        self.validator_diffs
            .entry(staker.supernet_id)
            .or_default()
            .entry(staker.node_id)
            .or_default()
    }

    fn prune_diff(&mut self, staker: &Staker) {
        let Entry::Occupied(mut nodes) = self.validator_diffs.entry(staker.supernet_id) else {
            return;
        };
        if let Entry::Occupied(slot) = nodes.get_mut().entry(staker.node_id) {
            if slot.get().is_empty() {
                slot.remove();
            }
        }
        if nodes.get().is_empty() {
            nodes.remove();
        }
    }
}
