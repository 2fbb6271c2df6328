// Path: crates/state/src/stakers/diff.rs
use super::{DiffStatus, NodeMap, ValidatorDiff};
use pchain_api::state::{Chain, DeletedStakers, StakerIterator, StakerTree};
use pchain_types::{Id, NodeId, Staker};

/// Which registry of a `Chain` a `DiffStakers` is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registry {
    /// The current staker set.
    Current,
    /// The pending staker set.
    Pending,
}

/// The staker changes of one state layer, kept in memory only.
///
/// Reads combine this layer's changes with an iterator or lookup result the
/// caller resolved from the parent layer.
#[derive(Debug, Default, Clone)]
pub struct DiffStakers {
    validator_diffs: NodeMap<ValidatorDiff>,
    added_stakers: StakerTree,
    deleted_stakers: DeletedStakers,
}

impl DiffStakers {
    /// This layer's view of the validator slot of `node_id` on `supernet_id`.
    ///
    /// `None` means the layer did not touch the slot and the parent decides.
    /// `Some(None)` means the layer deleted the validator, `Some(Some(_))`
    /// that it added one.
    pub fn get_validator(&self, supernet_id: &Id, node_id: &NodeId) -> Option<Option<&Staker>> {
        let diff = self.validator_diffs.get(supernet_id)?.get(node_id)?;
        match diff.status {
            DiffStatus::Unmodified => None,
            DiffStatus::Added => Some(diff.validator.as_ref()),
            DiffStatus::Deleted => Some(None),
        }
    }

    /// Adds a validator in this layer.
    pub fn put_validator(&mut self, staker: Staker) {
        let key = staker.key();
        if let Some(replaced) = self.diff(&staker).put_validator(staker.clone()) {
            self.added_stakers.remove(&replaced.key());
        }
        self.added_stakers.insert(key, staker);
    }

    /// Deletes a validator in this layer. Deleting a validator added by this
    /// same layer cancels the addition.
    pub fn delete_validator(&mut self, staker: &Staker) {
        self.diff(staker).delete_validator(staker);
        self.forget(staker);
        self.prune(staker);
    }

    /// This layer's view of the delegators of `node_id` on `supernet_id`,
    /// given the parent's view.
    pub fn delegator_iterator<'a>(
        &'a self,
        parent: StakerIterator<'a>,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> StakerIterator<'a> {
        match self
            .validator_diffs
            .get(supernet_id)
            .and_then(|nodes| nodes.get(node_id))
        {
            Some(diff) => StakerIterator::merge(
                StakerIterator::mask(parent, &diff.deleted_delegators),
                StakerIterator::tree(&diff.added_delegators),
            ),
            None => parent,
        }
    }

    /// Adds a delegator in this layer.
    pub fn put_delegator(&mut self, staker: Staker) {
        let restored = self.diff(&staker).put_delegator(staker.clone());
        if restored {
            self.deleted_stakers.remove(&staker.tx_id);
        } else {
            self.added_stakers.insert(staker.key(), staker.clone());
        }
        self.prune(&staker);
    }

    /// Deletes a delegator in this layer. Deleting a delegator added by this
    /// same layer cancels the addition.
    pub fn delete_delegator(&mut self, staker: &Staker) {
        self.diff(staker).delete_delegator(staker);
        self.forget(staker);
        self.prune(staker);
    }

    /// This layer's view of the whole set, given the parent's view.
    pub fn staker_iterator<'a>(&'a self, parent: StakerIterator<'a>) -> StakerIterator<'a> {
        StakerIterator::merge(
            StakerIterator::mask(parent, &self.deleted_stakers),
            StakerIterator::tree(&self.added_stakers),
        )
    }

    /// Returns `true` if the layer changed nothing.
    pub fn is_empty(&self) -> bool {
        self.validator_diffs.is_empty()
    }

    /// Folds this layer's changes into `registry` of `target`: every deletion
    /// first, then every addition.
    pub fn apply(self, target: &mut dyn Chain, registry: Registry) {
        for staker in self.deleted_stakers.values() {
            match (registry, staker.priority.is_validator()) {
                (Registry::Current, true) => target.delete_current_validator(staker),
                (Registry::Current, false) => target.delete_current_delegator(staker),
                (Registry::Pending, true) => target.delete_pending_validator(staker),
                (Registry::Pending, false) => target.delete_pending_delegator(staker),
            }
        }
        for diff in self.validator_diffs.into_values().flat_map(|nodes| nodes.into_values()) {
            if diff.status == DiffStatus::Added {
                if let Some(validator) = diff.validator {
                    match registry {
                        Registry::Current => target.put_current_validator(validator),
                        Registry::Pending => target.put_pending_validator(validator),
                    }
                }
            }
            for delegator in diff.added_delegators.into_values() {
                match registry {
                    Registry::Current => target.put_current_delegator(delegator),
                    Registry::Pending => target.put_pending_delegator(delegator),
                }
            }
        }
    }

    /// Drops `staker` from the added set, or marks it deleted if it was not
    /// added by this layer.
    fn forget(&mut self, staker: &Staker) {
        if self.added_stakers.remove(&staker.key()).is_none() {
            self.deleted_stakers.insert(staker.tx_id, staker.clone());
        }
    }

    fn diff(&mut self, staker: &Staker) -> &mut ValidatorDiff {
        self.validator_diffs
            .entry(staker.supernet_id)
            .or_default()
            .entry(staker.node_id)
            .or_default()
    }

    fn prune(&mut self, staker: &Staker) {
        let empty_slot = self
            .validator_diffs
            .get(&staker.supernet_id)
            .and_then(|nodes| nodes.get(&staker.node_id))
            .map_or(false, ValidatorDiff::is_empty);
        if !empty_slot {
            return;
        }
        if let Some(nodes) = self.validator_diffs.get_mut(&staker.supernet_id) {
            nodes.remove(&staker.node_id);
            if nodes.is_empty() {
                self.validator_diffs.remove(&staker.supernet_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stakers::BaseStakers;
    use pchain_types::Priority;

    fn staker(id: u64, next_time: u64, priority: Priority) -> Staker {
        Staker {
            tx_id: Id::from_u64(id),
            node_id: NodeId([1u8; 20]),
            public_key: None,
            supernet_id: Id::EMPTY,
            weight: id,
            start_time: next_time.saturating_sub(50),
            end_time: next_time,
            potential_reward: 0,
            next_time,
            priority,
        }
    }

    #[test]
    fn test_put_then_delete_validator_cancels() {
        let mut diff = DiffStakers::default();
        let v = staker(1, 10, Priority::PrimaryNetworkValidatorCurrent);
        diff.put_validator(v.clone());
        assert_eq!(diff.get_validator(&Id::EMPTY, &v.node_id), Some(Some(&v)));

        diff.delete_validator(&v);
        assert_eq!(diff.get_validator(&Id::EMPTY, &v.node_id), None);
        assert!(diff.is_empty());
        assert!(diff.added_stakers.is_empty());
        assert!(diff.deleted_stakers.is_empty());
    }

    #[test]
    fn test_views_compose_with_parent() {
        let mut base = BaseStakers::default();
        let v = staker(1, 100, Priority::PrimaryNetworkValidatorCurrent);
        let d1 = staker(2, 20, Priority::PrimaryNetworkDelegatorCurrent);
        let d2 = staker(3, 40, Priority::PrimaryNetworkDelegatorCurrent);
        base.put_validator(v.clone());
        base.put_delegator(d1.clone());
        base.put_delegator(d2.clone());

        let mut diff = DiffStakers::default();
        let d3 = staker(4, 30, Priority::PrimaryNetworkDelegatorCurrent);
        diff.delete_delegator(&d1);
        diff.put_delegator(d3.clone());

        let ids: Vec<Id> = diff
            .delegator_iterator(base.delegator_iterator(&Id::EMPTY, &v.node_id), &Id::EMPTY, &v.node_id)
            .map(|s| s.tx_id)
            .collect();
        assert_eq!(ids, vec![d3.tx_id, d2.tx_id]);

        let all: Vec<Id> = diff
            .staker_iterator(base.staker_iterator())
            .map(|s| s.tx_id)
            .collect();
        assert_eq!(all, vec![d3.tx_id, d2.tx_id, v.tx_id]);
        assert_eq!(diff.get_validator(&Id::EMPTY, &v.node_id), None);
    }

    #[test]
    fn test_deleted_validator_hides_parent() {
        let mut diff = DiffStakers::default();
        let v = staker(1, 10, Priority::PrimaryNetworkValidatorCurrent);
        diff.delete_validator(&v);
        assert_eq!(diff.get_validator(&Id::EMPTY, &v.node_id), Some(None));
        let mut base = BaseStakers::default();
        base.put_validator(v);
        assert_eq!(diff.staker_iterator(base.staker_iterator()).count(), 0);
    }
}
