// Path: crates/state/src/stakers/mod.rs
//! Staker registries.
//!
//! `BaseStakers` is the committed projection of one staker set (current or
//! pending). `DiffStakers` records what one layer changed on top of its
//! parent. Both index validators by `(supernet, node)` and keep every staker
//! in one flat `StakerTree` for whole-set iteration.

mod base;
mod diff;

pub use base::BaseStakers;
pub use diff::{DiffStakers, Registry};

use pchain_api::state::{DeletedStakers, StakerTree};
use pchain_types::{Id, NodeId, Staker};
use std::collections::BTreeMap;

/// Per-supernet, per-node map used for validator indexes and diff maps.
pub type NodeMap<T> = BTreeMap<Id, BTreeMap<NodeId, T>>;

/// What happened to a validator slot within one diff.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    /// The validator is as the parent has it.
    #[default]
    Unmodified,
    /// A validator was added (possibly replacing a deleted one).
    Added,
    /// The parent's validator was deleted.
    Deleted,
}

/// The changes to one `(supernet, node)` slot within one diff.
#[derive(Debug, Default, Clone)]
pub struct ValidatorDiff {
    /// What happened to the validator.
    pub status: DiffStatus,
    /// The added validator when `Added`, the deleted one when `Deleted`.
    pub validator: Option<Staker>,
    /// A parent validator deleted before `validator` was added in its place.
    pub superseded: Option<Staker>,
    /// Delegators added in this diff.
    pub added_delegators: StakerTree,
    /// Parent delegators deleted in this diff.
    pub deleted_delegators: DeletedStakers,
}

impl ValidatorDiff {
    /// Records the addition of a validator.
    ///
    /// Re-adding over an earlier addition replaces it and returns the
    /// replaced staker so the caller can drop it from its flat index.
    pub fn put_validator(&mut self, staker: Staker) -> Option<Staker> {
        let replaced = match self.status {
            DiffStatus::Deleted => {
                self.superseded = self.validator.take();
                None
            }
            DiffStatus::Added => self.validator.take(),
            DiffStatus::Unmodified => None,
        };
        self.status = DiffStatus::Added;
        self.validator = Some(staker);
        replaced
    }

    /// Records the deletion of a validator. Deleting a validator added in
    /// this diff cancels the addition. Returns `true` if it did.
    pub fn delete_validator(&mut self, staker: &Staker) -> bool {
        if self.status == DiffStatus::Added {
            match self.superseded.take() {
                Some(previous) => {
                    self.status = DiffStatus::Deleted;
                    self.validator = Some(previous);
                }
                None => {
                    self.status = DiffStatus::Unmodified;
                    self.validator = None;
                }
            }
            return true;
        }
        self.status = DiffStatus::Deleted;
        self.validator = Some(staker.clone());
        false
    }

    /// Records the addition of a delegator. Re-adding a delegator deleted in
    /// this diff cancels the deletion. Returns `true` if it did.
    pub fn put_delegator(&mut self, staker: Staker) -> bool {
        if self.deleted_delegators.remove(&staker.tx_id).is_some() {
            return true;
        }
        self.added_delegators.insert(staker.key(), staker);
        false
    }

    /// Records the deletion of a delegator. Deleting a delegator added in
    /// this diff cancels the addition. Returns `true` if it did.
    pub fn delete_delegator(&mut self, staker: &Staker) -> bool {
        if self.added_delegators.remove(&staker.key()).is_some() {
            return true;
        }
        self.deleted_delegators.insert(staker.tx_id, staker.clone());
        false
    }

    /// Returns `true` if the diff records nothing.
    pub fn is_empty(&self) -> bool {
        self.status == DiffStatus::Unmodified
            && self.added_delegators.is_empty()
            && self.deleted_delegators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pchain_types::Priority;

    fn validator(id: u64) -> Staker {
        Staker {
            tx_id: Id::from_u64(id),
            node_id: NodeId([1u8; 20]),
            public_key: None,
            supernet_id: Id::EMPTY,
            weight: 10,
            start_time: 0,
            end_time: 100,
            potential_reward: 0,
            next_time: 100,
            priority: Priority::PrimaryNetworkValidatorCurrent,
        }
    }

    #[test]
    fn test_put_then_delete_leaves_no_record() {
        let mut diff = ValidatorDiff::default();
        diff.put_validator(validator(1));
        assert!(diff.delete_validator(&validator(1)));
        assert_eq!(diff.status, DiffStatus::Unmodified);
        assert!(diff.validator.is_none());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_delete_put_delete_restores_parent_deletion() {
        let mut diff = ValidatorDiff::default();
        assert!(!diff.delete_validator(&validator(1)));
        diff.put_validator(validator(2));
        assert_eq!(diff.status, DiffStatus::Added);
        assert_eq!(diff.superseded.as_ref().map(|s| s.tx_id), Some(Id::from_u64(1)));

        assert!(diff.delete_validator(&validator(2)));
        assert_eq!(diff.status, DiffStatus::Deleted);
        assert_eq!(diff.validator.as_ref().map(|s| s.tx_id), Some(Id::from_u64(1)));
        assert!(diff.superseded.is_none());
    }

    #[test]
    fn test_double_put_replaces_the_addition() {
        let mut diff = ValidatorDiff::default();
        assert!(diff.put_validator(validator(1)).is_none());
        let replaced = diff.put_validator(validator(2));
        assert_eq!(replaced.map(|s| s.tx_id), Some(Id::from_u64(1)));
        assert_eq!(diff.validator.as_ref().map(|s| s.tx_id), Some(Id::from_u64(2)));
    }

    #[test]
    fn test_delegator_add_and_delete_cancel() {
        let mut diff = ValidatorDiff::default();
        let mut d = validator(5);
        d.priority = Priority::PrimaryNetworkDelegatorCurrent;
        assert!(!diff.put_delegator(d.clone()));
        assert!(diff.delete_delegator(&d));
        assert!(diff.is_empty());

        assert!(!diff.delete_delegator(&d));
        assert!(diff.put_delegator(d));
        assert!(diff.is_empty());
    }
}
