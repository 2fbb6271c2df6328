// Path: crates/api/src/state/iterator.rs

//! Lazy, forward-only staker sequences.
//!
//! Every staker set is ordered by `StakerKey` (next time, priority, tx id).
//! A layer never materializes its view of a set: it composes the parent's
//! iterator with its own additions (`merge`) and deletions (`mask`). Sequences
//! borrow from the registries they walk and release nothing but memory, so
//! dropping one early is always fine.

use pchain_types::{Id, Staker, StakerKey};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// An ordered staker set.
pub type StakerTree = BTreeMap<StakerKey, Staker>;

/// Stakers removed within a layer, by tx id.
pub type DeletedStakers = BTreeMap<Id, Staker>;

/// A lazy sequence of stakers in `StakerKey` order.
pub enum StakerIterator<'a> {
    /// Yields nothing.
    Empty,
    /// Walks an ordered set.
    Tree(btree_map::Values<'a, StakerKey, Staker>),
    /// Union of two ordered sequences.
    Merged(Box<MergedStakers<'a>>),
    /// An ordered sequence with some tx ids suppressed.
    Masked(Box<MaskedStakers<'a>>),
}

impl<'a> StakerIterator<'a> {
    /// Walks `tree` in key order.
    pub fn tree(tree: &'a StakerTree) -> Self {
        if tree.is_empty() {
            Self::Empty
        } else {
            Self::Tree(tree.values())
        }
    }

    /// Yields the ordered union of `first` and `second`. On equal keys the
    /// staker from `first` comes out first.
    pub fn merge(first: Self, second: Self) -> Self {
        match (first, second) {
            (Self::Empty, other) | (other, Self::Empty) => other,
            (first, second) => Self::Merged(Box::new(MergedStakers {
                first,
                second,
                first_head: None,
                second_head: None,
            })),
        }
    }

    /// Yields `source` without the stakers whose tx id is in `deleted`.
    pub fn mask(source: Self, deleted: &'a DeletedStakers) -> Self {
        if deleted.is_empty() || matches!(source, Self::Empty) {
            return source;
        }
        Self::Masked(Box::new(MaskedStakers { source, deleted }))
    }
}

impl<'a> Iterator for StakerIterator<'a> {
    type Item = &'a Staker;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Empty => None,
            Self::Tree(values) => values.next(),
            Self::Merged(merged) => merged.next(),
            Self::Masked(masked) => masked.next(),
        }
    }
}

/// Two-pointer merge of two ordered staker sequences.
///
/// Holds its own lookahead instead of `Peekable` so the sequence stays
/// covariant in `'a`: a layer can merge a longer-lived parent sequence with
/// its own additions.
pub struct MergedStakers<'a> {
    first: StakerIterator<'a>,
    second: StakerIterator<'a>,
    first_head: Option<&'a Staker>,
    second_head: Option<&'a Staker>,
}

impl<'a> Iterator for MergedStakers<'a> {
    type Item = &'a Staker;

    fn next(&mut self) -> Option<Self::Item> {
        if self.first_head.is_none() {
            self.first_head = self.first.next();
        }
        if self.second_head.is_none() {
            self.second_head = self.second.next();
        }
        let take_second = match (self.first_head, self.second_head) {
            (Some(a), Some(b)) => b.key() < a.key(),
            (Some(_), None) => false,
            (None, _) => true,
        };
        if take_second {
            self.second_head.take()
        } else {
            self.first_head.take()
        }
    }
}

/// An ordered staker sequence filtered of deleted tx ids.
pub struct MaskedStakers<'a> {
    source: StakerIterator<'a>,
    deleted: &'a DeletedStakers,
}

impl<'a> Iterator for MaskedStakers<'a> {
    type Item = &'a Staker;

    fn next(&mut self) -> Option<Self::Item> {
        let deleted = self.deleted;
        self.source.find(|s| !deleted.contains_key(&s.tx_id))
    }
}

#[derive(Clone, Copy)]
enum EventSource {
    Current,
    Pending,
    Ending,
}

/// Every future weight change of a staker set, in time order.
///
/// Fed with the current and the pending stakers of one validator (typically
/// its delegators), it yields `(staker, true)` when a pending staker starts
/// and `(staker, false)` when a current or pending staker ends. Events are
/// ordered by time, then priority, then tx id. An end event uses the
/// staker's current-phase priority, so at equal times starts come before
/// ends, and a running maximum over the events is never an underestimate.
pub struct StakerDiffIterator<'a> {
    current: StakerIterator<'a>,
    pending: StakerIterator<'a>,
    current_head: Option<&'a Staker>,
    pending_head: Option<&'a Staker>,
    ending: BTreeMap<StakerKey, &'a Staker>,
}

impl<'a> StakerDiffIterator<'a> {
    /// Interleaves the events of `current` and `pending`.
    pub fn new(current: StakerIterator<'a>, pending: StakerIterator<'a>) -> Self {
        Self {
            current,
            pending,
            current_head: None,
            pending_head: None,
            ending: BTreeMap::new(),
        }
    }

    fn end_key(staker: &Staker) -> StakerKey {
        StakerKey {
            next_time: staker.end_time,
            priority: staker.priority.to_current(),
            tx_id: staker.tx_id,
        }
    }
}

impl<'a> Iterator for StakerDiffIterator<'a> {
    type Item = (&'a Staker, bool);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_head.is_none() {
            self.current_head = self.current.next();
        }
        if self.pending_head.is_none() {
            self.pending_head = self.pending.next();
        }

        let mut best: Option<(StakerKey, EventSource)> = None;
        let candidates = [
            self.current_head.map(|s| (s.key(), EventSource::Current)),
            self.pending_head.map(|s| (s.key(), EventSource::Pending)),
            self.ending
                .first_key_value()
                .map(|(k, _)| (*k, EventSource::Ending)),
        ];
        for (key, source) in candidates.into_iter().flatten() {
            if best.map_or(true, |(b, _)| key < b) {
                best = Some((key, source));
            }
        }

        match best?.1 {
            EventSource::Current => self.current_head.take().map(|s| (s, false)),
            EventSource::Pending => {
                let staker = self.pending_head.take()?;
                self.ending.insert(Self::end_key(staker), staker);
                Some((staker, true))
            }
            EventSource::Ending => self.ending.pop_first().map(|(_, s)| (s, false)),
        }
    }
}
