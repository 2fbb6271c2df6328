// Path: crates/state/tests/staking_lifecycle.rs
//! A delegator's full life on a durable store: added through a layer,
//! promoted, rewarded, and still visible in historical validator sets after
//! the database is reopened.

use pchain_api::state::Chain;
use pchain_api::storage::KvStore;
use pchain_state::{
    advance_time_to, apply_staker_tx, next_staker_change_time, reward_staker, validator_set,
    validator_set_at, ConfiguredRewards, Diff, State, VersionSet,
};
use pchain_storage::{MemoryStore, RedbStore};
use pchain_types::config::{Genesis, StakingConfig};
use pchain_types::ledger::{StoredTx, TxBody, TxStatus};
use pchain_types::{Id, NodeId, StakerKind, StakerTx, PRIMARY_NETWORK_ID};
use std::sync::Arc;

const T0: u64 = 1_000;
const DAY: u64 = 24 * 3600;
const NODE: NodeId = NodeId([1u8; 20]);

fn genesis() -> Genesis {
    Genesis {
        timestamp: T0,
        initial_supply: 10_000_000,
        initial_reward_pool: 1_000_000,
        validators: vec![StakerTx {
            tx_id: Id::from_u64(1),
            kind: StakerKind::PrimaryValidator,
            node_id: NODE,
            supernet_id: PRIMARY_NETWORK_ID,
            public_key: Some(vec![7, 7]),
            weight: 3_000,
            start_time: T0,
            end_time: T0 + 30 * DAY,
            reward_owner: Id::from_u64(11),
        }],
        ..Genesis::default()
    }
}

fn delegation() -> StakerTx {
    StakerTx {
        tx_id: Id::from_u64(2),
        kind: StakerKind::PrimaryDelegator,
        node_id: NODE,
        supernet_id: PRIMARY_NETWORK_ID,
        public_key: None,
        weight: 500,
        start_time: T0 + DAY,
        end_time: T0 + 16 * DAY,
        reward_owner: Id::from_u64(22),
    }
}

/// Runs `f` in a layer over `state`, folds the layer back and commits.
fn block(state: &mut State, f: impl FnOnce(&mut Diff<'_>)) {
    let tip = Id::from_u64(state.height());
    let changes = {
        let mut versions = VersionSet::new();
        versions.insert(tip, &*state);
        let mut diff = Diff::new(tip, &versions).unwrap();
        f(&mut diff);
        diff.into_changes()
    };
    changes.apply(state).unwrap();
    let next = state.height() + 1;
    state.commit(next).unwrap();
}

fn advance(state: &mut State, to: u64) {
    let rewards = ConfiguredRewards::new(StakingConfig::default().reward);
    block(state, |diff| {
        assert!(next_staker_change_time(&*diff).unwrap().unwrap() >= to);
        advance_time_to(&*diff, &rewards, to).unwrap().apply(diff);
    });
}

fn weight_of(entries: &[pchain_types::ledger::ValidatorEntry]) -> u64 {
    entries.iter().map(|e| e.weight).sum()
}

fn run_lifecycle(store: Arc<dyn KvStore>) -> State {
    let mut state = State::from_genesis(store, &genesis(), &StakingConfig::default()).unwrap();

    block(&mut state, |diff| {
        let tx = delegation();
        let stored = StoredTx {
            id: tx.tx_id,
            body: TxBody::AddStaker(tx),
        };
        apply_staker_tx(diff, &stored, &StakingConfig::default()).unwrap();
    });
    assert_eq!(weight_of(&validator_set(&state, &PRIMARY_NETWORK_ID).unwrap()), 3_000);

    advance(&mut state, T0 + DAY);
    assert_eq!(weight_of(&validator_set(&state, &PRIMARY_NETWORK_ID).unwrap()), 3_500);

    advance(&mut state, T0 + 16 * DAY);
    block(&mut state, |diff| {
        reward_staker(diff, &Id::from_u64(2), true).unwrap();
    });
    assert_eq!(state.height(), 4);
    state
}

fn assert_history(state: &State) {
    let at = |h| weight_of(&validator_set_at(state, &PRIMARY_NETWORK_ID, h).unwrap());
    assert_eq!(at(0), 3_000);
    assert_eq!(at(1), 3_000);
    assert_eq!(at(2), 3_500);
    assert_eq!(at(3), 3_500);
    assert_eq!(at(4), 3_000);

    let paid = state.reward_utxos(&Id::from_u64(2)).unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].owner, Id::from_u64(22));
    assert_eq!(state.utxo(&paid[0].id).unwrap(), Some(paid[0].clone()));

    let (_, status) = state.tx(&Id::from_u64(2)).unwrap().unwrap();
    assert_eq!(status, TxStatus::Committed);
}

#[test]
fn test_lifecycle_on_memory_store() {
    let state = run_lifecycle(Arc::new(MemoryStore::new()));
    assert_history(&state);
}

#[test]
fn test_lifecycle_survives_reopening_redb() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.redb");
    {
        let state = run_lifecycle(Arc::new(RedbStore::open(&path).unwrap()));
        assert_history(&state);
    }

    let reopened = State::load(Arc::new(RedbStore::open(&path).unwrap())).unwrap();
    assert_eq!(reopened.height(), 4);
    assert_eq!(reopened.timestamp(), T0 + 16 * DAY);
    assert!(reopened.pending_staker_iterator().unwrap().next().is_none());
    let current: Vec<Id> = reopened
        .current_staker_iterator()
        .unwrap()
        .map(|s| s.tx_id)
        .collect();
    assert_eq!(current, vec![Id::from_u64(1)]);
    assert_history(&reopened);
}
