// Path: crates/state/src/validators.rs
//! Validator-set projection, current and historical.

use crate::state::State;
use pchain_api::state::Chain;
use pchain_types::codec::from_bytes_canonical;
use pchain_types::error::{checked_add, checked_sub, StateError};
use pchain_types::keys::{
    id_key, parse_validator_diff_key, validator_diff_scan_start, PUBLIC_KEY_DIFF_PREFIX,
    WEIGHT_DIFF_PREFIX,
};
use pchain_types::ledger::{ValidatorEntry, ValidatorWeightDiff};
use pchain_types::{Id, NodeId};
use std::collections::BTreeMap;

/// The current validators of `supernet_id`, ordered by node id. Each weight
/// is the validator's own stake plus that of its current delegators.
pub fn validator_set(chain: &dyn Chain, supernet_id: &Id) -> Result<Vec<ValidatorEntry>, StateError> {
    let mut set = BTreeMap::new();
    for staker in chain.current_staker_iterator()? {
        if staker.supernet_id != *supernet_id || !staker.priority.is_validator() {
            continue;
        }
        let mut weight = staker.weight;
        for delegator in chain.current_delegator_iterator(supernet_id, &staker.node_id)? {
            weight = checked_add(weight, delegator.weight, "validator weight")?;
        }
        set.insert(
            staker.node_id,
            ValidatorEntry {
                node_id: staker.node_id,
                weight,
                public_key: staker.public_key.clone(),
            },
        );
    }
    Ok(set.into_values().collect())
}

/// The validators of `supernet_id` as they were after committing `height`.
///
/// Starts from the last committed set and undoes the persisted weight and
/// public-key diffs of every later height, newest first.
pub fn validator_set_at(
    state: &State,
    supernet_id: &Id,
    height: u64,
) -> Result<Vec<ValidatorEntry>, StateError> {
    if state.has_uncommitted_changes() {
        return Err(StateError::InvariantViolation(
            "historical validator sets need a fully committed state".into(),
        ));
    }
    let tip = state.height();
    if height > tip {
        return Err(StateError::InvariantViolation(format!(
            "height {height} is above the last committed height {tip}"
        )));
    }

    let mut set: BTreeMap<NodeId, (u64, Option<Vec<u8>>)> = validator_set(state, supernet_id)?
        .into_iter()
        .map(|e| (e.node_id, (e.weight, e.public_key)))
        .collect();
    if height == tip {
        return Ok(into_entries(set));
    }

    let store = state.store();
    let prefix = id_key(WEIGHT_DIFF_PREFIX, supernet_id);
    let start = validator_diff_scan_start(WEIGHT_DIFF_PREFIX, supernet_id, tip);
    for (key, value) in store.scan_prefix_from(&prefix, &start)? {
        let (_, diff_height, node_id) = parse_validator_diff_key(WEIGHT_DIFF_PREFIX, &key)?;
        if diff_height <= height {
            break;
        }
        let diff: ValidatorWeightDiff = from_bytes_canonical(&value, "weight diff")?;
        let entry = set.entry(node_id).or_insert((0, None));
        entry.0 = if diff.decrease {
            checked_add(entry.0, diff.amount, "historical weight")?
        } else {
            checked_sub(entry.0, diff.amount, "historical weight")?
        };
        if entry.0 == 0 {
            set.remove(&node_id);
        }
    }

    let prefix = id_key(PUBLIC_KEY_DIFF_PREFIX, supernet_id);
    let start = validator_diff_scan_start(PUBLIC_KEY_DIFF_PREFIX, supernet_id, tip);
    for (key, value) in store.scan_prefix_from(&prefix, &start)? {
        let (_, diff_height, node_id) = parse_validator_diff_key(PUBLIC_KEY_DIFF_PREFIX, &key)?;
        if diff_height <= height {
            break;
        }
        let previous: Option<Vec<u8>> = from_bytes_canonical(&value, "public key diff")?;
        if let Some(entry) = set.get_mut(&node_id) {
            entry.1 = previous;
        }
    }

    Ok(into_entries(set))
}

fn into_entries(set: BTreeMap<NodeId, (u64, Option<Vec<u8>>)>) -> Vec<ValidatorEntry> {
    set.into_iter()
        .map(|(node_id, (weight, public_key))| ValidatorEntry {
            node_id,
            weight,
            public_key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pchain_storage::MemoryStore;
    use pchain_types::config::{Genesis, StakingConfig};
    use pchain_types::{Priority, Staker, StakerKind, StakerTx, PRIMARY_NETWORK_ID};
    use std::sync::Arc;

    fn validator_tx(id: u64, weight: u64) -> StakerTx {
        StakerTx {
            tx_id: Id::from_u64(id),
            kind: StakerKind::PrimaryValidator,
            node_id: NodeId([id as u8; 20]),
            supernet_id: PRIMARY_NETWORK_ID,
            public_key: Some(vec![id as u8]),
            weight,
            start_time: 1_000,
            end_time: 1_000 + 30 * 24 * 3600,
            reward_owner: Id::from_u64(id),
        }
    }

    fn state() -> State {
        let genesis = Genesis {
            timestamp: 1_000,
            initial_supply: 1_000_000,
            initial_reward_pool: 1_000_000,
            validators: vec![validator_tx(2, 3_000), validator_tx(1, 2_000)],
            ..Genesis::default()
        };
        State::from_genesis(Arc::new(MemoryStore::new()), &genesis, &StakingConfig::default())
            .unwrap()
    }

    fn delegator(id: u64, node: u8, weight: u64) -> Staker {
        Staker {
            tx_id: Id::from_u64(id),
            node_id: NodeId([node; 20]),
            public_key: None,
            supernet_id: PRIMARY_NETWORK_ID,
            weight,
            start_time: 1_000,
            end_time: 5_000,
            potential_reward: 0,
            next_time: 5_000,
            priority: Priority::PrimaryNetworkDelegatorCurrent,
        }
    }

    #[test]
    fn test_set_sums_delegators_and_orders_by_node() {
        let mut state = state();
        state.put_current_delegator(delegator(10, 1, 500));
        let set = validator_set(&state, &PRIMARY_NETWORK_ID).unwrap();
        let view: Vec<(NodeId, u64)> = set.iter().map(|e| (e.node_id, e.weight)).collect();
        assert_eq!(
            view,
            vec![(NodeId([1u8; 20]), 2_500), (NodeId([2u8; 20]), 3_000)]
        );
        assert!(validator_set(&state, &Id::from_u64(5)).unwrap().is_empty());
    }

    #[test]
    fn test_history_walks_back_weight_and_key_changes() {
        let mut state = state();
        let at_genesis = validator_set(&state, &PRIMARY_NETWORK_ID).unwrap();

        state.put_current_delegator(delegator(10, 1, 500));
        state.commit(1).unwrap();
        let at_one = validator_set(&state, &PRIMARY_NETWORK_ID).unwrap();

        // Node 2 re-registers with a new key and weight.
        let old = state
            .current_validator(&PRIMARY_NETWORK_ID, &NodeId([2u8; 20]))
            .unwrap()
            .cloned()
            .unwrap();
        state.delete_current_validator(&old);
        let mut replacement = old.clone();
        replacement.tx_id = Id::from_u64(20);
        replacement.weight = 4_000;
        replacement.public_key = Some(vec![0xaa]);
        state.put_current_validator(replacement);
        state.commit(2).unwrap();

        let now = validator_set(&state, &PRIMARY_NETWORK_ID).unwrap();
        assert_eq!(now[1].weight, 4_000);
        assert_eq!(now[1].public_key, Some(vec![0xaa]));

        assert_eq!(validator_set_at(&state, &PRIMARY_NETWORK_ID, 2).unwrap(), now);
        assert_eq!(validator_set_at(&state, &PRIMARY_NETWORK_ID, 1).unwrap(), at_one);
        assert_eq!(
            validator_set_at(&state, &PRIMARY_NETWORK_ID, 0).unwrap(),
            at_genesis
        );
    }

    #[test]
    fn test_history_drops_validators_added_later() {
        let mut state = state();
        let tx = StakerTx {
            node_id: NodeId([3u8; 20]),
            ..validator_tx(3, 2_500)
        };
        state.put_current_validator(Staker::new_current(&tx, 0).unwrap());
        state.commit(1).unwrap();
        assert_eq!(validator_set(&state, &PRIMARY_NETWORK_ID).unwrap().len(), 3);
        assert_eq!(
            validator_set_at(&state, &PRIMARY_NETWORK_ID, 0).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_history_rejects_future_and_dirty_states() {
        let mut state = state();
        assert!(validator_set_at(&state, &PRIMARY_NETWORK_ID, 1).is_err());
        state.set_timestamp(2_000);
        assert!(matches!(
            validator_set_at(&state, &PRIMARY_NETWORK_ID, 0),
            Err(StateError::InvariantViolation(_))
        ));
    }
}
