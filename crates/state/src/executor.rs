// Path: crates/state/src/executor.rs
//! Ledger-state effects of transactions.
//!
//! Transactions arrive here already parsed and authorized. The functions in
//! this module only check them against the state they are applied to and
//! perform their effects on any [`Chain`], normally a block's [`crate::Diff`].

use crate::advance::return_to_pool;
use pchain_api::state::{Chain, StakerDiffIterator};
use pchain_types::config::StakingConfig;
use pchain_types::error::{checked_add, checked_sub, StateError};
use pchain_types::ledger::{
    ChainRecord, StoredTx, SupernetRecord, SupernetTransformation, TxBody, TxStatus, Utxo, UtxoId,
    PRIMARY_ASSET_ID,
};
use pchain_types::prelude::OptionExt;
use pchain_types::{Id, Staker, StakerKind, StakerTx, PRIMARY_NETWORK_ID};

fn invalid(msg: String) -> StateError {
    StateError::InvalidTransaction(msg)
}

/// Applies a state-changing transaction and records it as committed.
///
/// Reward claims and time advancement are not accepted here: they need the
/// block context, see [`reward_staker`] and [`crate::advance_time_to`].
pub fn apply_staker_tx(
    chain: &mut dyn Chain,
    tx: &StoredTx,
    config: &StakingConfig,
) -> Result<(), StateError> {
    if chain.tx(&tx.id)?.is_some() {
        return Err(invalid(format!("transaction {} already recorded", tx.id)));
    }
    match &tx.body {
        TxBody::AddStaker(staker_tx) => {
            if staker_tx.tx_id != tx.id {
                return Err(invalid(format!(
                    "staker tx id {} does not match transaction {}",
                    staker_tx.tx_id, tx.id
                )));
            }
            add_staker(chain, staker_tx, config)?;
        }
        TxBody::CreateSupernet(supernet) => create_supernet(chain, supernet)?,
        TxBody::CreateChain(record) => create_chain(chain, record)?,
        TxBody::TransformSupernet(transformation) => transform_supernet(chain, transformation)?,
        TxBody::RewardStaker { .. } | TxBody::AdvanceTime { .. } => {
            return Err(invalid(format!(
                "transaction {} is not a standard transaction",
                tx.id
            )));
        }
    }
    chain.add_tx(tx.clone(), TxStatus::Committed);
    Ok(())
}

fn add_staker(
    chain: &mut dyn Chain,
    tx: &StakerTx,
    config: &StakingConfig,
) -> Result<(), StateError> {
    let now = chain.timestamp();
    if tx.start_time <= now {
        return Err(invalid(format!(
            "staker {} starts at {}, not after chain time {now}",
            tx.tx_id, tx.start_time
        )));
    }
    let staker = Staker::new_pending(tx)?;
    let primary = tx.supernet_id.is_primary_network();

    let rules = match tx.kind {
        StakerKind::PrimaryValidator | StakerKind::PrimaryDelegator => {
            if !primary {
                return Err(invalid(format!(
                    "primary network staker {} names supernet {}",
                    tx.tx_id, tx.supernet_id
                )));
            }
            Some(config.clone())
        }
        StakerKind::PermissionlessValidator | StakerKind::PermissionlessDelegator => {
            let transformation = chain
                .supernet_transformation(&tx.supernet_id)?
                .ok_or_else(|| {
                    invalid(format!(
                        "supernet {} is not permissionless",
                        tx.supernet_id
                    ))
                })?;
            Some(transformation.staking)
        }
        StakerKind::PermissionedValidator => {
            if primary || chain.supernet(&tx.supernet_id)?.is_none() {
                return Err(invalid(format!(
                    "supernet {} does not exist",
                    tx.supernet_id
                )));
            }
            if chain.supernet_transformation(&tx.supernet_id)?.is_some() {
                return Err(invalid(format!(
                    "supernet {} is permissionless",
                    tx.supernet_id
                )));
            }
            None
        }
    };

    if let Some(rules) = &rules {
        let duration = tx.duration();
        let reward = &rules.reward;
        if duration < reward.min_stake_duration || duration > reward.max_stake_duration {
            return Err(invalid(format!(
                "staker {} stakes for {duration}s, outside [{}, {}]",
                tx.tx_id, reward.min_stake_duration, reward.max_stake_duration
            )));
        }
        let (min, max) = if tx.kind.is_validator() {
            (rules.min_validator_stake, rules.max_validator_stake)
        } else {
            (rules.min_delegator_stake, rules.max_validator_stake)
        };
        if tx.weight < min || tx.weight > max {
            return Err(invalid(format!(
                "staker {} weight {} outside [{min}, {max}]",
                tx.tx_id, tx.weight
            )));
        }
    } else if tx.weight == 0 {
        return Err(invalid(format!("validator {} has zero weight", tx.tx_id)));
    }

    if tx.kind.is_validator() {
        if existing_validator(chain, &tx.supernet_id, tx)?.is_some() {
            return Err(invalid(format!(
                "{} already validates supernet {}",
                tx.node_id, tx.supernet_id
            )));
        }
        if !primary {
            let primary_validator = existing_validator(chain, &PRIMARY_NETWORK_ID, tx)?
                .ok_or_else(|| invalid(format!("{} does not validate the primary network", tx.node_id)))?;
            if primary_validator.start_time > tx.start_time
                || primary_validator.end_time < tx.end_time
            {
                return Err(invalid(format!(
                    "{} does not validate the primary network over [{}, {}]",
                    tx.node_id, tx.start_time, tx.end_time
                )));
            }
        }
        chain.put_pending_validator(staker);
    } else {
        let validator = existing_validator(chain, &tx.supernet_id, tx)?.ok_or_else(|| {
            invalid(format!(
                "{} does not validate supernet {}",
                tx.node_id, tx.supernet_id
            ))
        })?;
        if validator.start_time > tx.start_time || validator.end_time < tx.end_time {
            return Err(invalid(format!(
                "delegation {} is outside its validator's window",
                tx.tx_id
            )));
        }
        // Rules exist for every delegator kind.
        let rules = rules.found_or(|| format!("staking rules for {}", tx.supernet_id))?;
        let factor_cap = validator
            .weight
            .saturating_mul(rules.max_validator_weight_factor);
        let cap = factor_cap.min(rules.max_validator_stake);
        let peak = max_validator_weight(chain, &validator, tx.start_time, tx.end_time)?;
        let total = checked_add(peak, tx.weight, "validator weight")?;
        if total > cap {
            return Err(invalid(format!(
                "delegation {} lifts {} to {total}, above {cap}",
                tx.tx_id, tx.node_id
            )));
        }
        chain.put_pending_delegator(staker);
    }
    tracing::debug!(
        target: "stakers",
        tx_id = %tx.tx_id,
        node_id = %tx.node_id,
        supernet_id = %tx.supernet_id,
        weight = tx.weight,
        "added pending staker"
    );
    Ok(())
}

/// The current or pending validator of `tx`'s node on `supernet_id`.
fn existing_validator(
    chain: &dyn Chain,
    supernet_id: &Id,
    tx: &StakerTx,
) -> Result<Option<Staker>, StateError> {
    if let Some(current) = chain.current_validator(supernet_id, &tx.node_id)? {
        return Ok(Some(current.clone()));
    }
    Ok(chain.pending_validator(supernet_id, &tx.node_id)?.cloned())
}

/// The largest weight `validator` carries, delegations included, at any
/// moment of `[start, end]`.
pub fn max_validator_weight(
    chain: &dyn Chain,
    validator: &Staker,
    start: u64,
    end: u64,
) -> Result<u64, StateError> {
    let supernet_id = &validator.supernet_id;
    let node_id = &validator.node_id;

    let mut weight = validator.weight;
    for delegator in chain.current_delegator_iterator(supernet_id, node_id)? {
        weight = checked_add(weight, delegator.weight, "validator weight")?;
    }

    let events = StakerDiffIterator::new(
        chain.current_delegator_iterator(supernet_id, node_id)?,
        chain.pending_delegator_iterator(supernet_id, node_id)?,
    );
    let mut peak: Option<u64> = None;
    for (delegator, starting) in events {
        let at = if starting {
            delegator.start_time
        } else {
            delegator.end_time
        };
        if at > end {
            break;
        }
        // A delegation ending exactly at `start` never overlaps the window.
        let in_window = if starting { at >= start } else { at > start };
        if in_window && peak.is_none() {
            peak = Some(weight);
        }
        if starting {
            weight = checked_add(weight, delegator.weight, "validator weight")?;
            if let Some(p) = peak.as_mut() {
                *p = (*p).max(weight);
            }
        } else {
            weight = checked_sub(weight, delegator.weight, "validator weight")?;
        }
    }
    Ok(peak.unwrap_or(weight))
}

fn create_supernet(chain: &mut dyn Chain, supernet: &SupernetRecord) -> Result<(), StateError> {
    if supernet.id.is_primary_network() || chain.supernet(&supernet.id)?.is_some() {
        return Err(invalid(format!("supernet {} already exists", supernet.id)));
    }
    chain.add_supernet(supernet.clone());
    Ok(())
}

fn create_chain(chain: &mut dyn Chain, record: &ChainRecord) -> Result<(), StateError> {
    if !record.supernet_id.is_primary_network() && chain.supernet(&record.supernet_id)?.is_none() {
        return Err(invalid(format!(
            "chain {} names unknown supernet {}",
            record.id, record.supernet_id
        )));
    }
    if chain
        .chains(&record.supernet_id)?
        .iter()
        .any(|c| c.id == record.id)
    {
        return Err(invalid(format!("chain {} already exists", record.id)));
    }
    chain.add_chain(record.clone());
    Ok(())
}

fn transform_supernet(
    chain: &mut dyn Chain,
    transformation: &SupernetTransformation,
) -> Result<(), StateError> {
    let supernet_id = &transformation.supernet_id;
    if supernet_id.is_primary_network() || chain.supernet(supernet_id)?.is_none() {
        return Err(invalid(format!("supernet {supernet_id} does not exist")));
    }
    if chain.supernet_transformation(supernet_id)?.is_some() {
        return Err(invalid(format!("supernet {supernet_id} is already transformed")));
    }
    if transformation.initial_reward_pool > transformation.initial_supply {
        return Err(invalid(format!(
            "reward pool of {supernet_id} exceeds its supply"
        )));
    }
    transformation
        .staking
        .validate()
        .map_err(|e| invalid(e.to_string()))?;
    chain.set_current_supply(supernet_id, transformation.initial_supply);
    chain.set_reward_pool_supply(supernet_id, transformation.initial_reward_pool);
    chain.add_supernet_transformation(transformation.clone());
    Ok(())
}

/// Retires the first current staker, the one whose reward `staker_tx_id`
/// claims.
///
/// The staker must be due: its end time equals the chain time. When
/// `rewarded`, its potential reward becomes a UTXO owned by the staking
/// transaction's reward owner; otherwise the reward goes back to the
/// supernet's reward pool. Permissioned validators are retired by time
/// advancement and cannot be claimed here.
pub fn reward_staker(
    chain: &mut dyn Chain,
    staker_tx_id: &Id,
    rewarded: bool,
) -> Result<(), StateError> {
    let staker = chain
        .current_staker_iterator()?
        .next()
        .cloned()
        .ok_or_else(|| invalid("no current staker to reward".into()))?;
    if staker.tx_id != *staker_tx_id {
        return Err(invalid(format!(
            "next staker to reward is {}, not {staker_tx_id}",
            staker.tx_id
        )));
    }
    let now = chain.timestamp();
    if staker.end_time != now {
        return Err(invalid(format!(
            "staker {staker_tx_id} ends at {}, chain time is {now}",
            staker.end_time
        )));
    }
    if staker.priority.is_permissioned() {
        return Err(invalid(format!(
            "staker {staker_tx_id} is a permissioned validator"
        )));
    }
    let (stored, _) = chain
        .tx(staker_tx_id)?
        .found_or(|| format!("staking transaction {staker_tx_id}"))?;
    let TxBody::AddStaker(staker_tx) = stored.body else {
        return Err(StateError::InvariantViolation(format!(
            "transaction {staker_tx_id} is not a staking transaction"
        )));
    };

    if staker.priority.is_validator() {
        chain.delete_current_validator(&staker);
    } else {
        chain.delete_current_delegator(&staker);
    }

    let reward = staker.potential_reward;
    if reward > 0 {
        if rewarded {
            let asset_id = if staker.supernet_id.is_primary_network() {
                PRIMARY_ASSET_ID
            } else {
                chain
                    .supernet_transformation(&staker.supernet_id)?
                    .found_or(|| format!("transformation of {}", staker.supernet_id))?
                    .asset_id
            };
            let output_index = u32::try_from(chain.reward_utxos(staker_tx_id)?.len())
                .map_err(|_| StateError::Overflow(format!("reward outputs of {staker_tx_id}")))?;
            let utxo = Utxo {
                id: UtxoId {
                    tx_id: *staker_tx_id,
                    output_index,
                },
                asset_id,
                amount: reward,
                owner: staker_tx.reward_owner,
            };
            chain.add_utxo(utxo.clone());
            chain.add_reward_utxo(staker_tx_id, utxo);
        } else {
            return_to_pool(chain, &staker.supernet_id, reward)?;
        }
    }
    tracing::debug!(
        target: "stakers",
        tx_id = %staker_tx_id,
        reward,
        rewarded,
        "retired staker"
    );
    Ok(())
}
