// Path: crates/state/src/advance.rs
//! Chain time advancement.
//!
//! [`advance_time_to`] reads a state and a target time and returns the
//! resulting [`StateChanges`] without touching the state. Applying them is a
//! separate, infallible step, so a failed computation never leaves a layer
//! half-advanced.

use pchain_api::reward::RewardCalculators;
use pchain_api::state::Chain;
use pchain_types::error::{checked_add, StateError};
use pchain_types::{Id, Staker};
use std::collections::BTreeMap;

/// How a computed reward is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Funding {
    /// The reward credited to the staker.
    pub reward: u64,
    /// The reward pool after paying it.
    pub reward_pool: u64,
    /// The current supply after any minting.
    pub current_supply: u64,
}

/// Pays `reward` out of `reward_pool`.
///
/// On the primary network the part the pool cannot cover is minted into the
/// current supply. Other supernets never mint: the reward is capped at the
/// pool.
pub fn fund_reward(
    supernet_id: &Id,
    reward: u64,
    reward_pool: u64,
    current_supply: u64,
) -> Result<Funding, StateError> {
    if reward <= reward_pool {
        return Ok(Funding {
            reward,
            reward_pool: reward_pool - reward,
            current_supply,
        });
    }
    if supernet_id.is_primary_network() {
        let minted = reward - reward_pool;
        return Ok(Funding {
            reward,
            reward_pool: 0,
            current_supply: checked_add(current_supply, minted, "current supply")?,
        });
    }
    Ok(Funding {
        reward: reward_pool,
        reward_pool: 0,
        current_supply,
    })
}

/// A pending staker and the current staker it becomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    /// The staker as it sits in the pending set.
    pub pending: Staker,
    /// The staker to put in the current set, reward included.
    pub current: Staker,
}

/// Everything one time advancement changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChanges {
    /// The new chain time.
    pub timestamp: u64,
    /// Pending stakers to promote, in promotion order.
    pub promotions: Vec<Promotion>,
    /// Current permissioned validators to retire, in retirement order.
    pub retirements: Vec<Staker>,
    /// Updated current supplies.
    pub current_supply: BTreeMap<Id, u64>,
    /// Updated reward pools.
    pub reward_pool_supply: BTreeMap<Id, u64>,
}

impl StateChanges {
    fn current_supply(&mut self, chain: &dyn Chain, supernet_id: &Id) -> Result<u64, StateError> {
        match self.current_supply.get(supernet_id) {
            Some(supply) => Ok(*supply),
            None => chain.current_supply(supernet_id),
        }
    }

    fn reward_pool_supply(
        &mut self,
        chain: &dyn Chain,
        supernet_id: &Id,
    ) -> Result<u64, StateError> {
        match self.reward_pool_supply.get(supernet_id) {
            Some(supply) => Ok(*supply),
            None => chain.reward_pool_supply(supernet_id),
        }
    }

    /// Writes the changes into `chain`: promotions, then retirements, then
    /// supplies, then the new chain time.
    pub fn apply(self, chain: &mut dyn Chain) {
        for Promotion { pending, current } in self.promotions {
            if pending.priority.is_validator() {
                chain.delete_pending_validator(&pending);
                chain.put_current_validator(current);
            } else {
                chain.delete_pending_delegator(&pending);
                chain.put_current_delegator(current);
            }
        }
        for staker in &self.retirements {
            if staker.priority.is_validator() {
                chain.delete_current_validator(staker);
            } else {
                chain.delete_current_delegator(staker);
            }
        }
        for (supernet_id, supply) in &self.current_supply {
            chain.set_current_supply(supernet_id, *supply);
        }
        for (supernet_id, supply) in &self.reward_pool_supply {
            chain.set_reward_pool_supply(supernet_id, *supply);
        }
        chain.set_timestamp(self.timestamp);
    }
}

/// Computes the effect of moving chain time to `new_time`.
///
/// Pending stakers starting at or before `new_time` are promoted in staker
/// order. Rewarded stakers get their potential reward from the supernet's
/// curve, funded by [`fund_reward`]. Current permissioned validators ending
/// at or before `new_time` are retired; permissionless stakers stay until a
/// reward transaction retires them. Stakers promoted here are not retired in
/// the same call because their new next time is their end time.
///
/// The caller is responsible for bounding `new_time`, see
/// [`crate::verify_advance_time`].
pub fn advance_time_to(
    chain: &dyn Chain,
    rewards: &dyn RewardCalculators,
    new_time: u64,
) -> Result<StateChanges, StateError> {
    let mut changes = StateChanges {
        timestamp: new_time,
        ..StateChanges::default()
    };

    for pending in chain.pending_staker_iterator()? {
        if pending.next_time > new_time {
            break;
        }
        let mut reward = 0;
        if !pending.priority.is_permissioned() {
            let supernet_id = pending.supernet_id;
            let pool = changes.reward_pool_supply(chain, &supernet_id)?;
            let supply = changes.current_supply(chain, &supernet_id)?;
            let calculated = rewards.for_supernet(chain, &supernet_id)?.calculate(
                pending.duration(),
                pending.start_time,
                pending.weight,
                pool,
            )?;
            let funding = fund_reward(&supernet_id, calculated, pool, supply)?;
            changes
                .reward_pool_supply
                .insert(supernet_id, funding.reward_pool);
            changes
                .current_supply
                .insert(supernet_id, funding.current_supply);
            reward = funding.reward;
        }
        tracing::debug!(
            target: "advance",
            tx_id = %pending.tx_id,
            node_id = %pending.node_id,
            reward,
            "promoting staker"
        );
        changes.promotions.push(Promotion {
            pending: pending.clone(),
            current: pending.promoted(reward),
        });
    }

    for current in chain.current_staker_iterator()? {
        if current.next_time > new_time {
            break;
        }
        if !current.priority.is_permissioned() {
            continue;
        }
        tracing::debug!(
            target: "advance",
            tx_id = %current.tx_id,
            node_id = %current.node_id,
            "retiring permissioned validator"
        );
        changes.retirements.push(current.clone());
    }

    Ok(changes)
}

/// The earliest time at which a staker changes state, if any staker exists.
pub fn next_staker_change_time(chain: &dyn Chain) -> Result<Option<u64>, StateError> {
    let current = chain.current_staker_iterator()?.next().map(|s| s.next_time);
    let pending = chain.pending_staker_iterator()?.next().map(|s| s.next_time);
    Ok(match (current, pending) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    })
}

/// Checks that chain time may move to `new_time`: not backwards, and not
/// past the next staker change.
pub fn verify_advance_time(chain: &dyn Chain, new_time: u64) -> Result<(), StateError> {
    let now = chain.timestamp();
    if new_time < now {
        return Err(StateError::InvalidTransaction(format!(
            "proposed time {new_time} is before chain time {now}"
        )));
    }
    if let Some(next) = next_staker_change_time(chain)? {
        if new_time > next {
            return Err(StateError::InvalidTransaction(format!(
                "proposed time {new_time} is after the next staker change at {next}"
            )));
        }
    }
    Ok(())
}

/// Undoes `amount` of reward-pool spending, for a reward that was forfeited.
pub(crate) fn return_to_pool(
    chain: &mut dyn Chain,
    supernet_id: &Id,
    amount: u64,
) -> Result<(), StateError> {
    let pool = chain.reward_pool_supply(supernet_id)?;
    chain.set_reward_pool_supply(supernet_id, checked_add(pool, amount, "reward pool")?);
    Ok(())
}
