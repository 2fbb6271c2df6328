// Path: crates/node/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]

//! # Platform Chain Ledger Operator
//!
//! Drives a durable [`State`] forward in time the way block execution would:
//! every step runs in a [`Diff`] over the last committed state, is folded
//! back, and is committed as the next height.

use pchain_api::reward::RewardCalculators;
use pchain_api::state::Chain;
use pchain_state::{
    advance_time_to, next_staker_change_time, reward_staker, verify_advance_time, Diff, State,
    VersionSet,
};
use pchain_types::error::StateError;
use pchain_types::{Id, PRIMARY_NETWORK_ID};
use serde::Serialize;

/// One committed height produced by [`advance_to`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// A due permissionless staker was retired.
    Rewarded {
        /// The transaction that created the staker.
        staker_tx_id: String,
        /// Whether its reward was paid out or returned to the pool.
        rewarded: bool,
        /// The committed height.
        height: u64,
    },
    /// Chain time moved forward.
    Advanced {
        /// The new chain time.
        to: u64,
        /// Stakers promoted to current.
        promoted: usize,
        /// Permissioned validators retired.
        retired: usize,
        /// The committed height.
        height: u64,
    },
}

/// A snapshot of the committed chain for `supernet_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    /// Last committed height.
    pub height: u64,
    /// Chain time.
    pub timestamp: u64,
    /// Accumulated fees.
    pub fee_pool: u64,
    /// The supernet the supplies belong to.
    pub supernet_id: String,
    /// Circulating supply of the supernet's staking asset.
    pub current_supply: u64,
    /// Remaining reward pool.
    pub reward_pool_supply: u64,
    /// The next time a staker changes state.
    pub next_staker_change_time: Option<u64>,
}

/// Reads the committed status of `supernet_id`.
pub fn status(state: &State, supernet_id: &Id) -> Result<Status, StateError> {
    Ok(Status {
        height: state.height(),
        timestamp: state.timestamp(),
        fee_pool: state.fee_pool(),
        supernet_id: supernet_id.to_string(),
        current_supply: state.current_supply(supernet_id)?,
        reward_pool_supply: state.reward_pool_supply(supernet_id)?,
        next_staker_change_time: next_staker_change_time(state)?,
    })
}

/// The supernet named on the command line, or the primary network.
pub fn supernet_or_primary(supernet: Option<Id>) -> Id {
    supernet.unwrap_or(PRIMARY_NETWORK_ID)
}

/// Moves chain time to `target`, committing one height per step.
///
/// Due permissionless stakers are retired before time moves on; `rewarded`
/// decides whether they are paid. Stops once chain time is `target` and no
/// staker is left to retire at that time.
pub fn advance_to(
    state: &mut State,
    rewards: &dyn RewardCalculators,
    target: u64,
    rewarded: bool,
) -> Result<Vec<Step>, StateError> {
    let now = state.timestamp();
    if target < now {
        return Err(StateError::InvalidTransaction(format!(
            "target time {target} is before chain time {now}"
        )));
    }
    let mut steps = Vec::new();
    while let Some(step) = step_towards(state, rewards, target, rewarded)? {
        steps.push(step);
    }
    tracing::info!(
        target: "advance",
        height = state.height(),
        timestamp = state.timestamp(),
        steps = steps.len(),
        "advanced chain"
    );
    Ok(steps)
}

fn step_towards(
    state: &mut State,
    rewards: &dyn RewardCalculators,
    target: u64,
    rewarded: bool,
) -> Result<Option<Step>, StateError> {
    let now = state.timestamp();
    let height = state
        .height()
        .checked_add(1)
        .ok_or_else(|| StateError::Overflow(format!("height after {}", state.height())))?;
    let due = state
        .current_staker_iterator()?
        .next()
        .filter(|s| s.end_time == now && !s.priority.is_permissioned())
        .map(|s| s.tx_id);

    let tip = Id::from_u64(state.height());
    let (changes, step) = {
        let mut versions = VersionSet::new();
        versions.insert(tip, &*state);
        let mut diff = Diff::new(tip, &versions)?;
        let step = match due {
            Some(staker_tx_id) => {
                reward_staker(&mut diff, &staker_tx_id, rewarded)?;
                Step::Rewarded {
                    staker_tx_id: staker_tx_id.to_string(),
                    rewarded,
                    height,
                }
            }
            None if now >= target => return Ok(None),
            None => {
                let next = next_staker_change_time(&diff)?.map_or(target, |t| t.min(target));
                verify_advance_time(&diff, next)?;
                let changes = advance_time_to(&diff, rewards, next)?;
                let (promoted, retired) = (changes.promotions.len(), changes.retirements.len());
                if next <= now && promoted == 0 && retired == 0 {
                    return Err(StateError::InvariantViolation(format!(
                        "time advancement is stuck at {now}"
                    )));
                }
                changes.apply(&mut diff);
                Step::Advanced {
                    to: next,
                    promoted,
                    retired,
                    height,
                }
            }
        };
        (diff.into_changes(), step)
    };
    changes.apply(state)?;
    state.commit(height)?;
    Ok(Some(step))
}
