// Path: crates/state/src/reward.rs
//! The time-decaying staking reward curve.

use pchain_api::reward::{RewardCalculator, RewardCalculators};
use pchain_api::state::Chain;
use pchain_types::config::{RewardConfig, PERCENT_DENOMINATOR, SECONDS_PER_YEAR};
use pchain_types::error::StateError;
use pchain_types::Id;

/// Reward curve driven by a `RewardConfig`.
///
/// The annual share is the time component at `start_time` plus the stake
/// period bonus for `duration`; the reward is that share of `weight`,
/// prorated over the duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardCurve {
    config: RewardConfig,
}

impl RewardCurve {
    /// Builds a curve from its parameters.
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    /// The annual time component, in parts per million, for a staker
    /// starting at `start_time`.
    pub fn time_share(&self, start_time: u64) -> u64 {
        let c = &self.config;
        if start_time <= c.start_reward_time || c.target_reward_time <= c.start_reward_time {
            return if start_time < c.target_reward_time {
                c.start_reward_share
            } else {
                c.target_reward_share
            };
        }
        if start_time >= c.target_reward_time {
            return c.target_reward_share;
        }
        let elapsed = i128::from(start_time - c.start_reward_time);
        let span = i128::from(c.target_reward_time - c.start_reward_time);
        let start = i128::from(c.start_reward_share);
        let delta = i128::from(c.target_reward_share) - start;
        let share = start + delta * elapsed / span;
        u64::try_from(share).unwrap_or(0)
    }

    /// The annual stake period bonus, in parts per million, for staking
    /// `duration` seconds.
    pub fn period_share(&self, duration: u64) -> u64 {
        let c = &self.config;
        let span = c.max_stake_duration.saturating_sub(c.min_stake_duration);
        if span == 0 {
            return 0;
        }
        let clamped = duration.clamp(c.min_stake_duration, c.max_stake_duration);
        let over = u128::from(clamped - c.min_stake_duration);
        let bonus = u128::from(c.stake_period_reward_share) * over / u128::from(span);
        u64::try_from(bonus).unwrap_or(c.stake_period_reward_share)
    }
}

impl RewardCalculator for RewardCurve {
    fn calculate(
        &self,
        duration: u64,
        start_time: u64,
        weight: u64,
        _pool_supply: u64,
    ) -> Result<u64, StateError> {
        let share = u128::from(self.time_share(start_time)) + u128::from(self.period_share(duration));
        let denominator = u128::from(PERCENT_DENOMINATOR) * u128::from(SECONDS_PER_YEAR);
        u128::from(weight)
            .checked_mul(share)
            .and_then(|x| x.checked_mul(u128::from(duration)))
            .map(|x| x / denominator)
            .and_then(|reward| u64::try_from(reward).ok())
            .ok_or_else(|| {
                StateError::Overflow(format!(
                    "reward for weight {weight} over {duration}s does not fit in u64"
                ))
            })
    }
}

/// Resolves curves from the primary network configuration and the
/// transformation records of permissionless supernets.
#[derive(Debug, Clone)]
pub struct ConfiguredRewards {
    primary: RewardCurve,
}

impl ConfiguredRewards {
    /// Uses `primary` for primary network stakers.
    pub fn new(primary: RewardConfig) -> Self {
        Self {
            primary: RewardCurve::new(primary),
        }
    }
}

impl RewardCalculators for ConfiguredRewards {
    fn for_supernet<'a>(
        &'a self,
        chain: &dyn Chain,
        supernet_id: &Id,
    ) -> Result<Box<dyn RewardCalculator + 'a>, StateError> {
        if supernet_id.is_primary_network() {
            return Ok(Box::new(self.primary.clone()));
        }
        let transformation = chain.supernet_transformation(supernet_id)?.ok_or_else(|| {
            StateError::InvariantViolation(format!(
                "rewarded staker on supernet {supernet_id}, which is not transformed"
            ))
        })?;
        Ok(Box::new(RewardCurve::new(transformation.staking.reward)))
    }
}
