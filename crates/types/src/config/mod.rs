// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for the staking ledger.
use crate::error::StateError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Genesis state of a fresh ledger.
pub mod genesis;
pub use genesis::*;

/// Parts-per-million denominator for every reward share.
pub const PERCENT_DENOMINATOR: u64 = 1_000_000;

/// Seconds in a (365-day) year, the period reward shares are expressed over.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Parameters of a reward curve.
///
/// The annual reward share of a staker is the sum of a time component, which
/// moves linearly from `start_reward_share` at `start_reward_time` to
/// `target_reward_share` at `target_reward_time` (and stays there), and a
/// stake-period bonus of up to `stake_period_reward_share` that grows
/// linearly with the staking duration between `min_stake_duration` and
/// `max_stake_duration`. Shares are in parts per million.
#[derive(Encode, Decode, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RewardConfig {
    /// Shortest staking period accepted, in seconds.
    #[serde(default = "default_min_stake_duration")]
    pub min_stake_duration: u64,
    /// Longest staking period accepted, in seconds.
    #[serde(default = "default_max_stake_duration")]
    pub max_stake_duration: u64,
    /// Annual share awarded on top for staking the maximum duration.
    #[serde(default = "default_stake_period_reward_share")]
    pub stake_period_reward_share: u64,
    /// Annual share for stakers starting at or before `start_reward_time`.
    #[serde(default = "default_start_reward_share")]
    pub start_reward_share: u64,
    /// Unix time at which the time component starts moving.
    #[serde(default = "default_start_reward_time")]
    pub start_reward_time: u64,
    /// Annual share for stakers starting at or after `target_reward_time`.
    #[serde(default = "default_target_reward_share")]
    pub target_reward_share: u64,
    /// Unix time at which the time component reaches its target.
    #[serde(default = "default_target_reward_time")]
    pub target_reward_time: u64,
}

fn default_min_stake_duration() -> u64 {
    14 * 24 * 60 * 60
}
fn default_max_stake_duration() -> u64 {
    SECONDS_PER_YEAR
}
fn default_stake_period_reward_share() -> u64 {
    20_000
}
fn default_start_reward_share() -> u64 {
    210_000
}
fn default_start_reward_time() -> u64 {
    1_704_067_200
}
fn default_target_reward_share() -> u64 {
    60_000
}
fn default_target_reward_time() -> u64 {
    1_893_456_000
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            min_stake_duration: default_min_stake_duration(),
            max_stake_duration: default_max_stake_duration(),
            stake_period_reward_share: default_stake_period_reward_share(),
            start_reward_share: default_start_reward_share(),
            start_reward_time: default_start_reward_time(),
            target_reward_share: default_target_reward_share(),
            target_reward_time: default_target_reward_time(),
        }
    }
}

impl RewardConfig {
    /// Validates the curve for semantic correctness.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.min_stake_duration == 0 {
            return Err(StateError::InvalidConfig(
                "'min_stake_duration' must be greater than 0".into(),
            ));
        }
        if self.min_stake_duration >= self.max_stake_duration {
            return Err(StateError::InvalidConfig(format!(
                "'min_stake_duration' ({}) must be below 'max_stake_duration' ({})",
                self.min_stake_duration, self.max_stake_duration
            )));
        }
        for (name, share) in [
            ("stake_period_reward_share", self.stake_period_reward_share),
            ("start_reward_share", self.start_reward_share),
            ("target_reward_share", self.target_reward_share),
        ] {
            if share > PERCENT_DENOMINATOR {
                return Err(StateError::InvalidConfig(format!(
                    "'{name}' ({share}) exceeds {PERCENT_DENOMINATOR}"
                )));
            }
        }
        if self.start_reward_time > self.target_reward_time {
            return Err(StateError::InvalidConfig(
                "'start_reward_time' must not be after 'target_reward_time'".into(),
            ));
        }
        Ok(())
    }
}

/// Staking bounds and reward curve of a network (primary or transformed supernet).
#[derive(Encode, Decode, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StakingConfig {
    /// Smallest weight a validator may stake.
    #[serde(default = "default_min_validator_stake")]
    pub min_validator_stake: u64,
    /// Largest total weight (own stake plus delegations) a validator may carry.
    #[serde(default = "default_max_validator_stake")]
    pub max_validator_stake: u64,
    /// Smallest weight a delegator may stake.
    #[serde(default = "default_min_delegator_stake")]
    pub min_delegator_stake: u64,
    /// A validator's total weight may not exceed this multiple of its own stake.
    #[serde(default = "default_max_validator_weight_factor")]
    pub max_validator_weight_factor: u64,
    /// The network's reward curve.
    #[serde(default)]
    pub reward: RewardConfig,
}

fn default_min_validator_stake() -> u64 {
    2_000
}
fn default_max_validator_stake() -> u64 {
    3_000_000
}
fn default_min_delegator_stake() -> u64 {
    25
}
fn default_max_validator_weight_factor() -> u64 {
    5
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            min_validator_stake: default_min_validator_stake(),
            max_validator_stake: default_max_validator_stake(),
            min_delegator_stake: default_min_delegator_stake(),
            max_validator_weight_factor: default_max_validator_weight_factor(),
            reward: RewardConfig::default(),
        }
    }
}

impl StakingConfig {
    /// Validates the configuration for semantic correctness.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.min_validator_stake > self.max_validator_stake {
            return Err(StateError::InvalidConfig(
                "'min_validator_stake' must not exceed 'max_validator_stake'".into(),
            ));
        }
        if self.max_validator_weight_factor == 0 {
            return Err(StateError::InvalidConfig(
                "'max_validator_weight_factor' must be greater than 0".into(),
            ));
        }
        self.reward.validate()
    }
}

/// Top-level configuration of the `pchain-ledger` binary.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Path of the redb database file.
    pub db_path: PathBuf,
    /// Primary network staking parameters.
    #[serde(default)]
    pub staking: StakingConfig,
    /// Genesis used when the database is empty.
    pub genesis: Genesis,
}

impl LedgerConfig {
    /// Validates the configuration for semantic correctness.
    pub fn validate(&self) -> Result<(), StateError> {
        self.staking.validate()?;
        self.genesis.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let cfg: StakingConfig = toml::from_str("min_validator_stake = 10").unwrap();
        assert_eq!(cfg.min_validator_stake, 10);
        assert_eq!(cfg.max_validator_weight_factor, 5);
        assert_eq!(cfg.reward, RewardConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_reward_config_rejects_inverted_durations() {
        let cfg = RewardConfig {
            min_stake_duration: 100,
            max_stake_duration: 100,
            ..RewardConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(StateError::InvalidConfig(_))));
    }

    #[test]
    fn test_reward_config_rejects_share_above_denominator() {
        let cfg = RewardConfig {
            start_reward_share: PERCENT_DENOMINATOR + 1,
            ..RewardConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_nested_reward_table_roundtrip() {
        let cfg = StakingConfig::default();
        let s = toml::to_string(&cfg).unwrap();
        assert!(s.contains("[reward]"));
        let back: StakingConfig = toml::from_str(&s).unwrap();
        assert_eq!(back, cfg);
    }
}
