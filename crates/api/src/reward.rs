// Path: crates/api/src/reward.rs

//! Pluggable reward curves.

use crate::state::Chain;
use pchain_types::error::StateError;
use pchain_types::Id;

/// Computes the reward a staker earns for a completed staking period.
pub trait RewardCalculator: Send + Sync {
    /// Returns the reward for staking `weight` for `duration` seconds from
    /// `start_time`. `pool_supply` is the reward pool available at the time of
    /// the call; implementations may ignore it, the caller applies any cap.
    fn calculate(
        &self,
        duration: u64,
        start_time: u64,
        weight: u64,
        pool_supply: u64,
    ) -> Result<u64, StateError>;
}

/// Resolves the reward curve of a supernet.
///
/// The primary network uses one fixed curve; transformed supernets carry
/// their own curve parameters on chain, so resolution may read `chain`.
pub trait RewardCalculators: Send + Sync {
    /// Returns the calculator that applies to stakers of `supernet_id`.
    fn for_supernet<'a>(
        &'a self,
        chain: &dyn Chain,
        supernet_id: &Id,
    ) -> Result<Box<dyn RewardCalculator + 'a>, StateError>;
}
