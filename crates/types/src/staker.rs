// Path: crates/types/src/staker.rs
//! The staker record and the ordering key shared by every staker set.
//!
//! A `Staker` is computed once from a staking transaction and never mutated in
//! place: promotion from the pending to the current set produces a new value
//! with a different `next_time` and `priority`, and removal drops it.

use crate::error::StateError;
use crate::ids::{Id, NodeId};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The kind of staking commitment a transaction makes.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum StakerKind {
    /// A validator of the primary network. Earns rewards.
    PrimaryValidator,
    /// A delegator to a primary network validator. Earns rewards.
    PrimaryDelegator,
    /// A validator of a supernet admitted by the supernet's owner. Never rewarded.
    PermissionedValidator,
    /// A validator of a transformed (permissionless) supernet. Earns rewards.
    PermissionlessValidator,
    /// A delegator to a permissionless supernet validator. Earns rewards.
    PermissionlessDelegator,
}

impl StakerKind {
    /// Returns `true` for the validator kinds.
    pub fn is_validator(&self) -> bool {
        !self.is_delegator()
    }

    /// Returns `true` for the delegator kinds.
    pub fn is_delegator(&self) -> bool {
        matches!(self, Self::PrimaryDelegator | Self::PermissionlessDelegator)
    }
}

/// Ordering tie-break among stakers sharing the same `next_time`.
///
/// The variant encodes both the staker kind and its phase. Pending priorities
/// order validators ahead of their delegators, so a delegator is never
/// promoted before its validator. Current priorities order permissioned
/// validators first and delegators ahead of validators, so a delegator always
/// retires before the validator it delegates to.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
)]
#[repr(u8)]
pub enum Priority {
    /// Pending primary network validator.
    PrimaryNetworkValidatorPending = 1,
    /// Pending primary network delegator.
    PrimaryNetworkDelegatorPending = 2,
    /// Pending permissionless supernet validator.
    SupernetPermissionlessValidatorPending = 3,
    /// Pending permissionless supernet delegator.
    SupernetPermissionlessDelegatorPending = 4,
    /// Pending permissioned supernet validator.
    SupernetPermissionedValidatorPending = 5,
    /// Current permissioned supernet validator.
    SupernetPermissionedValidatorCurrent = 6,
    /// Current permissionless supernet delegator.
    SupernetPermissionlessDelegatorCurrent = 7,
    /// Current permissionless supernet validator.
    SupernetPermissionlessValidatorCurrent = 8,
    /// Current primary network delegator.
    PrimaryNetworkDelegatorCurrent = 9,
    /// Current primary network validator.
    PrimaryNetworkValidatorCurrent = 10,
}

impl Priority {
    /// The pending-phase priority for a staker kind.
    pub fn pending(kind: StakerKind) -> Self {
        match kind {
            StakerKind::PrimaryValidator => Self::PrimaryNetworkValidatorPending,
            StakerKind::PrimaryDelegator => Self::PrimaryNetworkDelegatorPending,
            StakerKind::PermissionlessValidator => Self::SupernetPermissionlessValidatorPending,
            StakerKind::PermissionlessDelegator => Self::SupernetPermissionlessDelegatorPending,
            StakerKind::PermissionedValidator => Self::SupernetPermissionedValidatorPending,
        }
    }

    /// The current-phase priority for a staker kind.
    pub fn current(kind: StakerKind) -> Self {
        Self::pending(kind).to_current()
    }

    /// Maps a pending priority to the matching current priority. Current
    /// priorities map to themselves.
    pub fn to_current(self) -> Self {
        match self {
            Self::PrimaryNetworkValidatorPending => Self::PrimaryNetworkValidatorCurrent,
            Self::PrimaryNetworkDelegatorPending => Self::PrimaryNetworkDelegatorCurrent,
            Self::SupernetPermissionlessValidatorPending => {
                Self::SupernetPermissionlessValidatorCurrent
            }
            Self::SupernetPermissionlessDelegatorPending => {
                Self::SupernetPermissionlessDelegatorCurrent
            }
            Self::SupernetPermissionedValidatorPending => Self::SupernetPermissionedValidatorCurrent,
            current => current,
        }
    }

    /// The kind of staker this priority belongs to.
    pub fn kind(&self) -> StakerKind {
        match self {
            Self::PrimaryNetworkValidatorPending | Self::PrimaryNetworkValidatorCurrent => {
                StakerKind::PrimaryValidator
            }
            Self::PrimaryNetworkDelegatorPending | Self::PrimaryNetworkDelegatorCurrent => {
                StakerKind::PrimaryDelegator
            }
            Self::SupernetPermissionlessValidatorPending
            | Self::SupernetPermissionlessValidatorCurrent => StakerKind::PermissionlessValidator,
            Self::SupernetPermissionlessDelegatorPending
            | Self::SupernetPermissionlessDelegatorCurrent => StakerKind::PermissionlessDelegator,
            Self::SupernetPermissionedValidatorPending
            | Self::SupernetPermissionedValidatorCurrent => StakerKind::PermissionedValidator,
        }
    }

    /// Returns `true` for pending-phase priorities.
    pub fn is_pending(&self) -> bool {
        *self <= Self::SupernetPermissionedValidatorPending
    }

    /// Returns `true` for current-phase priorities.
    pub fn is_current(&self) -> bool {
        !self.is_pending()
    }

    /// Returns `true` for validator priorities.
    pub fn is_validator(&self) -> bool {
        self.kind().is_validator()
    }

    /// Returns `true` for delegator priorities.
    pub fn is_delegator(&self) -> bool {
        self.kind().is_delegator()
    }

    /// Returns `true` for permissioned validator priorities.
    pub fn is_permissioned(&self) -> bool {
        self.kind() == StakerKind::PermissionedValidator
    }
}

/// A staking transaction as seen by the ledger: already syntactically valid
/// and authorized, carrying only what the staker registry needs.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct StakerTx {
    /// The identity of the originating transaction.
    pub tx_id: Id,
    /// The kind of commitment made.
    pub kind: StakerKind,
    /// The node being validated or delegated to.
    pub node_id: NodeId,
    /// The supernet the commitment applies to.
    pub supernet_id: Id,
    /// The validator's consensus public key, if it registered one.
    #[serde(default)]
    pub public_key: Option<Vec<u8>>,
    /// The amount staked.
    pub weight: u64,
    /// Unix time (seconds) at which the staker becomes current.
    pub start_time: u64,
    /// Unix time (seconds) at which the staker stops staking.
    pub end_time: u64,
    /// The owner credited with the staking reward.
    pub reward_owner: Id,
}

impl StakerTx {
    /// The length of the staking period in seconds.
    pub fn duration(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// The ordering key of every staker set: `next_time`, then `priority`, then
/// `tx_id` for determinism.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StakerKey {
    /// The time the staker next changes state.
    pub next_time: u64,
    /// The staker's phase-aware priority.
    pub priority: Priority,
    /// The originating transaction.
    pub tx_id: Id,
}

/// One validation or delegation commitment.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Staker {
    /// The identity of the originating transaction.
    pub tx_id: Id,
    /// The node being validated or delegated to.
    pub node_id: NodeId,
    /// The validator's consensus public key, if any.
    pub public_key: Option<Vec<u8>>,
    /// The supernet this commitment applies to.
    pub supernet_id: Id,
    /// The amount staked.
    pub weight: u64,
    /// Unix time (seconds) at which the staker becomes current.
    pub start_time: u64,
    /// Unix time (seconds) at which the staker stops staking.
    pub end_time: u64,
    /// The reward owed at retirement, fixed at promotion.
    pub potential_reward: u64,
    /// `start_time` while pending, `end_time` while current.
    pub next_time: u64,
    /// Kind and phase of the staker.
    pub priority: Priority,
}

impl Staker {
    /// Creates the pending staker for a staking transaction.
    pub fn new_pending(tx: &StakerTx) -> Result<Self, StateError> {
        Self::check_window(tx)?;
        Ok(Self {
            tx_id: tx.tx_id,
            node_id: tx.node_id,
            public_key: tx.public_key.clone(),
            supernet_id: tx.supernet_id,
            weight: tx.weight,
            start_time: tx.start_time,
            end_time: tx.end_time,
            potential_reward: 0,
            next_time: tx.start_time,
            priority: Priority::pending(tx.kind),
        })
    }

    /// Creates the current staker for a staking transaction, e.g. at genesis.
    pub fn new_current(tx: &StakerTx, potential_reward: u64) -> Result<Self, StateError> {
        Self::check_window(tx)?;
        Ok(Self {
            tx_id: tx.tx_id,
            node_id: tx.node_id,
            public_key: tx.public_key.clone(),
            supernet_id: tx.supernet_id,
            weight: tx.weight,
            start_time: tx.start_time,
            end_time: tx.end_time,
            potential_reward,
            next_time: tx.end_time,
            priority: Priority::current(tx.kind),
        })
    }

    fn check_window(tx: &StakerTx) -> Result<(), StateError> {
        if tx.start_time >= tx.end_time {
            return Err(StateError::InvalidStaker(format!(
                "staker {} has start time {} not before end time {}",
                tx.tx_id, tx.start_time, tx.end_time
            )));
        }
        Ok(())
    }

    /// Returns the current-phase copy of a pending staker, carrying the
    /// reward computed at promotion.
    pub fn promoted(&self, potential_reward: u64) -> Self {
        Self {
            potential_reward,
            next_time: self.end_time,
            priority: self.priority.to_current(),
            ..self.clone()
        }
    }

    /// The key that orders this staker within any staker set.
    pub fn key(&self) -> StakerKey {
        StakerKey {
            next_time: self.next_time,
            priority: self.priority,
            tx_id: self.tx_id,
        }
    }

    /// The length of the staking period in seconds.
    pub fn duration(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}
