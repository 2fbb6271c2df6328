// Path: crates/types/src/ledger.rs
//! Ledger records other than stakers.

use crate::config::StakingConfig;
use crate::error::StateError;
use crate::ids::{Id, NodeId};
use crate::staker::StakerTx;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The staking asset of the primary network.
pub const PRIMARY_ASSET_ID: Id = Id::EMPTY;

/// Identifies one output of one transaction.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
)]
pub struct UtxoId {
    /// The transaction that produced the output.
    pub tx_id: Id,
    /// The position of the output within the transaction.
    pub output_index: u32,
}

impl UtxoId {
    /// Fixed-width key bytes: tx id followed by the big-endian output index.
    pub fn to_key_bytes(&self) -> Vec<u8> {
        [self.tx_id.as_ref(), &self.output_index.to_be_bytes()].concat()
    }
}

/// An unspent transaction output.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Utxo {
    /// Where the output came from.
    pub id: UtxoId,
    /// The asset held.
    pub asset_id: Id,
    /// The amount held.
    pub amount: u64,
    /// Who may spend it.
    pub owner: Id,
}

/// A supernet created on the platform chain.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct SupernetRecord {
    /// The supernet id (the id of its creation transaction).
    pub id: Id,
    /// The owner authorized to admit permissioned validators.
    pub owner: Id,
}

/// A blockchain validated by a supernet.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct ChainRecord {
    /// The chain id (the id of its creation transaction).
    pub id: Id,
    /// The supernet validating the chain.
    pub supernet_id: Id,
    /// Human-readable name.
    pub name: String,
    /// The virtual machine the chain runs.
    pub vm_id: Id,
}

/// Converts a supernet into a permissionless one with its own staking asset,
/// supply and reward curve.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct SupernetTransformation {
    /// The transformed supernet.
    pub supernet_id: Id,
    /// The asset staked on the supernet.
    pub asset_id: Id,
    /// The supernet's circulating supply at transformation.
    pub initial_supply: u64,
    /// The balance set aside for staking rewards at transformation.
    pub initial_reward_pool: u64,
    /// Staking bounds and reward curve of the supernet.
    pub staking: StakingConfig,
}

/// Acceptance status of a stored transaction.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TxStatus {
    /// Accepted into the chain.
    Committed,
    /// Rejected by consensus.
    Aborted,
}

/// The ledger-relevant content of a transaction.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub enum TxBody {
    /// Adds a validator or delegator to a pending set.
    AddStaker(StakerTx),
    /// Creates a supernet.
    CreateSupernet(SupernetRecord),
    /// Creates a chain on a supernet.
    CreateChain(ChainRecord),
    /// Makes a supernet permissionless.
    TransformSupernet(SupernetTransformation),
    /// Retires the next permissionless staker, paying or forfeiting its reward.
    RewardStaker {
        /// The transaction that created the staker being retired.
        staker_tx_id: Id,
    },
    /// Advances chain time.
    AdvanceTime {
        /// The new chain time.
        timestamp: u64,
    },
}

/// A transaction as recorded in the ledger's transaction registry.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct StoredTx {
    /// The transaction id.
    pub id: Id,
    /// The ledger-relevant content.
    pub body: TxBody,
}

/// The change of one validator's total weight at one height.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ValidatorWeightDiff {
    /// `true` if the weight went down.
    pub decrease: bool,
    /// The magnitude of the change.
    pub amount: u64,
}

impl ValidatorWeightDiff {
    /// Folds another signed change into this one.
    pub fn add(&mut self, decrease: bool, amount: u64) -> Result<(), StateError> {
        if self.decrease == decrease {
            self.amount = self.amount.checked_add(amount).ok_or_else(|| {
                StateError::Overflow(format!("weight diff {} + {}", self.amount, amount))
            })?;
        } else if self.amount >= amount {
            self.amount -= amount;
        } else {
            self.amount = amount - self.amount;
            self.decrease = decrease;
        }
        Ok(())
    }

    /// Returns `true` if the change nets to nothing.
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

/// One entry of a supernet's validator set as consumed by consensus.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct ValidatorEntry {
    /// The validating node.
    pub node_id: NodeId,
    /// Validator weight plus the weight of its current delegators.
    pub weight: u64,
    /// The validator's consensus public key, if registered.
    pub public_key: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_diff_nets_opposite_signs() {
        let mut diff = ValidatorWeightDiff::default();
        diff.add(false, 10).unwrap();
        diff.add(true, 4).unwrap();
        assert_eq!(diff, ValidatorWeightDiff { decrease: false, amount: 6 });

        diff.add(true, 9).unwrap();
        assert_eq!(diff, ValidatorWeightDiff { decrease: true, amount: 3 });

        diff.add(false, 3).unwrap();
        assert!(diff.is_zero());
    }

    #[test]
    fn test_weight_diff_overflow_is_an_error() {
        let mut diff = ValidatorWeightDiff { decrease: false, amount: u64::MAX };
        assert!(matches!(diff.add(false, 1), Err(StateError::Overflow(_))));
    }

    #[test]
    fn test_utxo_key_bytes_are_fixed_width() {
        let id = UtxoId { tx_id: Id::from_u64(5), output_index: 2 };
        let key = id.to_key_bytes();
        assert_eq!(key.len(), 36);
        assert_eq!(&key[32..], &2u32.to_be_bytes());
    }
}
