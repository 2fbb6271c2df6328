// Path: crates/types/src/config/genesis.rs
use crate::error::StateError;
use crate::ledger::{ChainRecord, Utxo};
use crate::staker::{StakerKind, StakerTx};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Initial ledger content written into an empty store.
///
/// Genesis validators are placed directly in the current set; their start
/// time must equal the genesis timestamp.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Genesis {
    /// Initial chain time (Unix seconds).
    pub timestamp: u64,
    /// Initial primary network supply.
    #[serde(default)]
    pub initial_supply: u64,
    /// Initial primary network reward pool.
    #[serde(default)]
    pub initial_reward_pool: u64,
    /// Initial UTXOs.
    #[serde(default)]
    pub utxos: Vec<Utxo>,
    /// Initial primary network validators.
    #[serde(default)]
    pub validators: Vec<StakerTx>,
    /// Chains created at genesis on the primary network.
    #[serde(default)]
    pub chains: Vec<ChainRecord>,
}

impl Genesis {
    /// Validates the genesis for semantic correctness.
    pub fn validate(&self) -> Result<(), StateError> {
        let mut nodes = BTreeSet::new();
        let mut txs = BTreeSet::new();
        for v in &self.validators {
            if v.kind != StakerKind::PrimaryValidator || !v.supernet_id.is_primary_network() {
                return Err(StateError::InvalidConfig(format!(
                    "genesis staker {} must be a primary network validator",
                    v.tx_id
                )));
            }
            if v.start_time != self.timestamp {
                return Err(StateError::InvalidConfig(format!(
                    "genesis validator {} must start at the genesis timestamp {}",
                    v.tx_id, self.timestamp
                )));
            }
            if v.end_time <= v.start_time {
                return Err(StateError::InvalidConfig(format!(
                    "genesis validator {} ends before it starts",
                    v.tx_id
                )));
            }
            if !nodes.insert(v.node_id) || !txs.insert(v.tx_id) {
                return Err(StateError::InvalidConfig(format!(
                    "genesis validator {} duplicates a node or transaction id",
                    v.tx_id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Id, NodeId};

    const GENESIS: &str = r#"
timestamp = 1000
initial_supply = 360000000
initial_reward_pool = 5000

[[validators]]
tx_id = "0000000000000000000000000000000000000000000000000000000000000001"
kind = "primary_validator"
node_id = "0101010101010101010101010101010101010101"
supernet_id = "0000000000000000000000000000000000000000000000000000000000000000"
weight = 2000
start_time = 1000
end_time = 2000000
reward_owner = "00000000000000000000000000000000000000000000000000000000000000aa"
"#;

    #[test]
    fn test_genesis_parses_from_toml() {
        let genesis: Genesis = toml::from_str(GENESIS).unwrap();
        genesis.validate().unwrap();
        assert_eq!(genesis.validators.len(), 1);
        let v = &genesis.validators[0];
        assert_eq!(v.tx_id, Id::from_u64(1));
        assert_eq!(v.node_id, NodeId([1u8; 20]));
        assert!(v.public_key.is_none());
    }

    #[test]
    fn test_genesis_rejects_late_validator() {
        let mut genesis: Genesis = toml::from_str(GENESIS).unwrap();
        genesis.validators[0].start_time = 1001;
        assert!(matches!(genesis.validate(), Err(StateError::InvalidConfig(_))));
    }

    #[test]
    fn test_genesis_rejects_duplicate_nodes() {
        let mut genesis: Genesis = toml::from_str(GENESIS).unwrap();
        let mut dup = genesis.validators[0].clone();
        dup.tx_id = Id::from_u64(2);
        genesis.validators.push(dup);
        assert!(genesis.validate().is_err());
    }
}
