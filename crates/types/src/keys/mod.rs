// Path: crates/types/src/keys/mod.rs
//! Defines the persisted key layout of the ledger.
//!
//! Every record lives in one ordered key space. Fixed prefixes separate the
//! record kinds; identifiers and heights are appended as fixed-width bytes so
//! lexicographic order over raw keys matches the order the ledger needs.

use crate::error::StateError;
use crate::ids::{Id, NodeId};
use crate::ledger::UtxoId;

/// The key of the chain timestamp.
pub const TIMESTAMP_KEY: &[u8] = b"ledger::timestamp";
/// The key of the last committed height.
pub const HEIGHT_KEY: &[u8] = b"ledger::height";
/// The key of the fee pool.
pub const FEE_POOL_KEY: &[u8] = b"ledger::fee_pool";
/// Prefix of per-supernet current supply records, keyed by supernet id.
pub const CURRENT_SUPPLY_PREFIX: &[u8] = b"ledger::supply::";
/// Prefix of per-supernet reward pool records, keyed by supernet id.
pub const REWARD_POOL_PREFIX: &[u8] = b"ledger::reward_pool::";

/// Prefix of the current staker set, keyed by tx id.
pub const CURRENT_STAKER_PREFIX: &[u8] = b"stakers::current::";
/// Prefix of the pending staker set, keyed by tx id.
pub const PENDING_STAKER_PREFIX: &[u8] = b"stakers::pending::";
/// Prefix of per-height validator weight diffs.
pub const WEIGHT_DIFF_PREFIX: &[u8] = b"stakers::weight_diff::";
/// Prefix of per-height validator public key diffs.
pub const PUBLIC_KEY_DIFF_PREFIX: &[u8] = b"stakers::pk_diff::";

/// Prefix of unspent outputs, keyed by `UtxoId`.
pub const UTXO_PREFIX: &[u8] = b"utxo::";
/// Prefix of reward outputs, keyed by staker tx id then output index.
pub const REWARD_UTXO_PREFIX: &[u8] = b"reward_utxo::";
/// Prefix of supernet records, keyed by supernet id.
pub const SUPERNET_PREFIX: &[u8] = b"supernet::";
/// Prefix of supernet transformations, keyed by supernet id.
pub const TRANSFORMATION_PREFIX: &[u8] = b"transformation::";
/// Prefix of chain records, keyed by supernet id then chain id.
pub const CHAIN_PREFIX: &[u8] = b"chain::";
/// Prefix of stored transactions, keyed by tx id.
pub const TX_PREFIX: &[u8] = b"tx::";

/// Length of a validator diff key suffix: supernet, inverted height, node.
pub const VALIDATOR_DIFF_SUFFIX_LEN: usize = Id::LEN + 8 + NodeId::LEN;

/// Appends an identifier to a prefix.
pub fn id_key(prefix: &[u8], id: &Id) -> Vec<u8> {
    [prefix, id.as_ref()].concat()
}

/// The current-supply key of a supernet.
pub fn supply_key(supernet_id: &Id) -> Vec<u8> {
    id_key(CURRENT_SUPPLY_PREFIX, supernet_id)
}

/// The reward-pool key of a supernet.
pub fn reward_pool_key(supernet_id: &Id) -> Vec<u8> {
    id_key(REWARD_POOL_PREFIX, supernet_id)
}

/// The key of an unspent output.
pub fn utxo_key(id: &UtxoId) -> Vec<u8> {
    [UTXO_PREFIX, &id.to_key_bytes()].concat()
}

/// The key of a reward output created when `staker_tx_id` retired.
pub fn reward_utxo_key(staker_tx_id: &Id, output_index: u32) -> Vec<u8> {
    [REWARD_UTXO_PREFIX, staker_tx_id.as_ref(), &output_index.to_be_bytes()].concat()
}

/// The key of a chain record.
pub fn chain_key(supernet_id: &Id, chain_id: &Id) -> Vec<u8> {
    [CHAIN_PREFIX, supernet_id.as_ref(), chain_id.as_ref()].concat()
}

/// Encodes a height so that higher heights sort first.
#[inline]
pub fn inverted_height(height: u64) -> [u8; 8] {
    (!height).to_be_bytes()
}

/// The key of a validator diff (weight or public key) under `prefix`.
///
/// All diffs of one supernet at one height are contiguous, and a scan started
/// at a given height walks towards older heights.
pub fn validator_diff_key(prefix: &[u8], supernet_id: &Id, height: u64, node_id: &NodeId) -> Vec<u8> {
    [
        prefix,
        supernet_id.as_ref(),
        &inverted_height(height),
        node_id.as_ref(),
    ]
    .concat()
}

/// The first key of all diffs of `supernet_id` at `height` and below.
pub fn validator_diff_scan_start(prefix: &[u8], supernet_id: &Id, height: u64) -> Vec<u8> {
    [prefix, supernet_id.as_ref(), &inverted_height(height)].concat()
}

/// Splits a validator diff key into `(supernet, height, node)`.
pub fn parse_validator_diff_key(prefix: &[u8], key: &[u8]) -> Result<(Id, u64, NodeId), StateError> {
    let suffix = key
        .strip_prefix(prefix)
        .ok_or_else(|| StateError::Decode("validator diff key has a foreign prefix".into()))?;
    if suffix.len() != VALIDATOR_DIFF_SUFFIX_LEN {
        return Err(StateError::Decode(format!(
            "validator diff key suffix has length {}, expected {}",
            suffix.len(),
            VALIDATOR_DIFF_SUFFIX_LEN
        )));
    }
    let (supernet, rest) = suffix.split_at(Id::LEN);
    let (height, node) = rest.split_at(8);
    let mut raw = [0u8; 8];
    raw.copy_from_slice(height);
    Ok((
        Id::from_slice(supernet).map_err(StateError::Decode)?,
        !u64::from_be_bytes(raw),
        NodeId::from_slice(node).map_err(StateError::Decode)?,
    ))
}

/// Reads the identifier that follows `prefix` in `key`.
pub fn parse_id_suffix(prefix: &[u8], key: &[u8]) -> Result<Id, StateError> {
    let suffix = key
        .strip_prefix(prefix)
        .ok_or_else(|| StateError::Decode("key has a foreign prefix".into()))?;
    Id::from_slice(suffix).map_err(StateError::Decode)
}

/// Decodes an 8-byte big-endian integer value.
pub fn decode_u64(bytes: &[u8]) -> Result<u64, StateError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StateError::Decode(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_diff_key_parses_back() {
        let supernet = Id::from_u64(3);
        let node = NodeId([9u8; 20]);
        let key = validator_diff_key(WEIGHT_DIFF_PREFIX, &supernet, 77, &node);
        let (s, h, n) = parse_validator_diff_key(WEIGHT_DIFF_PREFIX, &key).unwrap();
        assert_eq!((s, h, n), (supernet, 77, node));
    }

    #[test]
    fn test_higher_heights_sort_first() {
        let supernet = Id::EMPTY;
        let node = NodeId([1u8; 20]);
        let newer = validator_diff_key(WEIGHT_DIFF_PREFIX, &supernet, 10, &node);
        let older = validator_diff_key(WEIGHT_DIFF_PREFIX, &supernet, 9, &node);
        assert!(newer < older);
        let start = validator_diff_scan_start(WEIGHT_DIFF_PREFIX, &supernet, 10);
        assert!(start <= newer && start < older);
        assert!(validator_diff_scan_start(WEIGHT_DIFF_PREFIX, &supernet, 11) < newer);
    }

    #[test]
    fn test_malformed_diff_key_is_a_decode_error() {
        let mut key = validator_diff_key(WEIGHT_DIFF_PREFIX, &Id::EMPTY, 1, &NodeId::default());
        key.pop();
        assert!(matches!(
            parse_validator_diff_key(WEIGHT_DIFF_PREFIX, &key),
            Err(StateError::Decode(_))
        ));
        assert!(parse_validator_diff_key(PUBLIC_KEY_DIFF_PREFIX, &key).is_err());
    }

    #[test]
    fn test_u64_values_require_eight_bytes() {
        assert_eq!(decode_u64(&5u64.to_be_bytes()).unwrap(), 5);
        assert!(decode_u64(&[0u8; 7]).is_err());
    }
}
