// Path: crates/types/src/codec.rs

//! The canonical, deterministic binary codec for every persisted ledger record.
//!
//! Thin wrappers around `parity-scale-codec` (SCALE). Every node must produce
//! byte-identical records for the same staker set, so all persistence goes
//! through these two functions rather than ad-hoc `encode()` calls.

use crate::error::StateError;
use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical byte representation.
///
/// Fails on any decoding error, including trailing bytes, naming `what` in the
/// error so a corrupt record can be located.
pub fn from_bytes_canonical<T: Decode>(b: &[u8], what: &str) -> Result<T, StateError> {
    T::decode_all(&mut &*b)
        .map_err(|e| StateError::Decode(format!("canonical decode of {what} failed: {e}")))
}
