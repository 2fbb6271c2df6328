// Path: crates/types/src/ids.rs
//! Fixed-width identifiers used throughout the ledger.
//!
//! `Id` is the 32-byte identity of transactions, supernets, chains and assets.
//! `NodeId` is the 20-byte identity of a staking node. Both render as lowercase
//! hex and serialize to hex strings in human-readable formats (TOML, JSON), so
//! genesis files stay legible.

use parity_scale_codec::{Decode, Encode};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 32-byte identifier (transaction, supernet, chain or asset).
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Id(pub [u8; 32]);

/// The reserved identifier of the primary network.
pub const PRIMARY_NETWORK_ID: Id = Id::EMPTY;

impl Id {
    /// The all-zero identifier.
    pub const EMPTY: Id = Id([0u8; 32]);
    /// The byte length of an encoded `Id`.
    pub const LEN: usize = 32;

    /// Builds an identifier from a slice, failing if the length is not exactly 32.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| format!("expected {} bytes for Id, got {}", Self::LEN, bytes.len()))?;
        Ok(Self(arr))
    }

    /// Returns `true` if this is the primary network identifier.
    pub fn is_primary_network(&self) -> bool {
        *self == PRIMARY_NETWORK_ID
    }

    /// Builds an identifier whose last 8 bytes hold `n` in big-endian order.
    /// Useful for deriving distinct test and genesis ids.
    pub fn from_u64(n: u64) -> Self {
        let mut out = [0u8; 32];
        if let Some(tail) = out.get_mut(24..) {
            tail.copy_from_slice(&n.to_be_bytes());
        }
        Self(out)
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Id {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", hex::encode(self.0))
    }
}

impl FromStr for Id {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| e.to_string())?;
        Self::from_slice(&bytes)
    }
}

/// A 20-byte identifier of a staking node.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct NodeId(pub [u8; 20]);

impl NodeId {
    /// The byte length of an encoded `NodeId`.
    pub const LEN: usize = 20;

    /// Builds a node identifier from a slice, failing if the length is not exactly 20.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| format!("expected {} bytes for NodeId, got {}", Self::LEN, bytes.len()))?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for NodeId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeID-{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", hex::encode(self.0))
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim_start_matches("NodeID-").trim_start_matches("0x");
        let bytes = hex::decode(raw).map_err(|e| e.to_string())?;
        Self::from_slice(&bytes)
    }
}

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_serde!(Id);
hex_serde!(NodeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_hex_roundtrip() {
        let id = Id::from_u64(42);
        let parsed: Id = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(!id.is_primary_network());
        assert!(PRIMARY_NETWORK_ID.is_primary_network());
    }

    #[test]
    fn test_node_id_accepts_prefixed_form() {
        let node = NodeId([7u8; 20]);
        let parsed: NodeId = node.to_string().parse().unwrap();
        assert_eq!(node, parsed);
        assert!("NodeID-abcd".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_id_rejects_wrong_length() {
        assert!(Id::from_slice(&[1u8; 31]).is_err());
        assert!(Id::from_slice(&[1u8; 33]).is_err());
    }

    #[test]
    fn test_id_serde_is_hex_string() {
        let id = Id::from_u64(1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
