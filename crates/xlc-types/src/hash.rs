use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A 32-byte hash: receipts roots, trie node hashes, event topics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct H256([u8; 32]);

impl H256 {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero hash.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a slice, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// `0x`-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short hex representation (first 8 characters, no prefix).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        parse_fixed::<32>(s).map(Self)
    }
}

/// Parse a fixed-length hex string, with or without `0x` prefix.
pub(crate) fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypeError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    bytes.as_slice().try_into().map_err(|_| TypeError::InvalidLength {
        expected: N,
        actual: bytes.len(),
    })
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.short_hex())
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<H256> for [u8; 32] {
    fn from(h: H256) -> Self {
        h.0
    }
}

impl AsRef<[u8]> for H256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for H256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_all_zeros() {
        assert!(H256::zero().is_zero());
        assert!(!H256::new([1; 32]).is_zero());
    }

    #[test]
    fn hex_roundtrip_with_and_without_prefix() {
        let h = H256::new([0xab; 32]);
        assert_eq!(H256::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(H256::from_hex(&hex::encode([0xab; 32])).unwrap(), h);
    }

    #[test]
    fn from_hex_wrong_length() {
        let err = H256::from_hex("0xabcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 32, actual: 2 });
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(H256::from_slice(&[0u8; 31]).is_err());
        assert_eq!(H256::from_slice(&[7u8; 32]).unwrap(), H256::new([7; 32]));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let h = H256::new([0x11; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert!(json.starts_with("\"0x1111"));
        let parsed: H256 = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, h);
    }
}
