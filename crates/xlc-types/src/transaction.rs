use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::parse_fixed;

/// Identifier of one cross-ledger transaction.
///
/// A 255-bit unsigned integer stored big-endian in 32 bytes; the top bit is
/// always clear. Ids are drawn from the operating system's CSPRNG so that
/// collisions between independently started transactions are negligible.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    /// Draw a fresh random id.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        bytes[0] &= 0x7f;
        Self(bytes)
    }

    /// Create from big-endian bytes. Fails if the value needs 256 bits.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, TypeError> {
        if bytes[0] & 0x80 != 0 {
            return Err(TypeError::OutOfRange("transaction id exceeds 255 bits".into()));
        }
        Ok(Self(bytes))
    }

    /// Create from a small integer (tests and demos).
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Big-endian bytes with leading zeros removed (the integer's minimal form).
    pub fn minimal_bytes(&self) -> &[u8] {
        let first = self.0.iter().position(|b| *b != 0).unwrap_or(32);
        &self.0[first..]
    }

    /// `0x`-prefixed hex of all 32 bytes.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        Self::from_bytes(parse_fixed::<32>(s)?)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({}..)", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
