use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use xlc_types::{Address, H256};

use crate::hasher::keccak256;

/// Something that can sign on behalf of an address.
///
/// Ledgers identify signers by the address recovered from a signature, so an
/// identity only has to expose its address and a signing function.
pub trait SigningIdentity: Send + Sync {
    fn address(&self) -> Address;

    /// Sign the keccak-256 digest of `message`.
    fn sign(&self, message: &[u8]) -> RecoverableSignature;
}

/// secp256k1 signing key (private).
#[derive(Clone)]
pub struct SigningKey(libsecp256k1::SecretKey);

/// An ECDSA signature with its recovery byte (`v` is 27 or 28).
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    pub r: H256,
    pub s: H256,
    pub v: u8,
}

/// A signature paired with the address that claims to have produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSignature {
    pub signer: Address,
    pub signature: RecoverableSignature,
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        loop {
            OsRng.fill_bytes(&mut bytes);
            // Rejects zero and values at or above the curve order.
            if let Ok(key) = libsecp256k1::SecretKey::parse(&bytes) {
                return Self(key);
            }
        }
    }

    /// Create from a raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        libsecp256k1::SecretKey::parse(&bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    /// Raw secret key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.serialize()
    }

    /// Address derived from the public key: the last 20 bytes of the
    /// keccak-256 of the uncompressed point.
    pub fn address(&self) -> Address {
        let public = libsecp256k1::PublicKey::from_secret_key(&self.0);
        address_of(&public)
    }

    /// Sign the keccak-256 digest of `message`.
    pub fn sign(&self, message: &[u8]) -> RecoverableSignature {
        let digest = libsecp256k1::Message::parse(keccak256(message).as_bytes());
        let (signature, recovery_id) = libsecp256k1::sign(&digest, &self.0);
        let bytes = signature.serialize();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        RecoverableSignature {
            r: H256::new(r),
            s: H256::new(s),
            v: 27 + recovery_id.serialize(),
        }
    }
}

impl SigningIdentity for SigningKey {
    fn address(&self) -> Address {
        SigningKey::address(self)
    }

    fn sign(&self, message: &[u8]) -> RecoverableSignature {
        SigningKey::sign(self, message)
    }
}

impl SignerSignature {
    /// Sign `message` with `identity` and record who signed.
    pub fn create(identity: &dyn SigningIdentity, message: &[u8]) -> Self {
        Self {
            signer: identity.address(),
            signature: identity.sign(message),
        }
    }

    /// Check that the signature over `message` recovers to `signer`.
    pub fn verify(&self, message: &[u8]) -> Result<(), SignatureError> {
        verify(message, &self.signature, &self.signer)
    }
}

/// Recover the signing address from a signature over `message`.
pub fn recover(message: &[u8], signature: &RecoverableSignature) -> Result<Address, SignatureError> {
    let recovery = signature
        .v
        .checked_sub(27)
        .ok_or(SignatureError::InvalidRecoveryId(signature.v))?;
    let recovery_id = libsecp256k1::RecoveryId::parse(recovery)
        .map_err(|_| SignatureError::InvalidRecoveryId(signature.v))?;

    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(signature.r.as_bytes());
    bytes[32..].copy_from_slice(signature.s.as_bytes());
    let parsed = libsecp256k1::Signature::parse_standard(&bytes)
        .map_err(|_| SignatureError::InvalidSignature)?;

    let digest = libsecp256k1::Message::parse(keccak256(message).as_bytes());
    let public = libsecp256k1::recover(&digest, &parsed, &recovery_id)
        .map_err(|_| SignatureError::InvalidSignature)?;
    Ok(address_of(&public))
}

/// Verify that `signature` over `message` was produced by `expected`.
pub fn verify(
    message: &[u8],
    signature: &RecoverableSignature,
    expected: &Address,
) -> Result<(), SignatureError> {
    let recovered = recover(message, signature)?;
    if recovered != *expected {
        return Err(SignatureError::SignerMismatch {
            expected: *expected,
            recovered,
        });
    }
    Ok(())
}

fn address_of(public: &libsecp256k1::PublicKey) -> Address {
    let uncompressed = public.serialize();
    let hash = keccak256(&uncompressed[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash.as_bytes()[12..]);
    Address::new(out)
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RecoverableSignature({}..., v={})",
            hex::encode(&self.r.as_bytes()[..8]),
            self.v
        )
    }
}

/// Errors from signing operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    #[error("signature recovers to {recovered}, expected {expected}")]
    SignerMismatch { expected: Address, recovered: Address },
}
