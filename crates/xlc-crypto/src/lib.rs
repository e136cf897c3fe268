//! Cryptographic primitives for cross-ledger commit.
//!
//! Provides keccak-256 hashing (trie nodes, event topics, signing digests)
//! and secp256k1 recoverable signatures whose signer is identified by a
//! 20-byte address recovered from the signature itself.
//!
//! All crypto operations wrap established libraries; there is no custom
//! cryptography here.

pub mod hasher;
pub mod signer;

pub use hasher::{event_topic, keccak256, keccak256_concat, EMPTY_KECCAK};
pub use signer::{
    recover, verify, RecoverableSignature, SignatureError, SignerSignature, SigningIdentity,
    SigningKey,
};
