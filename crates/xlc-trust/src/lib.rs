//! Cross-ledger trust.
//!
//! A [`Proof`] lets one ledger believe an event emitted on another. It comes
//! in two forms, one per [`TrustStrategy`]:
//!
//! - [`ReceiptRootTransfer`] proves inclusion of the emitting receipt in a
//!   block's receipts trie; signers co-sign the block's receipts root and
//!   the root is published to the target ledgers ahead of time.
//! - [`SignedEventStrategy`] has signers sign the event itself; the proof
//!   is self-certifying and nothing is published.
//!
//! A deployment picks one strategy and uses it for every transaction.

pub mod error;
pub mod proof;
pub mod receipt_root;
pub mod signed_event;
pub mod strategy;

pub use error::{TrustError, TrustResult};
pub use proof::{
    majority, signed_event_message, Proof, ReceiptInclusionProof, SignedEventProof, TrustAnchor,
};
pub use receipt_root::ReceiptRootTransfer;
pub use signed_event::SignedEventStrategy;
pub use strategy::{register_signers, StrategyKind, TrustStrategy};

#[cfg(test)]
mod test_support;
