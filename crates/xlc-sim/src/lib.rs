//! Simulated ledgers for tests and demos.
//!
//! A [`SimLedger`] mines one block per accepted call and keeps every block,
//! so receipts roots and inclusion proofs are real. Each ledger hosts:
//!
//! - a control contract that runs Start, Segment, Root, and Signalling and
//!   checks every incoming proof against what the ledger trusts;
//! - a root-storage contract holding signer registrations and co-signed
//!   receipts roots of other ledgers;
//! - any number of [`KvStore`] business contracts driven by [`KvOp`]
//!   payloads, whose writes stay locked until Signalling when executed as a
//!   segment.
//!
//! Faults can be injected per ledger: an unreachable node, or a block header
//! whose receipts root does not match its receipts.

pub mod contract;
pub mod kv;
pub mod ledger;
pub mod network;
pub mod scenario;

pub use kv::{KvOp, KvStore};
pub use ledger::SimLedger;
pub use network::SimNetwork;
