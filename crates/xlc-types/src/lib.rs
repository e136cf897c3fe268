//! Foundation types for the cross-ledger commit (XLC) workspace.
//!
//! Every other XLC crate depends on `xlc-types`.
//!
//! # Key Types
//!
//! - [`LedgerId`]: Identifier of an independent ledger
//! - [`Address`]: 20-byte contract or signer address
//! - [`H256`]: 32-byte hash (receipts roots, event topics, node hashes)
//! - [`TransactionId`]: 255-bit random cross-ledger transaction identifier
//! - [`CallPath`]: Position of a node inside a call graph
//! - [`Clock`]: Injectable epoch-seconds time source

pub mod call_path;
pub mod clock;
pub mod error;
pub mod hash;
pub mod hex_bytes;
pub mod ledger;
pub mod transaction;

pub use call_path::CallPath;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TypeError;
pub use hash::H256;
pub use ledger::{Address, LedgerId};
pub use transaction::TransactionId;
