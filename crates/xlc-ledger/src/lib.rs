//! Ledger collaborator boundary.
//!
//! The commit engine never looks inside a ledger. It submits
//! [`ControlCall`]s to contracts, reads back [`TransactionReceipt`]s and
//! [`Block`]s, and decodes control events from receipt logs. Everything a
//! ledger must offer is the [`Ledger`] trait; the [`LedgerRegistry`] maps
//! ledger ids to connections and is shared across transactions.

pub mod call;
pub mod error;
pub mod events;
pub mod receipt;
pub mod registry;
pub mod traits;

pub use call::{receipts_root_message, ControlCall};
pub use error::{LedgerError, LedgerResult};
pub use events::{ControlEvent, RootEvent, SegmentEvent, SignallingEvent, StartEvent};
pub use receipt::{Block, Bloom, Log, Receipt, TransactionReceipt};
pub use registry::{LedgerHandle, LedgerRegistry};
pub use traits::Ledger;
