//! Call graph model.
//!
//! A [`CallGraphNode`] tree describes one logical cross-ledger transaction:
//! the root is the entry call, and every other node is a call the entry
//! makes, directly or transitively, on some ledger. A node's position is its
//! [`CallPath`](xlc_types::CallPath).

pub mod error;
pub mod node;

pub use error::{GraphError, GraphResult};
pub use node::CallGraphNode;
