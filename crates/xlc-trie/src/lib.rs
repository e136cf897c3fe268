//! Merkle-Patricia trie engine.
//!
//! A radix-16 trie over nibble-encoded keys whose node encoding and root
//! hash are byte-compatible with Ethereum's receipts trie. Besides the root,
//! the trie emits inclusion proofs: the encodings of every node from the
//! leaf up to the root, which [`InclusionPath`] turns into
//! `(offset, node)` steps that can be replayed without the trie.

pub mod error;
pub mod nibbles;
pub mod node;
pub mod proof;
pub mod trie;

pub use error::{TrieError, TrieResult};
pub use proof::{InclusionPath, ProofStep, TrieProof};
pub use trie::{index_key, ordered_root, PatriciaTrie, EMPTY_ROOT};
