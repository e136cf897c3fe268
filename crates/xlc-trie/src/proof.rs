use serde::{Deserialize, Serialize};
use xlc_crypto::keccak256;
use xlc_types::H256;

use crate::error::{TrieError, TrieResult};

/// Raw output of [`PatriciaTrie::prove`](crate::PatriciaTrie::prove).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrieProof {
    /// Root hash of the trie the proof was taken from.
    pub root: H256,
    /// The proven value.
    pub value: Vec<u8>,
    /// Encodings of every node from the leaf to the root, leaf first.
    pub nodes: Vec<Vec<u8>>,
}

/// One replay step: a node encoding and the offset inside it at which the
/// previous step's reference is embedded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub offset: usize,
    #[serde(with = "xlc_types::hex_bytes")]
    pub node: Vec<u8>,
}

/// A compact inclusion proof that recomputes a root node by node.
///
/// The first step embeds the value itself. Each later step embeds the
/// previous node: its keccak-256 hash when the encoding is 32 bytes or
/// longer, its raw encoding otherwise. The last node is always hashed to
/// give the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionPath {
    #[serde(with = "xlc_types::hex_bytes")]
    pub value: Vec<u8>,
    pub steps: Vec<ProofStep>,
}

impl TrieProof {
    /// Locate each reference inside its parent node and check that the
    /// replayed root matches [`TrieProof::root`].
    pub fn inclusion_path(&self) -> TrieResult<InclusionPath> {
        let mut steps = Vec::with_capacity(self.nodes.len());
        let mut reference = self.value.clone();
        for (step, node) in self.nodes.iter().enumerate() {
            let offset = find_offset(node, &reference).ok_or(TrieError::ReferenceNotFound { step })?;
            steps.push(ProofStep {
                offset,
                node: node.clone(),
            });
            reference = reference_to(node);
        }
        let path = InclusionPath {
            value: self.value.clone(),
            steps,
        };
        let computed = path.replay()?;
        if computed != self.root {
            return Err(TrieError::RootMismatch {
                expected: self.root,
                computed,
            });
        }
        Ok(path)
    }
}

impl InclusionPath {
    /// Recompute the root, checking every embedded reference on the way up.
    pub fn replay(&self) -> TrieResult<H256> {
        let last = self.steps.last().ok_or(TrieError::EmptyProof)?;
        let mut reference = self.value.clone();
        for (step, ProofStep { offset, node }) in self.steps.iter().enumerate() {
            let end = offset.checked_add(reference.len());
            let embedded = end.and_then(|end| node.get(*offset..end));
            if embedded != Some(reference.as_slice()) {
                return Err(TrieError::ReferenceMismatch {
                    step,
                    offset: *offset,
                });
            }
            reference = reference_to(node);
        }
        Ok(keccak256(&last.node))
    }

    /// Replay and compare against an expected root.
    pub fn verify(&self, expected: &H256) -> TrieResult<()> {
        let computed = self.replay()?;
        if computed != *expected {
            return Err(TrieError::RootMismatch {
                expected: *expected,
                computed,
            });
        }
        Ok(())
    }
}

fn reference_to(node: &[u8]) -> Vec<u8> {
    if node.len() >= 32 {
        keccak256(node).as_bytes().to_vec()
    } else {
        node.to_vec()
    }
}

fn find_offset(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
