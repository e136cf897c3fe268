use xlc_crypto::keccak256;
use xlc_rlp::{encode, RlpItem};
use xlc_types::H256;

use crate::error::{TrieError, TrieResult};
use crate::nibbles::{common_prefix, to_nibbles};
use crate::node::Node;
use crate::proof::TrieProof;

/// Root of the empty trie: keccak-256 of the encoded empty string.
pub const EMPTY_ROOT: H256 = H256::new([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// Key of the `index`-th entry in a receipts or transactions trie.
pub fn index_key(index: u64) -> Vec<u8> {
    encode(&RlpItem::uint(index))
}

/// Root of the trie that maps `index_key(i)` to `values[i]`.
pub fn ordered_root<V: AsRef<[u8]>>(values: &[V]) -> H256 {
    let mut trie = PatriciaTrie::new();
    for (i, value) in values.iter().enumerate() {
        trie.put(&index_key(i as u64), value.as_ref().to_vec());
    }
    trie.root_hash()
}

/// In-memory Merkle-Patricia trie.
///
/// The root hash depends only on the set of key/value pairs, not on the
/// order in which they were inserted.
#[derive(Clone, Debug, Default)]
pub struct PatriciaTrie {
    root: Node,
    len: usize,
}

impl PatriciaTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value stored under `key`.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) {
        if self.get(key).is_none() {
            self.len += 1;
        }
        let root = std::mem::take(&mut self.root);
        self.root = root.insert(&to_nibbles(key), value);
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let nibbles = to_nibbles(key);
        let mut node = &self.root;
        let mut rest = nibbles.as_slice();
        loop {
            match node {
                Node::Empty => return None,
                Node::Leaf { path, value } => {
                    return (path.as_slice() == rest).then_some(value.as_slice());
                }
                Node::Extension { path, child } => {
                    if common_prefix(path, rest) != path.len() {
                        return None;
                    }
                    rest = &rest[path.len()..];
                    node = child;
                }
                Node::Branch { children, value } => match rest.split_first() {
                    None => return value.as_deref(),
                    Some((first, tail)) => {
                        node = &children[*first as usize];
                        rest = tail;
                    }
                },
            }
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// keccak-256 of the root node's encoding. The root is always hashed,
    /// even when its encoding is shorter than 32 bytes.
    pub fn root_hash(&self) -> H256 {
        keccak256(&self.root.encoded())
    }

    /// Inclusion proof for `key`: the value and the encoding of every node
    /// on the path, leaf first.
    pub fn prove(&self, key: &[u8]) -> TrieResult<TrieProof> {
        let not_found = || TrieError::KeyNotFound(key.to_vec());
        let nibbles = to_nibbles(key);
        let mut rest = nibbles.as_slice();
        let mut node = &self.root;
        let mut nodes = Vec::new();

        let value = loop {
            match node {
                Node::Empty => return Err(not_found()),
                Node::Leaf { path, value } => {
                    if path.as_slice() != rest {
                        return Err(not_found());
                    }
                    nodes.push(node.encoded());
                    break value.clone();
                }
                Node::Extension { path, child } => {
                    if common_prefix(path, rest) != path.len() {
                        return Err(not_found());
                    }
                    nodes.push(node.encoded());
                    rest = &rest[path.len()..];
                    node = child;
                }
                Node::Branch { children, value } => {
                    nodes.push(node.encoded());
                    match rest.split_first() {
                        None => break value.clone().ok_or_else(not_found)?,
                        Some((first, tail)) => {
                            node = &children[*first as usize];
                            rest = tail;
                        }
                    }
                }
            }
        };

        nodes.reverse();
        Ok(TrieProof {
            root: self.root_hash(),
            value,
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_trie_root() {
        assert_eq!(PatriciaTrie::new().root_hash(), EMPTY_ROOT);
        assert_eq!(EMPTY_ROOT, keccak256(&[0x80]));
        assert!(PatriciaTrie::new().is_empty());
    }

    #[test]
    fn known_root_with_shared_prefixes() {
        let mut trie = PatriciaTrie::new();
        trie.put(b"doe", b"reindeer".to_vec());
        trie.put(b"dog", b"puppy".to_vec());
        trie.put(b"dogglesworth", b"cat".to_vec());
        assert_eq!(
            trie.root_hash().to_hex(),
            "0x8aad789dff2f538bca5d8ea56e8abe10f4c7ba3a5dea95fea4cd6e7c3a1168d3"
        );
    }

    #[test]
    fn known_root_single_long_value() {
        let mut trie = PatriciaTrie::new();
        trie.put(b"A", vec![b'a'; 72]);
        assert_eq!(
            trie.root_hash().to_hex(),
            "0xd23786fb4a010da3ce639d66d5e904a11dbc02746d1ce25029e53290cabf28ab"
        );
    }

    #[test]
    fn get_and_len() {
        let mut trie = PatriciaTrie::new();
        trie.put(b"dog", b"puppy".to_vec());
        trie.put(b"dogglesworth", b"cat".to_vec());
        trie.put(b"dog", b"hound".to_vec());
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.get(b"dog"), Some(&b"hound"[..]));
        assert_eq!(trie.get(b"do"), None);
        assert_eq!(trie.get(b"doggles"), None);
    }

    #[test]
    fn prove_absent_key_fails() {
        let mut trie = PatriciaTrie::new();
        trie.put(&index_key(0), b"zero".to_vec());
        let err = trie.prove(&index_key(1)).unwrap_err();
        assert_eq!(err, TrieError::KeyNotFound(index_key(1)));
    }

    #[test]
    fn index_keys_are_rlp_integers() {
        assert_eq!(index_key(0), vec![0x80]);
        assert_eq!(index_key(1), vec![0x01]);
        assert_eq!(index_key(128), vec![0x81, 0x80]);
    }

    #[test]
    fn proofs_are_leaf_first() {
        let values: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; 40]).collect();
        let mut trie = PatriciaTrie::new();
        for (i, v) in values.iter().enumerate() {
            trie.put(&index_key(i as u64), v.clone());
        }
        let proof = trie.prove(&index_key(7)).unwrap();
        assert_eq!(proof.value, values[7]);
        assert_eq!(keccak256(proof.nodes.last().unwrap()), trie.root_hash());
        assert!(proof.nodes.len() >= 2);
    }

    #[test]
    fn ordered_root_matches_manual_build() {
        let values = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let mut trie = PatriciaTrie::new();
        for (i, v) in values.iter().enumerate().rev() {
            trie.put(&index_key(i as u64), v.clone());
        }
        assert_eq!(ordered_root(&values), trie.root_hash());
    }

    fn arb_entries() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
        prop::collection::btree_map(
            prop::collection::vec(any::<u8>(), 1..6),
            prop::collection::vec(any::<u8>(), 1..50),
            1..40,
        )
        .prop_map(|m: BTreeMap<_, _>| m.into_iter().collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn root_is_order_independent(
            (entries, shuffled) in arb_entries()
                .prop_flat_map(|e| (Just(e.clone()), Just(e).prop_shuffle()))
        ) {
            let mut a = PatriciaTrie::new();
            for (k, v) in &entries {
                a.put(k, v.clone());
            }
            let mut b = PatriciaTrie::new();
            for (k, v) in &shuffled {
                b.put(k, v.clone());
            }
            prop_assert_eq!(a.root_hash(), b.root_hash());
            prop_assert_eq!(a.len(), entries.len());
        }

        #[test]
        fn every_proof_replays_to_root(entries in arb_entries()) {
            let mut trie = PatriciaTrie::new();
            for (k, v) in &entries {
                trie.put(k, v.clone());
            }
            let root = trie.root_hash();
            for (k, v) in &entries {
                let proof = trie.prove(k).unwrap();
                prop_assert_eq!(&proof.value, v);
                let path = proof.inclusion_path().unwrap();
                prop_assert_eq!(path.replay().unwrap(), root);
            }
        }
    }
}
