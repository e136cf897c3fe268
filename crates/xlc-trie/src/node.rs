use xlc_crypto::keccak256;
use xlc_rlp::{encode, RlpItem};

use crate::nibbles::{common_prefix, hex_prefix};

/// A trie node. Paths are stored as nibbles.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Node {
    #[default]
    Empty,
    Leaf {
        path: Vec<u8>,
        value: Vec<u8>,
    },
    Extension {
        path: Vec<u8>,
        child: Box<Node>,
    },
    Branch {
        children: Box<[Node; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Node {
    fn empty_branch() -> Self {
        Node::Branch {
            children: Box::new(std::array::from_fn(|_| Node::Empty)),
            value: None,
        }
    }

    /// Insert `value` at the nibble path `key`, returning the replacement node.
    pub fn insert(self, key: &[u8], value: Vec<u8>) -> Node {
        match self {
            Node::Empty => Node::Leaf {
                path: key.to_vec(),
                value,
            },
            Node::Leaf { path, value: old } => {
                if path == key {
                    return Node::Leaf { path, value };
                }
                let shared = common_prefix(&path, key);
                let branch = Node::empty_branch()
                    .insert(&path[shared..], old)
                    .insert(&key[shared..], value);
                wrap_extension(&key[..shared], branch)
            }
            Node::Extension { path, child } => {
                let shared = common_prefix(&path, key);
                if shared == path.len() {
                    let child = child.insert(&key[shared..], value);
                    return Node::Extension {
                        path,
                        child: Box::new(child),
                    };
                }
                // Split the extension at the first diverging nibble.
                let mut branch = Node::empty_branch();
                if let Node::Branch { children, .. } = &mut branch {
                    let slot = path[shared] as usize;
                    children[slot] = wrap_extension(&path[shared + 1..], *child);
                }
                let branch = branch.insert(&key[shared..], value);
                wrap_extension(&path[..shared], branch)
            }
            Node::Branch {
                mut children,
                value: existing,
            } => match key.split_first() {
                None => Node::Branch {
                    children,
                    value: Some(value),
                },
                Some((first, rest)) => {
                    let slot = *first as usize;
                    let child = std::mem::take(&mut children[slot]);
                    children[slot] = child.insert(rest, value);
                    Node::Branch {
                        children,
                        value: existing,
                    }
                }
            },
        }
    }

    /// Structural RLP form of this node.
    pub fn to_rlp(&self) -> RlpItem {
        match self {
            Node::Empty => RlpItem::empty(),
            Node::Leaf { path, value } => RlpItem::list(vec![
                RlpItem::bytes(hex_prefix(path, true)),
                RlpItem::bytes(value.clone()),
            ]),
            Node::Extension { path, child } => RlpItem::list(vec![
                RlpItem::bytes(hex_prefix(path, false)),
                child.reference(),
            ]),
            Node::Branch { children, value } => {
                let mut items: Vec<RlpItem> = children.iter().map(Node::reference).collect();
                items.push(value.clone().map(RlpItem::bytes).unwrap_or_else(RlpItem::empty));
                RlpItem::list(items)
            }
        }
    }

    /// Encoded bytes of this node.
    pub fn encoded(&self) -> Vec<u8> {
        encode(&self.to_rlp())
    }

    /// How a parent refers to this node: inline when the encoding is shorter
    /// than 32 bytes, otherwise by its keccak-256 hash.
    pub fn reference(&self) -> RlpItem {
        if matches!(self, Node::Empty) {
            return RlpItem::empty();
        }
        let item = self.to_rlp();
        let encoded = encode(&item);
        if encoded.len() < 32 {
            item
        } else {
            RlpItem::bytes(keccak256(&encoded).as_bytes().to_vec())
        }
    }
}

/// An extension over `path` pointing at `child`; no wrapper for an empty path.
/// Leaves absorb the path directly.
fn wrap_extension(path: &[u8], child: Node) -> Node {
    if path.is_empty() {
        return child;
    }
    match child {
        Node::Leaf {
            path: leaf_path,
            value,
        } => Node::Leaf {
            path: [path, leaf_path.as_slice()].concat(),
            value,
        },
        Node::Extension {
            path: ext_path,
            child,
        } => Node::Extension {
            path: [path, ext_path.as_slice()].concat(),
            child,
        },
        other => Node::Extension {
            path: path.to_vec(),
            child: Box::new(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_is_a_leaf() {
        let node = Node::Empty.insert(&[1, 2], b"v".to_vec());
        assert_eq!(
            node,
            Node::Leaf {
                path: vec![1, 2],
                value: b"v".to_vec()
            }
        );
    }

    #[test]
    fn diverging_leaves_share_an_extension() {
        let node = Node::Empty
            .insert(&[1, 2, 3], b"a".to_vec())
            .insert(&[1, 2, 4], b"b".to_vec());
        match node {
            Node::Extension { path, child } => {
                assert_eq!(path, vec![1, 2]);
                assert!(matches!(*child, Node::Branch { .. }));
            }
            other => panic!("expected extension, got {other:?}"),
        }
    }

    #[test]
    fn prefix_key_lands_in_branch_value() {
        let node = Node::Empty
            .insert(&[1, 2], b"short".to_vec())
            .insert(&[1, 2, 3], b"long".to_vec());
        let Node::Extension { child, .. } = node else {
            panic!("expected extension");
        };
        let Node::Branch { value, .. } = *child else {
            panic!("expected branch");
        };
        assert_eq!(value, Some(b"short".to_vec()));
    }

    #[test]
    fn overwrite_replaces_value() {
        let node = Node::Empty
            .insert(&[5], b"old".to_vec())
            .insert(&[5], b"new".to_vec());
        assert_eq!(
            node,
            Node::Leaf {
                path: vec![5],
                value: b"new".to_vec()
            }
        );
    }

    #[test]
    fn small_nodes_are_inlined() {
        let leaf = Node::Leaf {
            path: vec![1],
            value: vec![2],
        };
        assert!(leaf.reference().is_list());

        let big = Node::Leaf {
            path: vec![1],
            value: vec![0xaa; 40],
        };
        assert_eq!(big.reference().as_bytes().unwrap().len(), 32);
    }
}
