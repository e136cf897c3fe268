use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Position of a node in a call graph.
///
/// The ordered sequence of child indices walked from the root: the root
/// itself is `[]`, its first child `[0]`, the first child of its third child
/// `[2, 0]`. Paths are assigned by graph construction order and are the
/// stable key that correlates a segment's proof with its place in the graph.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallPath(Vec<u32>);

impl CallPath {
    /// The root's path (empty).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of edges from the root.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// The last child index, or `None` for the root.
    pub fn last(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Path of the `index`-th child of this node.
    pub fn child(&self, index: u32) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Path of the calling node: this path with its last element removed.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Returns `true` if `other` lies strictly below this node.
    pub fn is_ancestor_of(&self, other: &CallPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Debug for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallPath{self}")
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{index}")?;
        }
        write!(f, "]")
    }
}

/// Parses `[2,0]`, `2,0`, or `[]`.
impl FromStr for CallPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim();
        let inner = inner
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(inner)
            .trim();
        if inner.is_empty() {
            return Ok(Self::root());
        }
        inner
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u32>()
                    .map_err(|e| TypeError::InvalidCallPath(format!("{s}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<Vec<u32>> for CallPath {
    fn from(indices: Vec<u32>) -> Self {
        Self(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_parent() {
        assert!(CallPath::root().is_root());
        assert!(CallPath::root().parent().is_none());
        assert_eq!(CallPath::root().last(), None);
    }

    #[test]
    fn parent_drops_last_element() {
        let p = CallPath::new(vec![2, 0]);
        assert_eq!(p.parent(), Some(CallPath::new(vec![2])));
        assert_eq!(CallPath::new(vec![1]).parent(), Some(CallPath::root()));
    }

    #[test]
    fn child_appends() {
        let p = CallPath::root().child(2).child(0);
        assert_eq!(p, CallPath::new(vec![2, 0]));
        assert_eq!(p.depth(), 2);
    }

    #[test]
    fn ancestry() {
        let root = CallPath::root();
        let a = CallPath::new(vec![1]);
        let b = CallPath::new(vec![1, 3]);
        assert!(root.is_ancestor_of(&a));
        assert!(a.is_ancestor_of(&b));
        assert!(!b.is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&a));
        assert!(!CallPath::new(vec![2]).is_ancestor_of(&b));
    }

    #[test]
    fn display_and_parse() {
        let p = CallPath::new(vec![2, 0]);
        assert_eq!(p.to_string(), "[2,0]");
        assert_eq!("[2,0]".parse::<CallPath>().unwrap(), p);
        assert_eq!("2, 0".parse::<CallPath>().unwrap(), p);
        assert_eq!("[]".parse::<CallPath>().unwrap(), CallPath::root());
        assert!("[a]".parse::<CallPath>().is_err());
    }

    #[test]
    fn ordering_groups_subtrees() {
        let mut paths = vec![
            CallPath::new(vec![1]),
            CallPath::new(vec![0, 1]),
            CallPath::root(),
            CallPath::new(vec![0]),
        ];
        paths.sort();
        assert_eq!(
            paths,
            vec![
                CallPath::root(),
                CallPath::new(vec![0]),
                CallPath::new(vec![0, 1]),
                CallPath::new(vec![1]),
            ]
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_parses_back(indices in prop::collection::vec(any::<u32>(), 0..6)) {
                let path = CallPath::new(indices);
                prop_assert_eq!(path.to_string().parse::<CallPath>().unwrap(), path);
            }

            #[test]
            fn child_then_parent_is_identity(
                indices in prop::collection::vec(any::<u32>(), 0..6),
                index in any::<u32>(),
            ) {
                let path = CallPath::new(indices);
                let child = path.child(index);
                prop_assert!(path.is_ancestor_of(&child));
                prop_assert_eq!(child.last(), Some(index));
                prop_assert_eq!(child.parent(), Some(path));
            }
        }
    }
}
