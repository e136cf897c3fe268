use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use xlc_crypto::keccak256;
use xlc_rlp::{decode, encode, Decodable, Encodable, RlpItem};
use xlc_types::{Address, CallPath, LedgerId, H256};

use crate::error::{GraphError, GraphResult};

/// One call in a cross-ledger call graph.
///
/// Wire form: a leaf is `[ledger_id, contract, payload]`; a node with
/// children appends the list of child nodes as a fourth element. The root is
/// the entry call and has no parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphNode {
    pub ledger_id: LedgerId,
    pub contract: Address,
    /// Encoded function call the contract executes.
    #[serde(with = "xlc_types::hex_bytes")]
    pub payload: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CallGraphNode>,
}

impl CallGraphNode {
    /// A call that makes no further cross-ledger calls.
    pub fn leaf(ledger_id: LedgerId, contract: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            ledger_id,
            contract,
            payload: payload.into(),
            children: Vec::new(),
        }
    }

    /// A call that itself calls `children`, in order.
    pub fn intermediate(
        ledger_id: LedgerId,
        contract: Address,
        payload: impl Into<Vec<u8>>,
        children: Vec<CallGraphNode>,
    ) -> Self {
        Self {
            ledger_id,
            contract,
            payload: payload.into(),
            children,
        }
    }

    /// The entry call of a transaction. Structurally an intermediate node.
    pub fn root(
        ledger_id: LedgerId,
        contract: Address,
        payload: impl Into<Vec<u8>>,
        children: Vec<CallGraphNode>,
    ) -> Self {
        Self::intermediate(ledger_id, contract, payload, children)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The node at `path`, walking child indices from this node.
    pub fn node_at(&self, path: &CallPath) -> GraphResult<&CallGraphNode> {
        path.as_slice().iter().try_fold(self, |node, index| {
            node.children
                .get(*index as usize)
                .ok_or_else(|| GraphError::UnknownPath(path.clone()))
        })
    }

    /// Every call path in the graph, pre-order (parents before children).
    pub fn paths(&self) -> Vec<CallPath> {
        let mut out = Vec::new();
        self.walk(CallPath::root(), &mut |path, _| out.push(path.clone()));
        out
    }

    /// Non-root call paths in the order their segments must execute:
    /// children before parents, siblings in graph order.
    pub fn segment_order(&self) -> Vec<CallPath> {
        let mut out = Vec::new();
        post_order(self, CallPath::root(), &mut out);
        out.pop();
        out
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CallGraphNode::node_count).sum::<usize>()
    }

    /// Every ledger the graph touches.
    pub fn ledgers(&self) -> BTreeSet<LedgerId> {
        let mut out = BTreeSet::new();
        self.walk(CallPath::root(), &mut |_, node| {
            out.insert(node.ledger_id);
        });
        out
    }

    /// Structural checks: every node needs a ledger id, and every non-root
    /// node needs a contract address.
    pub fn validate(&self) -> GraphResult<()> {
        let mut result = Ok(());
        self.walk(CallPath::root(), &mut |path, node| {
            if result.is_err() {
                return;
            }
            if node.ledger_id.is_zero() {
                result = Err(GraphError::MissingLedger(path.clone()));
            } else if !path.is_root() && node.contract.is_zero() {
                result = Err(GraphError::MissingContract(path.clone()));
            }
        });
        result
    }

    /// Wire encoding consumed by the destination ledger's verifier.
    pub fn encode(&self) -> Vec<u8> {
        encode(&self.to_rlp())
    }

    pub fn decode(data: &[u8]) -> GraphResult<Self> {
        Self::from_item(&decode(data)?)
    }

    /// keccak-256 of the wire encoding. Segment events commit to this value.
    pub fn hash(&self) -> H256 {
        keccak256(&self.encode())
    }

    fn walk<'a>(&'a self, path: CallPath, visit: &mut impl FnMut(&CallPath, &'a CallGraphNode)) {
        visit(&path, self);
        for (i, child) in self.children.iter().enumerate() {
            child.walk(path.child(i as u32), visit);
        }
    }

    fn from_item(item: &RlpItem) -> GraphResult<Self> {
        let fields = item.as_list()?;
        let (head, children) = match fields.len() {
            3 => (fields, Vec::new()),
            4 => {
                let children = fields[3]
                    .as_list()?
                    .iter()
                    .map(Self::from_item)
                    .collect::<GraphResult<Vec<_>>>()?;
                if children.is_empty() {
                    return Err(GraphError::Malformed(
                        "non-leaf node with an empty child list".into(),
                    ));
                }
                (&fields[..3], children)
            }
            n => {
                return Err(GraphError::Malformed(format!(
                    "node has {n} fields, expected 3 or 4"
                )))
            }
        };
        Ok(Self {
            ledger_id: LedgerId::from_rlp(&head[0])?,
            contract: Address::from_rlp(&head[1])?,
            payload: head[2].as_bytes()?.to_vec(),
            children,
        })
    }
}

fn post_order(node: &CallGraphNode, path: CallPath, out: &mut Vec<CallPath>) {
    for (i, child) in node.children.iter().enumerate() {
        post_order(child, path.child(i as u32), out);
    }
    out.push(path);
}

impl Encodable for CallGraphNode {
    fn to_rlp(&self) -> RlpItem {
        let mut fields = vec![
            self.ledger_id.to_rlp(),
            self.contract.to_rlp(),
            RlpItem::bytes(self.payload.clone()),
        ];
        if !self.children.is_empty() {
            fields.push(self.children.to_rlp());
        }
        RlpItem::list(fields)
    }
}

impl Decodable for CallGraphNode {
    fn from_rlp(item: &RlpItem) -> xlc_rlp::RlpResult<Self> {
        Self::from_item(item).map_err(|e| match e {
            GraphError::Codec(inner) => inner,
            other => xlc_rlp::RlpError::Custom(other.to_string()),
        })
    }
}
