use xlc_graph::CallGraphNode;
use xlc_rlp::Encodable;
use xlc_types::{Address, LedgerId};

use crate::kv::KvOp;
use crate::network::SimNetwork;

pub const PRICE_KEY: &[u8] = b"price";
pub const STOCK_KEY: &[u8] = b"stock";
pub const ORDER_KEY: &[u8] = b"order";

/// A purchase spanning two ledgers.
///
/// The root call on the root ledger records an order once both leaves on
/// the other ledger have run. In the successful shape the first leaf reads
/// the price and the second reserves stock, which stays locked until
/// Signalling. In the failing shape the first leaf reserves stock and the
/// second fails, so the reservation must be rolled back.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub graph: CallGraphNode,
    pub root_ledger: LedgerId,
    pub other_ledger: LedgerId,
    pub root_store: Address,
    pub other_store: Address,
}

impl Scenario {
    pub const INITIAL_STOCK: &'static [u8] = b"10";
    pub const RESERVED_STOCK: &'static [u8] = b"9";
    pub const PRICE: &'static [u8] = b"42";

    pub fn purchase(root_ledger: LedgerId, other_ledger: LedgerId, fail: bool) -> Self {
        let root_store = Address::new([0xa1; 20]);
        let other_store = Address::new([0xb2; 20]);
        let reserve = KvOp::set(STOCK_KEY, Self::RESERVED_STOCK);
        let children = if fail {
            vec![
                CallGraphNode::leaf(other_ledger, other_store, reserve.rlp_bytes()),
                CallGraphNode::leaf(other_ledger, other_store, KvOp::fail("payment declined").rlp_bytes()),
            ]
        } else {
            vec![
                CallGraphNode::leaf(other_ledger, other_store, KvOp::get(PRICE_KEY).rlp_bytes()),
                CallGraphNode::leaf(other_ledger, other_store, reserve.rlp_bytes()),
            ]
        };
        let graph = CallGraphNode::root(
            root_ledger,
            root_store,
            KvOp::set(ORDER_KEY, "placed").rlp_bytes(),
            children,
        );
        Self {
            graph,
            root_ledger,
            other_ledger,
            root_store,
            other_store,
        }
    }

    /// Deploy and seed both stores.
    pub fn deploy(&self, network: &SimNetwork) {
        if let Some(root) = network.ledger(self.root_ledger) {
            root.deploy_store(self.root_store);
        }
        if let Some(other) = network.ledger(self.other_ledger) {
            other.seed(self.other_store, PRICE_KEY, Self::PRICE);
            other.seed(self.other_store, STOCK_KEY, Self::INITIAL_STOCK);
        }
    }
}
