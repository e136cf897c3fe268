use std::sync::LazyLock;

use xlc_crypto::event_topic;
use xlc_rlp::{Decodable, Encodable, RlpItem, RlpResult};
use xlc_types::{Address, CallPath, LedgerId, TransactionId, H256};

use crate::receipt::Log;

static START_TOPIC: LazyLock<H256> = LazyLock::new(|| event_topic(StartEvent::SIGNATURE));
static SEGMENT_TOPIC: LazyLock<H256> = LazyLock::new(|| event_topic(SegmentEvent::SIGNATURE));
static ROOT_TOPIC: LazyLock<H256> = LazyLock::new(|| event_topic(RootEvent::SIGNATURE));
static SIGNALLING_TOPIC: LazyLock<H256> =
    LazyLock::new(|| event_topic(SignallingEvent::SIGNATURE));

/// An event emitted by the control contract. The payload of the log is the
/// RLP encoding of the event.
pub trait ControlEvent: Encodable + Decodable {
    /// Canonical signature, hashed to give the topic.
    const SIGNATURE: &'static str;

    fn topic() -> H256;

    /// Wrap as a log emitted by `contract`.
    fn to_log(&self, contract: Address) -> Log {
        Log::new(contract, Self::topic(), self.rlp_bytes())
    }

    /// Decode from `log` if it carries this event's topic.
    fn from_log(log: &Log) -> Option<RlpResult<Self>> {
        (log.topic() == Some(&Self::topic())).then(|| Self::decode_rlp(&log.data))
    }
}

/// A transaction was started on the root ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartEvent {
    pub tx_id: TransactionId,
    pub caller: Address,
    /// Absolute timeout, epoch seconds, as recorded by the root ledger.
    pub timeout: u64,
    pub call_graph: Vec<u8>,
}

impl ControlEvent for StartEvent {
    const SIGNATURE: &'static str = "Start(uint256,address,uint256,bytes)";

    fn topic() -> H256 {
        *START_TOPIC
    }
}

impl Encodable for StartEvent {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(vec![
            self.tx_id.to_rlp(),
            self.caller.to_rlp(),
            self.timeout.to_rlp(),
            RlpItem::bytes(self.call_graph.clone()),
        ])
    }
}

impl Decodable for StartEvent {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let f = item.as_list_of(4)?;
        Ok(Self {
            tx_id: TransactionId::from_rlp(&f[0])?,
            caller: Address::from_rlp(&f[1])?,
            timeout: f[2].as_u64()?,
            call_graph: f[3].as_bytes()?.to_vec(),
        })
    }
}

/// A segment executed on some ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentEvent {
    pub tx_id: TransactionId,
    pub graph_hash: H256,
    pub call_path: CallPath,
    /// Contracts that withheld their update until the outcome is known.
    pub locked: Vec<Address>,
    pub success: bool,
    pub return_value: Vec<u8>,
}

impl ControlEvent for SegmentEvent {
    const SIGNATURE: &'static str = "Segment(uint256,bytes32,uint256[],address[],bool,bytes)";

    fn topic() -> H256 {
        *SEGMENT_TOPIC
    }
}

impl Encodable for SegmentEvent {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(vec![
            self.tx_id.to_rlp(),
            self.graph_hash.to_rlp(),
            self.call_path.to_rlp(),
            self.locked.to_rlp(),
            self.success.to_rlp(),
            RlpItem::bytes(self.return_value.clone()),
        ])
    }
}

impl Decodable for SegmentEvent {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let f = item.as_list_of(6)?;
        Ok(Self {
            tx_id: TransactionId::from_rlp(&f[0])?,
            graph_hash: H256::from_rlp(&f[1])?,
            call_path: CallPath::from_rlp(&f[2])?,
            locked: Vec::<Address>::from_rlp(&f[3])?,
            success: f[4].as_bool()?,
            return_value: f[5].as_bytes()?.to_vec(),
        })
    }
}

/// The root call finished; `success` is the outcome of the whole transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootEvent {
    pub tx_id: TransactionId,
    pub success: bool,
}

impl ControlEvent for RootEvent {
    const SIGNATURE: &'static str = "Root(uint256,bool)";

    fn topic() -> H256 {
        *ROOT_TOPIC
    }
}

impl Encodable for RootEvent {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(vec![self.tx_id.to_rlp(), self.success.to_rlp()])
    }
}

impl Decodable for RootEvent {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let f = item.as_list_of(2)?;
        Ok(Self {
            tx_id: TransactionId::from_rlp(&f[0])?,
            success: f[1].as_bool()?,
        })
    }
}

/// A ledger applied the outcome to its locked contracts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignallingEvent {
    pub root_ledger: LedgerId,
    pub tx_id: TransactionId,
}

impl ControlEvent for SignallingEvent {
    const SIGNATURE: &'static str = "Signalling(uint256,uint256)";

    fn topic() -> H256 {
        *SIGNALLING_TOPIC
    }
}

impl Encodable for SignallingEvent {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(vec![self.root_ledger.to_rlp(), self.tx_id.to_rlp()])
    }
}

impl Decodable for SignallingEvent {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let f = item.as_list_of(2)?;
        Ok(Self {
            root_ledger: LedgerId::from_rlp(&f[0])?,
            tx_id: TransactionId::from_rlp(&f[1])?,
        })
    }
}
