use xlc_graph::CallGraphNode;
use xlc_trust::Proof;
use xlc_types::{Address, CallPath, LedgerId, TransactionId};

/// Where a transaction is in its lifecycle.
///
/// `TimedOut` is advisory: Root and Signalling may still be attempted
/// because a ledger may already have committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxPhase {
    Init,
    Started,
    Segmenting,
    Rooted,
    Signalled,
    TimedOut,
}

impl std::fmt::Display for TxPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Started => "started",
            Self::Segmenting => "segmenting",
            Self::Rooted => "rooted",
            Self::Signalled => "signalled",
            Self::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// One cross-ledger transaction as seen by its executor.
#[derive(Clone, Debug)]
pub struct CrossLedgerTransaction {
    pub id: TransactionId,
    pub root_ledger: LedgerId,
    /// Absolute deadline, epoch seconds, as recorded by the root ledger.
    pub timeout: u64,
    pub call_graph: CallGraphNode,
    pub phase: TxPhase,
    /// Known once Root has executed.
    pub success: Option<bool>,
    /// Set the first time a phase boundary finds the deadline passed.
    pub timed_out: bool,
}

/// Outcome of one Segment call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentResult {
    pub call_path: CallPath,
    pub ledger_id: LedgerId,
    pub success: bool,
    pub return_value: Vec<u8>,
    /// Contracts holding a provisional update until Signalling.
    pub locked: Vec<Address>,
    pub proof: Proof,
}

impl SegmentResult {
    pub fn has_locks(&self) -> bool {
        !self.locked.is_empty()
    }
}
