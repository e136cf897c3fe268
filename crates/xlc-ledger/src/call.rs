use xlc_crypto::SignerSignature;
use xlc_rlp::{Encodable, RlpItem};
use xlc_types::{Address, CallPath, LedgerId, TransactionId, H256};

/// A call into a ledger's control or root-storage contract.
///
/// Proofs travel as opaque encoded bytes; the ledger decodes and verifies
/// them itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCall {
    /// Begin a transaction on the root ledger. `timeout_secs` is relative;
    /// the ledger records the absolute deadline in the Start event.
    Start {
        tx_id: TransactionId,
        timeout_secs: u64,
        call_graph: Vec<u8>,
    },
    /// Execute the node at `call_path`. The first proof is the Start proof;
    /// the rest are the segment proofs of the node's children.
    Segment {
        call_path: CallPath,
        proofs: Vec<Vec<u8>>,
    },
    /// Execute the root call. The first proof is the Start proof; the rest
    /// are the segment proofs of the root's children.
    Root { proofs: Vec<Vec<u8>> },
    /// Apply the outcome to locked contracts. The first proof is the Root
    /// proof; the rest are this ledger's segment proofs that locked contracts.
    Signalling { proofs: Vec<Vec<u8>> },
    /// Store a receipts root of `source`, co-signed by registered signers.
    AddReceiptsRoot {
        source: LedgerId,
        root: H256,
        signatures: Vec<SignerSignature>,
    },
    /// Trust `signer` for claims about `source`.
    RegisterSigner { source: LedgerId, signer: Address },
}

impl ControlCall {
    /// Contract function name, for logs and revert messages.
    pub fn function(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Segment { .. } => "segment",
            Self::Root { .. } => "root",
            Self::Signalling { .. } => "signalling",
            Self::AddReceiptsRoot { .. } => "addTxReceiptRoot",
            Self::RegisterSigner { .. } => "registerSigner",
        }
    }
}

/// The bytes signers sign when vouching for a receipts root of `source`.
///
/// Binding the source ledger stops a signature for one ledger's root being
/// replayed as a root of another.
pub fn receipts_root_message(source: LedgerId, root: &H256) -> Vec<u8> {
    RlpItem::list(vec![source.to_rlp(), root.to_rlp()]).rlp_bytes()
}
