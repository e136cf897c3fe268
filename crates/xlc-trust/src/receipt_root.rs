use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};
use xlc_crypto::{SignerSignature, SigningIdentity};
use xlc_ledger::{receipts_root_message, ControlCall, LedgerHandle, TransactionReceipt};
use xlc_rlp::Encodable;
use xlc_trie::{index_key, PatriciaTrie};
use xlc_types::{Address, H256};

use crate::error::{TrustError, TrustResult};
use crate::proof::{Proof, ReceiptInclusionProof};
use crate::strategy::{StrategyKind, TrustStrategy};

/// Trust through transferred receipts roots.
///
/// Proofs are Merkle inclusion proofs against a block's receipts root; the
/// configured identities co-sign the root itself, and the signed root is
/// stored on each target ledger before any proof against it is used.
pub struct ReceiptRootTransfer {
    signers: Vec<Arc<dyn SigningIdentity>>,
}

impl ReceiptRootTransfer {
    pub fn new(signers: Vec<Arc<dyn SigningIdentity>>) -> Self {
        Self { signers }
    }
}

#[async_trait]
impl TrustStrategy for ReceiptRootTransfer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ReceiptRoot
    }

    async fn produce_proof(
        &self,
        source: &LedgerHandle,
        receipt: &TransactionReceipt,
        topic: H256,
    ) -> TrustResult<Proof> {
        let block = source.ledger.get_block(&receipt.block_hash).await?;

        let mut trie = PatriciaTrie::new();
        for (i, r) in block.receipts.iter().enumerate() {
            trie.put(&index_key(i as u64), r.rlp_bytes());
        }
        let computed = trie.root_hash();
        if computed != block.receipts_root {
            error!(
                ledger = %source.id(),
                block = %block.hash,
                reported = %block.receipts_root,
                computed = %computed,
                "rebuilt receipts root does not match the ledger's"
            );
            return Err(TrustError::RootMismatch {
                ledger: source.id(),
                block: block.hash,
                reported: block.receipts_root,
                computed,
            });
        }

        let path = trie.prove(&index_key(receipt.transaction_index))?.inclusion_path()?;
        let proof = ReceiptInclusionProof {
            ledger_id: source.id(),
            contract: source.control_contract,
            root: computed,
            receipt: path.value,
            steps: path.steps,
        };
        proof.event_payload(&topic)?;

        debug!(
            ledger = %source.id(),
            block = block.number,
            index = receipt.transaction_index,
            nodes = proof.steps.len(),
            "receipt inclusion proof"
        );
        Ok(Proof::Receipt(proof))
    }

    async fn publish(&self, proof: &Proof, targets: &[LedgerHandle]) -> TrustResult<()> {
        let Proof::Receipt(p) = proof else {
            return Err(TrustError::WrongProofKind {
                expected: self.kind(),
                actual: proof.kind(),
            });
        };
        let message = receipts_root_message(p.ledger_id, &p.root);
        let signatures: Vec<SignerSignature> = self
            .signers
            .iter()
            .map(|s| SignerSignature::create(s.as_ref(), &message))
            .collect();

        for target in targets {
            info!(source = %p.ledger_id, target = %target.id(), root = %p.root, "publishing receipts root");
            let call = ControlCall::AddReceiptsRoot {
                source: p.ledger_id,
                root: p.root,
                signatures: signatures.clone(),
            };
            target.ledger.submit(target.root_storage, &call).await?;
        }
        Ok(())
    }

    fn signer_addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address()).collect()
    }
}
