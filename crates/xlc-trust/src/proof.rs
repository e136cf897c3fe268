use std::collections::BTreeSet;

use xlc_crypto::{RecoverableSignature, SignerSignature};
use xlc_ledger::{ControlEvent, Receipt};
use xlc_rlp::{decode, encode, Decodable, Encodable, RlpError, RlpItem, RlpResult};
use xlc_trie::{InclusionPath, ProofStep};
use xlc_types::{Address, LedgerId, H256};

use crate::error::{TrustError, TrustResult};
use crate::strategy::StrategyKind;

/// What a destination ledger trusts: stored receipts roots and registered
/// signers, both per source ledger.
pub trait TrustAnchor {
    fn is_trusted_root(&self, source: LedgerId, root: &H256) -> bool;

    fn signers(&self, source: LedgerId) -> BTreeSet<Address>;

    /// Signatures required for claims about `source`.
    fn threshold(&self, source: LedgerId) -> usize {
        majority(self.signers(source).len())
    }
}

/// More than half of `signers`.
pub fn majority(signers: usize) -> usize {
    signers / 2 + 1
}

/// Inclusion of the receipt that emitted an event in a block's receipts trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptInclusionProof {
    pub ledger_id: LedgerId,
    /// Contract that emitted the event.
    pub contract: Address,
    /// Claimed receipts root of the block.
    pub root: H256,
    /// Encoded receipt: the trie leaf value.
    pub receipt: Vec<u8>,
    /// Leaf-first replay steps.
    pub steps: Vec<ProofStep>,
}

impl ReceiptInclusionProof {
    fn path(&self) -> InclusionPath {
        InclusionPath {
            value: self.receipt.clone(),
            steps: self.steps.clone(),
        }
    }

    /// Replay node by node and compare with the claimed root.
    pub fn verify(&self) -> TrustResult<()> {
        self.path().verify(&self.root)?;
        Ok(())
    }

    /// Data of the first log in the receipt emitted by `contract` with `topic`.
    pub fn event_payload(&self, topic: &H256) -> TrustResult<Vec<u8>> {
        let receipt = Receipt::decode_rlp(&self.receipt)?;
        receipt
            .logs
            .into_iter()
            .find(|log| log.address == self.contract && log.topic() == Some(topic))
            .map(|log| log.data)
            .ok_or(TrustError::EventNotFound {
                ledger: self.ledger_id,
                topic: *topic,
            })
    }
}

/// An event payload co-signed by identities registered for the source ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedEventProof {
    pub ledger_id: LedgerId,
    pub contract: Address,
    pub topic: H256,
    pub payload: Vec<u8>,
    pub signatures: Vec<SignerSignature>,
}

/// Bytes signed for a signed-event proof. Binds the source ledger, contract,
/// and topic as well as the payload.
pub fn signed_event_message(
    ledger_id: LedgerId,
    contract: &Address,
    topic: &H256,
    payload: &[u8],
) -> Vec<u8> {
    encode(&RlpItem::list(vec![
        ledger_id.to_rlp(),
        contract.to_rlp(),
        topic.to_rlp(),
        RlpItem::bytes(payload.to_vec()),
    ]))
}

impl SignedEventProof {
    pub fn message(&self) -> Vec<u8> {
        signed_event_message(self.ledger_id, &self.contract, &self.topic, &self.payload)
    }

    /// Distinct members of `signers` whose signatures are valid.
    pub fn valid_signers(&self, signers: &BTreeSet<Address>) -> BTreeSet<Address> {
        let message = self.message();
        self.signatures
            .iter()
            .filter(|s| signers.contains(&s.signer) && s.verify(&message).is_ok())
            .map(|s| s.signer)
            .collect()
    }

    /// Require at least `threshold` distinct valid signatures from `signers`.
    pub fn verify(&self, signers: &BTreeSet<Address>, threshold: usize) -> TrustResult<()> {
        let valid = self.valid_signers(signers).len();
        if valid < threshold.max(1) {
            return Err(TrustError::InsufficientSignatures { valid, threshold });
        }
        Ok(())
    }
}

/// A proof that an event happened on another ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Proof {
    Receipt(ReceiptInclusionProof),
    SignedEvent(SignedEventProof),
}

impl Proof {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Receipt(_) => StrategyKind::ReceiptRoot,
            Self::SignedEvent(_) => StrategyKind::SignedEvent,
        }
    }

    pub fn ledger_id(&self) -> LedgerId {
        match self {
            Self::Receipt(p) => p.ledger_id,
            Self::SignedEvent(p) => p.ledger_id,
        }
    }

    pub fn contract(&self) -> Address {
        match self {
            Self::Receipt(p) => p.contract,
            Self::SignedEvent(p) => p.contract,
        }
    }

    /// Checks that need nothing but the proof: the inclusion path replays to
    /// the claimed root, or every attached signature recovers to its signer.
    pub fn check_integrity(&self) -> TrustResult<()> {
        match self {
            Self::Receipt(p) => p.verify(),
            Self::SignedEvent(p) => {
                let message = p.message();
                for s in &p.signatures {
                    s.verify(&message)?;
                }
                Ok(())
            }
        }
    }

    /// Full verification against what `anchor` trusts.
    pub fn verify(&self, anchor: &dyn TrustAnchor) -> TrustResult<()> {
        match self {
            Self::Receipt(p) => {
                if !anchor.is_trusted_root(p.ledger_id, &p.root) {
                    return Err(TrustError::UntrustedRoot {
                        ledger: p.ledger_id,
                        root: p.root,
                    });
                }
                p.verify()
            }
            Self::SignedEvent(p) => p.verify(&anchor.signers(p.ledger_id), anchor.threshold(p.ledger_id)),
        }
    }

    /// Raw payload of the event with `topic`. Does not verify trust.
    pub fn event_payload(&self, topic: &H256) -> TrustResult<Vec<u8>> {
        match self {
            Self::Receipt(p) => p.event_payload(topic),
            Self::SignedEvent(p) if p.topic == *topic => Ok(p.payload.clone()),
            Self::SignedEvent(p) => Err(TrustError::EventNotFound {
                ledger: p.ledger_id,
                topic: *topic,
            }),
        }
    }

    /// Decode the control event this proof carries.
    pub fn event<E: ControlEvent>(&self) -> TrustResult<E> {
        let payload = self.event_payload(&E::topic())?;
        Ok(E::decode_rlp(&payload)?)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.rlp_bytes()
    }

    pub fn decode(data: &[u8]) -> TrustResult<Self> {
        Ok(Self::from_rlp(&decode(data)?)?)
    }
}

impl Encodable for Proof {
    fn to_rlp(&self) -> RlpItem {
        match self {
            Self::Receipt(p) => {
                let steps = p
                    .steps
                    .iter()
                    .map(|s| {
                        RlpItem::list(vec![RlpItem::uint(s.offset as u64), RlpItem::bytes(s.node.clone())])
                    })
                    .collect();
                RlpItem::list(vec![
                    p.ledger_id.to_rlp(),
                    p.contract.to_rlp(),
                    RlpItem::list(vec![
                        p.root.to_rlp(),
                        RlpItem::bytes(p.receipt.clone()),
                        RlpItem::list(steps),
                    ]),
                ])
            }
            Self::SignedEvent(p) => {
                let signatures = p
                    .signatures
                    .iter()
                    .map(|s| {
                        RlpItem::list(vec![
                            s.signer.to_rlp(),
                            s.signature.r.to_rlp(),
                            s.signature.s.to_rlp(),
                            RlpItem::uint(u64::from(s.signature.v)),
                        ])
                    })
                    .collect();
                RlpItem::list(vec![
                    p.ledger_id.to_rlp(),
                    p.contract.to_rlp(),
                    p.topic.to_rlp(),
                    RlpItem::list(vec![RlpItem::bytes(p.payload.clone()), RlpItem::list(signatures)]),
                ])
            }
        }
    }
}

impl Decodable for Proof {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let fields = item.as_list()?;
        match fields.len() {
            3 => {
                let body = fields[2].as_list_of(3)?;
                let steps = body[2]
                    .as_list()?
                    .iter()
                    .map(|step| {
                        let pair = step.as_list_of(2)?;
                        let offset = usize::try_from(pair[0].as_u64()?).map_err(|_| RlpError::Overflow {
                            max_bytes: std::mem::size_of::<usize>(),
                            actual: pair[0].as_bytes().map_or(0, <[u8]>::len),
                        })?;
                        Ok(ProofStep {
                            offset,
                            node: pair[1].as_bytes()?.to_vec(),
                        })
                    })
                    .collect::<RlpResult<Vec<_>>>()?;
                Ok(Self::Receipt(ReceiptInclusionProof {
                    ledger_id: LedgerId::from_rlp(&fields[0])?,
                    contract: Address::from_rlp(&fields[1])?,
                    root: H256::from_rlp(&body[0])?,
                    receipt: body[1].as_bytes()?.to_vec(),
                    steps,
                }))
            }
            4 => {
                let body = fields[3].as_list_of(2)?;
                let signatures = body[1]
                    .as_list()?
                    .iter()
                    .map(|entry| {
                        let f = entry.as_list_of(4)?;
                        Ok(SignerSignature {
                            signer: Address::from_rlp(&f[0])?,
                            signature: RecoverableSignature {
                                r: H256::from_rlp(&f[1])?,
                                s: H256::from_rlp(&f[2])?,
                                v: f[3].as_uint_array::<1>()?[0],
                            },
                        })
                    })
                    .collect::<RlpResult<Vec<_>>>()?;
                Ok(Self::SignedEvent(SignedEventProof {
                    ledger_id: LedgerId::from_rlp(&fields[0])?,
                    contract: Address::from_rlp(&fields[1])?,
                    topic: H256::from_rlp(&fields[2])?,
                    payload: body[0].as_bytes()?.to_vec(),
                    signatures,
                }))
            }
            actual => Err(RlpError::Custom(format!(
                "proof has {actual} fields, expected 3 (receipt inclusion) or 4 (signed event)"
            ))),
        }
    }
}
