use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};
use xlc_crypto::SignerSignature;
use xlc_graph::CallGraphNode;
use xlc_ledger::{
    receipts_root_message, ControlCall, ControlEvent, LedgerError, LedgerResult, Log, RootEvent,
    SegmentEvent, SignallingEvent, StartEvent,
};
use xlc_rlp::Decodable;
use xlc_trust::{Proof, TrustAnchor};
use xlc_types::{Address, CallPath, LedgerId, TransactionId, H256};

use crate::kv::{KvOp, KvStore};

fn revert(reason: impl Into<String>) -> LedgerError {
    LedgerError::reverted(reason)
}

/// A transaction started on this ledger as root.
#[derive(Clone, Debug)]
struct Started {
    timeout: u64,
    graph: CallGraphNode,
    outcome: Option<bool>,
}

/// What a business call produced.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CallOutcome {
    success: bool,
    return_value: Vec<u8>,
    locked: Vec<Address>,
}

impl CallOutcome {
    fn failed(reason: impl Into<Vec<u8>>) -> Self {
        Self {
            success: false,
            return_value: reason.into(),
            locked: Vec::new(),
        }
    }
}

/// Contract storage of one ledger: the control contract, root storage, and
/// business stores.
///
/// Every call either fails with a revert before touching storage or runs to
/// completion.
#[derive(Debug)]
pub struct ContractState {
    ledger_id: LedgerId,
    control: Address,
    root_storage: Address,
    operator: Address,
    remotes: HashMap<LedgerId, Address>,
    signers: HashMap<LedgerId, BTreeSet<Address>>,
    roots: HashMap<LedgerId, HashSet<H256>>,
    stores: HashMap<Address, KvStore>,
    started: HashMap<TransactionId, Started>,
    executed: HashSet<(TransactionId, CallPath)>,
    signalled: HashSet<TransactionId>,
}

impl ContractState {
    pub fn new(ledger_id: LedgerId, control: Address, root_storage: Address, operator: Address) -> Self {
        Self {
            ledger_id,
            control,
            root_storage,
            operator,
            remotes: HashMap::new(),
            signers: HashMap::new(),
            roots: HashMap::new(),
            stores: HashMap::new(),
            started: HashMap::new(),
            executed: HashSet::new(),
            signalled: HashSet::new(),
        }
    }

    /// Accept proofs from `control` as the control contract of `ledger`.
    pub fn register_remote(&mut self, ledger: LedgerId, control: Address) {
        self.remotes.insert(ledger, control);
    }

    pub fn store(&self, address: &Address) -> Option<&KvStore> {
        self.stores.get(address)
    }

    pub fn store_mut(&mut self, address: Address) -> &mut KvStore {
        self.stores.entry(address).or_default()
    }

    /// Run `call` against `contract` at time `now`, returning the emitted logs.
    pub fn execute(&mut self, contract: Address, call: &ControlCall, now: u64) -> LedgerResult<Vec<Log>> {
        let expected = match call {
            ControlCall::AddReceiptsRoot { .. } | ControlCall::RegisterSigner { .. } => self.root_storage,
            _ => self.control,
        };
        if contract != expected {
            return Err(revert(format!("{contract} has no function {}", call.function())));
        }

        match call {
            ControlCall::Start {
                tx_id,
                timeout_secs,
                call_graph,
            } => self.start(*tx_id, *timeout_secs, call_graph, now),
            ControlCall::Segment { call_path, proofs } => self.segment(call_path, proofs, now),
            ControlCall::Root { proofs } => self.root(proofs, now),
            ControlCall::Signalling { proofs } => self.signalling(proofs),
            ControlCall::AddReceiptsRoot {
                source,
                root,
                signatures,
            } => self.add_receipts_root(*source, *root, signatures),
            ControlCall::RegisterSigner { source, signer } => {
                self.signers.entry(*source).or_default().insert(*signer);
                Ok(Vec::new())
            }
        }
    }

    fn start(&mut self, tx_id: TransactionId, timeout_secs: u64, call_graph: &[u8], now: u64) -> LedgerResult<Vec<Log>> {
        let graph =
            CallGraphNode::decode(call_graph).map_err(|e| revert(format!("invalid call graph: {e}")))?;
        graph
            .validate()
            .map_err(|e| revert(format!("invalid call graph: {e}")))?;
        if graph.ledger_id != self.ledger_id {
            return Err(revert(format!("call graph is rooted on ledger {}", graph.ledger_id)));
        }
        if self.started.contains_key(&tx_id) {
            return Err(revert(format!("transaction {tx_id} already started")));
        }

        let timeout = now.saturating_add(timeout_secs);
        self.started.insert(
            tx_id,
            Started {
                timeout,
                graph,
                outcome: None,
            },
        );
        let event = StartEvent {
            tx_id,
            caller: self.operator,
            timeout,
            call_graph: call_graph.to_vec(),
        };
        Ok(vec![event.to_log(self.control)])
    }

    fn segment(&mut self, path: &CallPath, proofs: &[Vec<u8>], now: u64) -> LedgerResult<Vec<Log>> {
        let (first, children) = proofs
            .split_first()
            .ok_or_else(|| revert("segment needs a start proof"))?;
        let start_proof = self.accept(first, "start")?;
        let start: StartEvent = event_of(&start_proof)?;
        let graph = CallGraphNode::decode(&start.call_graph)
            .map_err(|e| revert(format!("invalid call graph: {e}")))?;
        if start_proof.ledger_id() != graph.ledger_id {
            return Err(revert("start proof is not from the root ledger"));
        }
        if path.is_root() {
            return Err(revert("the root call is not a segment"));
        }
        let node = graph.node_at(path).map_err(|e| revert(e.to_string()))?;
        if node.ledger_id != self.ledger_id {
            return Err(revert(format!("segment {path} belongs to ledger {}", node.ledger_id)));
        }
        if now > start.timeout {
            return Err(revert("transaction has timed out"));
        }
        let key = (start.tx_id, path.clone());
        if self.executed.contains(&key) {
            return Err(revert(format!("segment {path} already executed")));
        }

        let graph_hash = graph.hash();
        let callees_ok = self.check_callees(start.tx_id, &graph_hash, path, node, children)?;
        let outcome = if callees_ok {
            self.run_op(start.tx_id, node, true)
        } else {
            CallOutcome::failed("callee failed")
        };
        self.executed.insert(key);

        let event = SegmentEvent {
            tx_id: start.tx_id,
            graph_hash,
            call_path: path.clone(),
            locked: outcome.locked,
            success: outcome.success,
            return_value: outcome.return_value,
        };
        Ok(vec![event.to_log(self.control)])
    }

    fn root(&mut self, proofs: &[Vec<u8>], now: u64) -> LedgerResult<Vec<Log>> {
        let (first, children) = proofs
            .split_first()
            .ok_or_else(|| revert("root needs a start proof"))?;
        let start_proof = self.accept(first, "start")?;
        if start_proof.ledger_id() != self.ledger_id {
            return Err(revert("start proof is from another ledger"));
        }
        let start: StartEvent = event_of(&start_proof)?;
        let tx_id = start.tx_id;
        let record = self
            .started
            .get(&tx_id)
            .cloned()
            .ok_or_else(|| revert(format!("unknown transaction {tx_id}")))?;
        if record.outcome.is_some() {
            return Err(revert("root already executed"));
        }

        let graph_hash = record.graph.hash();
        let callees_ok = self.check_callees(tx_id, &graph_hash, &CallPath::root(), &record.graph, children)?;
        let success = if now > record.timeout {
            warn!(ledger = %self.ledger_id, tx = %tx_id, "root after timeout; failing the transaction");
            false
        } else {
            callees_ok && self.run_op(tx_id, &record.graph, false).success
        };

        if let Some(started) = self.started.get_mut(&tx_id) {
            started.outcome = Some(success);
        }
        Ok(vec![RootEvent { tx_id, success }.to_log(self.control)])
    }

    fn signalling(&mut self, proofs: &[Vec<u8>]) -> LedgerResult<Vec<Log>> {
        let (first, segments) = proofs
            .split_first()
            .ok_or_else(|| revert("signalling needs a root proof"))?;
        let root_proof = self.accept(first, "root")?;
        let root: RootEvent = event_of(&root_proof)?;
        if self.signalled.contains(&root.tx_id) {
            return Err(revert(format!("transaction {} already signalled", root.tx_id)));
        }

        let mut stores = BTreeSet::new();
        for encoded in segments {
            let proof = self.accept(encoded, "segment")?;
            if proof.ledger_id() != self.ledger_id {
                return Err(revert(format!("segment proof from ledger {}", proof.ledger_id())));
            }
            let event: SegmentEvent = event_of(&proof)?;
            if event.tx_id != root.tx_id {
                return Err(revert(format!("segment proof for transaction {}", event.tx_id)));
            }
            stores.extend(event.locked);
        }

        let mut released = 0;
        for address in &stores {
            if let Some(store) = self.stores.get_mut(address) {
                released += store.release(root.tx_id, root.success);
            }
        }
        debug!(ledger = %self.ledger_id, tx = %root.tx_id, commit = root.success, released, "locks released");
        self.signalled.insert(root.tx_id);

        let event = SignallingEvent {
            root_ledger: root_proof.ledger_id(),
            tx_id: root.tx_id,
        };
        Ok(vec![event.to_log(self.control)])
    }

    fn add_receipts_root(&mut self, source: LedgerId, root: H256, signatures: &[SignerSignature]) -> LedgerResult<Vec<Log>> {
        let registered = self.signers(source);
        let threshold = self.threshold(source);
        let message = receipts_root_message(source, &root);
        let valid: BTreeSet<Address> = signatures
            .iter()
            .filter(|s| registered.contains(&s.signer) && s.verify(&message).is_ok())
            .map(|s| s.signer)
            .collect();
        if registered.is_empty() || valid.len() < threshold {
            return Err(revert(format!(
                "{} valid signatures for ledger {source}, {threshold} required",
                valid.len()
            )));
        }
        self.roots.entry(source).or_default().insert(root);
        Ok(Vec::new())
    }

    /// Decode, attribute, and verify an incoming proof.
    fn accept(&self, encoded: &[u8], what: &str) -> LedgerResult<Proof> {
        let proof = Proof::decode(encoded).map_err(|e| revert(format!("malformed {what} proof: {e}")))?;
        let source = proof.ledger_id();
        let expected = if source == self.ledger_id {
            Some(self.control)
        } else {
            self.remotes.get(&source).copied()
        };
        if expected != Some(proof.contract()) {
            return Err(revert(format!(
                "{what} proof from unknown contract {} on ledger {source}",
                proof.contract()
            )));
        }
        proof
            .verify(self)
            .map_err(|e| revert(format!("untrusted {what} proof: {e}")))?;
        Ok(proof)
    }

    /// Verify the proofs of `node`'s callees, in child order. Returns whether
    /// every callee succeeded.
    fn check_callees(
        &self,
        tx_id: TransactionId,
        graph_hash: &H256,
        path: &CallPath,
        node: &CallGraphNode,
        proofs: &[Vec<u8>],
    ) -> LedgerResult<bool> {
        if proofs.len() != node.children.len() {
            return Err(revert(format!(
                "{path} has {} callees but {} proofs were given",
                node.children.len(),
                proofs.len()
            )));
        }
        let mut all_succeeded = true;
        for (index, (encoded, child)) in proofs.iter().zip(&node.children).enumerate() {
            let expected = path.child(index as u32);
            let proof = self.accept(encoded, "segment")?;
            let event: SegmentEvent = event_of(&proof)?;
            if event.tx_id != tx_id || event.graph_hash != *graph_hash || event.call_path != expected {
                return Err(revert(format!(
                    "segment proof for {} does not match callee {expected}",
                    event.call_path
                )));
            }
            if proof.ledger_id() != child.ledger_id {
                return Err(revert(format!(
                    "callee {expected} proven by ledger {} instead of {}",
                    proof.ledger_id(),
                    child.ledger_id
                )));
            }
            all_succeeded &= event.success;
        }
        Ok(all_succeeded)
    }

    /// Run the business call of `node`. Segment writes are locked until
    /// Signalling; root writes apply at once.
    fn run_op(&mut self, tx_id: TransactionId, node: &CallGraphNode, lock: bool) -> CallOutcome {
        let op = match KvOp::decode_rlp(&node.payload) {
            Ok(op) => op,
            Err(e) => return CallOutcome::failed(format!("bad payload: {e}")),
        };
        let Some(store) = self.stores.get_mut(&node.contract) else {
            return CallOutcome::failed(format!("no contract at {}", node.contract));
        };
        match op {
            KvOp::Get { key } => CallOutcome {
                success: true,
                return_value: store.get(&key).cloned().unwrap_or_default(),
                locked: Vec::new(),
            },
            KvOp::Set { key, value } if lock => match store.put_locked(tx_id, key, value) {
                Ok(()) => CallOutcome {
                    success: true,
                    return_value: Vec::new(),
                    locked: vec![node.contract],
                },
                Err(reason) => CallOutcome::failed(reason),
            },
            KvOp::Set { key, value } => match store.check_write(&key) {
                Ok(()) => {
                    store.put(key, value);
                    CallOutcome {
                        success: true,
                        return_value: Vec::new(),
                        locked: Vec::new(),
                    }
                }
                Err(reason) => CallOutcome::failed(reason),
            },
            KvOp::Fail { reason } => CallOutcome::failed(reason),
        }
    }
}

impl TrustAnchor for ContractState {
    fn is_trusted_root(&self, source: LedgerId, root: &H256) -> bool {
        self.roots.get(&source).is_some_and(|roots| roots.contains(root))
    }

    fn signers(&self, source: LedgerId) -> BTreeSet<Address> {
        self.signers.get(&source).cloned().unwrap_or_default()
    }
}

fn event_of<E: ControlEvent>(proof: &Proof) -> LedgerResult<E> {
    proof
        .event::<E>()
        .map_err(|e| revert(format!("proof carries no usable event: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlc_crypto::SigningKey;
    use xlc_rlp::Encodable;
    use xlc_trust::{signed_event_message, SignedEventProof};

    const CONTROL: Address = Address::new([0xc0; 20]);
    const STORAGE: Address = Address::new([0x5e; 20]);
    const STORE: Address = Address::new([0x11; 20]);

    fn state(id: u64) -> ContractState {
        ContractState::new(LedgerId::new(id), CONTROL, STORAGE, Address::new([0x0a; 20]))
    }

    fn graph() -> CallGraphNode {
        CallGraphNode::root(
            LedgerId::new(1),
            STORE,
            KvOp::get("x").rlp_bytes(),
            vec![CallGraphNode::leaf(LedgerId::new(1), STORE, KvOp::set("k", "v").rlp_bytes())],
        )
    }

    fn signed(key: &SigningKey, ledger: u64, event: &impl ControlEvent, topic: H256) -> Vec<u8> {
        let payload = event.rlp_bytes();
        let message = signed_event_message(LedgerId::new(ledger), &CONTROL, &topic, &payload);
        Proof::SignedEvent(SignedEventProof {
            ledger_id: LedgerId::new(ledger),
            contract: CONTROL,
            topic,
            payload,
            signatures: vec![SignerSignature::create(key, &message)],
        })
        .encode()
    }

    fn started(state: &mut ContractState, key: &SigningKey) -> StartEvent {
        state
            .execute(STORAGE, &ControlCall::RegisterSigner { source: LedgerId::new(1), signer: key.address() }, 0)
            .unwrap();
        let logs = state
            .execute(
                CONTROL,
                &ControlCall::Start {
                    tx_id: TransactionId::from_u64(1),
                    timeout_secs: 100,
                    call_graph: graph().encode(),
                },
                1_000,
            )
            .unwrap();
        StartEvent::from_log(&logs[0]).unwrap().unwrap()
    }

    #[test]
    fn start_records_absolute_timeout() {
        let key = SigningKey::generate();
        let mut state = state(1);
        let event = started(&mut state, &key);
        assert_eq!(event.timeout, 1_100);
        let again = state.execute(
            CONTROL,
            &ControlCall::Start {
                tx_id: TransactionId::from_u64(1),
                timeout_secs: 100,
                call_graph: graph().encode(),
            },
            1_000,
        );
        assert!(matches!(again, Err(LedgerError::Reverted { .. })));
    }

    #[test]
    fn start_on_wrong_ledger_reverts() {
        let mut state = state(2);
        let err = state
            .execute(
                CONTROL,
                &ControlCall::Start {
                    tx_id: TransactionId::from_u64(1),
                    timeout_secs: 1,
                    call_graph: graph().encode(),
                },
                0,
            )
            .unwrap_err();
        assert!(err.to_string().contains("rooted on ledger"));
    }

    #[test]
    fn segment_locks_and_signalling_commits() {
        let key = SigningKey::generate();
        let mut state = state(1);
        state.store_mut(STORE);
        let start = started(&mut state, &key);
        let start_proof = signed(&key, 1, &start, StartEvent::topic());

        let logs = state
            .execute(
                CONTROL,
                &ControlCall::Segment {
                    call_path: CallPath::new(vec![0]),
                    proofs: vec![start_proof.clone()],
                },
                1_010,
            )
            .unwrap();
        let segment = SegmentEvent::from_log(&logs[0]).unwrap().unwrap();
        assert!(segment.success);
        assert_eq!(segment.locked, vec![STORE]);
        assert!(state.store(&STORE).unwrap().is_locked(b"k"));

        let replay = state.execute(
            CONTROL,
            &ControlCall::Segment {
                call_path: CallPath::new(vec![0]),
                proofs: vec![start_proof],
            },
            1_010,
        );
        assert!(replay.unwrap_err().to_string().contains("already executed"));

        let root = RootEvent {
            tx_id: start.tx_id,
            success: true,
        };
        let proofs = vec![
            signed(&key, 1, &root, RootEvent::topic()),
            signed(&key, 1, &segment, SegmentEvent::topic()),
        ];
        state
            .execute(CONTROL, &ControlCall::Signalling { proofs: proofs.clone() }, 1_020)
            .unwrap();
        let store = state.store(&STORE).unwrap();
        assert!(!store.is_locked(b"k"));
        assert_eq!(store.get(b"k").unwrap(), b"v");

        let twice = state.execute(CONTROL, &ControlCall::Signalling { proofs }, 1_030);
        assert!(twice.unwrap_err().to_string().contains("already signalled"));
    }

    #[test]
    fn segment_after_timeout_reverts() {
        let key = SigningKey::generate();
        let mut state = state(1);
        let start = started(&mut state, &key);
        let err = state
            .execute(
                CONTROL,
                &ControlCall::Segment {
                    call_path: CallPath::new(vec![0]),
                    proofs: vec![signed(&key, 1, &start, StartEvent::topic())],
                },
                2_000,
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::reverted("transaction has timed out"));
    }

    #[test]
    fn unregistered_signer_is_untrusted() {
        let key = SigningKey::generate();
        let stranger = SigningKey::generate();
        let mut state = state(1);
        let start = started(&mut state, &key);
        let err = state
            .execute(
                CONTROL,
                &ControlCall::Segment {
                    call_path: CallPath::new(vec![0]),
                    proofs: vec![signed(&stranger, 1, &start, StartEvent::topic())],
                },
                1_001,
            )
            .unwrap_err();
        assert!(err.to_string().contains("untrusted start proof"));
    }

    #[test]
    fn receipts_root_needs_a_majority() {
        let keys: Vec<SigningKey> = (0..3).map(|_| SigningKey::generate()).collect();
        let mut state = state(1);
        for key in &keys {
            state
                .execute(STORAGE, &ControlCall::RegisterSigner { source: LedgerId::new(2), signer: key.address() }, 0)
                .unwrap();
        }
        let root = H256::new([7; 32]);
        let message = receipts_root_message(LedgerId::new(2), &root);
        let one = vec![SignerSignature::create(&keys[0], &message)];
        let call = ControlCall::AddReceiptsRoot {
            source: LedgerId::new(2),
            root,
            signatures: one.clone(),
        };
        assert!(state.execute(STORAGE, &call, 0).is_err());
        assert!(!state.is_trusted_root(LedgerId::new(2), &root));

        let mut two = one;
        two.push(SignerSignature::create(&keys[1], &message));
        let call = ControlCall::AddReceiptsRoot {
            source: LedgerId::new(2),
            root,
            signatures: two,
        };
        state.execute(STORAGE, &call, 0).unwrap();
        assert!(state.is_trusted_root(LedgerId::new(2), &root));
    }

    #[test]
    fn calls_must_target_the_right_contract() {
        let mut state = state(1);
        let err = state
            .execute(CONTROL, &ControlCall::RegisterSigner { source: LedgerId::new(1), signer: Address::zero() }, 0)
            .unwrap_err();
        assert!(err.to_string().contains("registerSigner"));
    }
}
