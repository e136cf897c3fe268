use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use xlc_graph::CallGraphNode;
use xlc_ledger::{
    ControlCall, ControlEvent, LedgerError, LedgerHandle, LedgerRegistry, RootEvent, SegmentEvent,
    SignallingEvent, StartEvent, TransactionReceipt,
};
use xlc_trust::{Proof, TrustStrategy};
use xlc_types::{CallPath, Clock, LedgerId, SystemClock, TransactionId, H256};

use crate::config::ExecutorConfig;
use crate::error::{EngineError, EngineResult, Phase};
use crate::observer::{NoopObserver, PhaseObserver, PhaseRecord};
use crate::transaction::{CrossLedgerTransaction, SegmentResult, TxPhase};

/// Result of driving a whole call graph.
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    pub tx_id: TransactionId,
    pub success: bool,
    pub timed_out: bool,
    pub segments: BTreeMap<CallPath, SegmentResult>,
    /// Ledgers that received Signalling, ascending.
    pub signalled: Vec<LedgerId>,
    pub phases: Vec<PhaseRecord>,
}

/// A control call that was mined but whose proof was not yet taken.
#[derive(Clone, Debug)]
struct Mined {
    phase: Phase,
    call_path: Option<CallPath>,
    ledger: LedgerId,
    receipt: TransactionReceipt,
}

/// A recorded proof still owed to some ledgers.
#[derive(Clone, Debug)]
struct Unpublished {
    phase: Phase,
    call_path: Option<CallPath>,
    proof: Proof,
    targets: Vec<LedgerId>,
}

/// Drives one cross-ledger transaction.
///
/// An executor is single-use: it owns the proof maps of exactly one
/// transaction. Start one executor per transaction; the registry, strategy,
/// and observer are shared.
///
/// A call is never submitted twice. Once mined, its receipt is kept until the
/// proof is taken, and a proof is recorded before it is published. Retrying a
/// phase after a transport failure resumes from there, and any other phase
/// first finishes the outstanding publication.
pub struct Executor {
    registry: Arc<LedgerRegistry>,
    strategy: Arc<dyn TrustStrategy>,
    observer: Arc<dyn PhaseObserver>,
    clock: Arc<dyn Clock>,
    config: ExecutorConfig,

    tx: Option<CrossLedgerTransaction>,
    start_proof: Option<Proof>,
    /// Segment proofs filed under their caller's path, by child index.
    segment_proofs: BTreeMap<CallPath, BTreeMap<u32, Proof>>,
    /// Proofs of segments that locked contracts, by the ledger holding them.
    locked_proofs: BTreeMap<LedgerId, Vec<Proof>>,
    results: BTreeMap<CallPath, SegmentResult>,
    root_proof: Option<Proof>,
    signalled: BTreeSet<LedgerId>,
    records: Vec<PhaseRecord>,
    mined: Option<Mined>,
    unpublished: Option<Unpublished>,
}

impl Executor {
    pub fn new(
        registry: Arc<LedgerRegistry>,
        strategy: Arc<dyn TrustStrategy>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            strategy,
            observer: Arc::new(NoopObserver),
            clock: Arc::new(SystemClock),
            config,
            tx: None,
            start_proof: None,
            segment_proofs: BTreeMap::new(),
            locked_proofs: BTreeMap::new(),
            results: BTreeMap::new(),
            root_proof: None,
            signalled: BTreeSet::new(),
            records: Vec::new(),
            mined: None,
            unpublished: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn transaction(&self) -> Option<&CrossLedgerTransaction> {
        self.tx.as_ref()
    }

    pub fn phase(&self) -> TxPhase {
        self.tx.as_ref().map_or(TxPhase::Init, |tx| tx.phase)
    }

    pub fn segment_result(&self, path: &CallPath) -> Option<&SegmentResult> {
        self.results.get(path)
    }

    pub fn start_proof(&self) -> Option<&Proof> {
        self.start_proof.as_ref()
    }

    pub fn root_proof(&self) -> Option<&Proof> {
        self.root_proof.as_ref()
    }

    /// Ledgers holding locked contracts, ascending.
    pub fn locked_ledgers(&self) -> Vec<LedgerId> {
        self.locked_proofs.keys().copied().collect()
    }

    /// Ledgers that have received Signalling, ascending.
    pub fn signalled_ledgers(&self) -> Vec<LedgerId> {
        self.signalled.iter().copied().collect()
    }

    /// Calls made so far, in order.
    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    /// Start, every segment children first, Root, and (unless disabled)
    /// Signalling, under a fresh random transaction id.
    pub async fn run(&mut self, graph: CallGraphNode) -> EngineResult<ExecutionOutcome> {
        let tx_id = TransactionId::random();
        let order = graph.segment_order();
        self.start(tx_id, self.config.timeout_secs, graph).await?;
        for path in order {
            self.segment(&path).await?;
        }
        self.root().await?;
        if self.config.auto_signal {
            self.signalling().await?;
        }
        self.outcome()
    }

    /// Snapshot of the transaction after Root.
    pub fn outcome(&self) -> EngineResult<ExecutionOutcome> {
        let tx = self.require_tx(Phase::Root, None)?;
        let success = tx
            .success
            .ok_or_else(|| EngineError::invariant(Phase::Root, None, "root has not executed"))?;
        Ok(ExecutionOutcome {
            tx_id: tx.id,
            success,
            timed_out: tx.timed_out,
            segments: self.results.clone(),
            signalled: self.signalled_ledgers(),
            phases: self.records.clone(),
        })
    }

    /// Begin the transaction on the root ledger and publish the Start proof
    /// to every registered ledger.
    pub async fn start(
        &mut self,
        tx_id: TransactionId,
        timeout_secs: u64,
        graph: CallGraphNode,
    ) -> EngineResult<()> {
        if self.settle(Phase::Start, None).await? {
            return match &self.tx {
                Some(tx) if tx.id == tx_id => Ok(()),
                _ => Err(EngineError::invariant(
                    Phase::Start,
                    None,
                    "this executor already started a transaction",
                )),
            };
        }
        if self.tx.is_some() {
            return Err(EngineError::invariant(
                Phase::Start,
                None,
                "this executor already started a transaction",
            ));
        }
        if self.strategy.kind() != self.config.strategy {
            return Err(EngineError::invariant(
                Phase::Start,
                None,
                format!(
                    "configured for {} but the strategy is {}",
                    self.config.strategy,
                    self.strategy.kind()
                ),
            ));
        }
        graph
            .validate()
            .map_err(|e| EngineError::from_graph(Phase::Start, None, e))?;
        for ledger in graph.ledgers() {
            if !self.registry.contains(ledger) {
                return Err(EngineError::invariant(
                    Phase::Start,
                    None,
                    format!("call graph uses unregistered ledger {ledger}"),
                ));
            }
        }

        let root = self.handle(Phase::Start, None, graph.ledger_id)?;
        let encoded = graph.encode();
        info!(tx = %tx_id, root = %root.id(), nodes = graph.node_count(), "starting cross-ledger transaction");

        let call = ControlCall::Start {
            tx_id,
            timeout_secs,
            call_graph: encoded.clone(),
        };
        let receipt = self.submit_once(Phase::Start, None, &root, &call).await?;
        let (proof, event) = self.prove::<StartEvent>(Phase::Start, None, &root, &receipt).await?;
        if event.tx_id != tx_id {
            return Err(EngineError::integrity(
                Phase::Start,
                None,
                format!("start event names transaction {}", event.tx_id),
            ));
        }
        if event.call_graph != encoded {
            return Err(EngineError::integrity(
                Phase::Start,
                None,
                "start event carries a different call graph",
            ));
        }
        debug!(tx = %event.tx_id, caller = %event.caller, timeout = event.timeout, "start event");

        self.mined = None;
        self.start_proof = Some(proof.clone());
        self.tx = Some(CrossLedgerTransaction {
            id: tx_id,
            root_ledger: root.id(),
            timeout: event.timeout,
            call_graph: graph,
            phase: TxPhase::Started,
            success: None,
            timed_out: false,
        });
        self.unpublished = Some(Unpublished {
            phase: Phase::Start,
            call_path: None,
            proof,
            targets: self.registry.ids(),
        });
        self.flush().await
    }

    /// Execute the node at `path` on its ledger.
    ///
    /// Every child of the node must already have executed: the segment call
    /// carries the Start proof followed by the children's proofs in child
    /// order. The resulting proof is filed under the caller's path and, if
    /// the segment locked contracts, under its ledger for Signalling.
    pub async fn segment(&mut self, path: &CallPath) -> EngineResult<SegmentResult> {
        let phase = Phase::Segment;
        let at = Some(path);
        if self.settle(phase, at).await? {
            if let Some(result) = self.results.get(path) {
                return Ok(result.clone());
            }
        }
        let tx = self.require_tx(phase, at)?;
        let Some(parent) = path.parent() else {
            return Err(EngineError::invariant(
                phase,
                at,
                "the root call executes in the root phase",
            ));
        };
        if self.root_proof.is_some() {
            return Err(EngineError::invariant(phase, at, "root has already executed"));
        }
        let node = tx
            .call_graph
            .node_at(path)
            .map_err(|e| EngineError::from_graph(phase, at, e))?;
        let caller_ledger = tx
            .call_graph
            .node_at(&parent)
            .map_err(|e| EngineError::from_graph(phase, at, e))?
            .ledger_id;
        if self.results.contains_key(path) {
            return Err(EngineError::invariant(phase, at, "segment has already executed"));
        }
        for index in 0..node.children.len() as u32 {
            let child = path.child(index);
            if !self.results.contains_key(&child) {
                return Err(EngineError::invariant(
                    phase,
                    at,
                    format!("child {child} has not executed"),
                ));
            }
        }
        let tx_id = tx.id;
        let graph_hash = tx.call_graph.hash();
        let ledger_id = node.ledger_id;

        self.check_timeout(phase);

        let handle = self.handle(phase, at, ledger_id)?;
        let proofs = self.proofs_for(path)?;
        let call = ControlCall::Segment {
            call_path: path.clone(),
            proofs,
        };
        let receipt = self.submit_once(phase, at, &handle, &call).await?;
        let (proof, event) = self.prove::<SegmentEvent>(phase, at, &handle, &receipt).await?;
        check_segment_event(&event, tx_id, path, &graph_hash)?;
        log_segment_event(&event);
        self.mined = None;

        let mut targets = vec![caller_ledger];
        if !event.locked.is_empty() && ledger_id != caller_ledger {
            targets.push(ledger_id);
        }

        if let Some(index) = path.last() {
            self.segment_proofs
                .entry(parent)
                .or_default()
                .insert(index, proof.clone());
        }
        if !event.locked.is_empty() {
            self.locked_proofs
                .entry(ledger_id)
                .or_default()
                .push(proof.clone());
        }
        let result = SegmentResult {
            call_path: path.clone(),
            ledger_id,
            success: event.success,
            return_value: event.return_value,
            locked: event.locked,
            proof,
        };
        self.results.insert(path.clone(), result.clone());
        if let Some(tx) = self.tx.as_mut() {
            if tx.phase == TxPhase::Started {
                tx.phase = TxPhase::Segmenting;
            }
        }
        self.unpublished = Some(Unpublished {
            phase,
            call_path: Some(path.clone()),
            proof: result.proof.clone(),
            targets,
        });
        self.flush().await?;
        Ok(result)
    }

    /// Execute the root call and publish the Root proof everywhere.
    ///
    /// Returns the transaction outcome. `false` is a normal result, not an
    /// error.
    pub async fn root(&mut self) -> EngineResult<bool> {
        let phase = Phase::Root;
        if self.settle(phase, None).await? {
            if let Some(success) = self.tx.as_ref().and_then(|tx| tx.success) {
                return Ok(success);
            }
        }
        let tx = self.require_tx(phase, None)?;
        if self.root_proof.is_some() {
            return Err(EngineError::invariant(phase, None, "root has already executed"));
        }
        for index in 0..tx.call_graph.children.len() as u32 {
            let child = CallPath::root().child(index);
            if !self.results.contains_key(&child) {
                return Err(EngineError::invariant(
                    phase,
                    None,
                    format!("segment {child} has not executed"),
                ));
            }
        }
        let tx_id = tx.id;
        let root_ledger = tx.root_ledger;

        self.check_timeout(phase);

        let handle = self.handle(phase, None, root_ledger)?;
        let proofs = self.proofs_for(&CallPath::root())?;
        let receipt = self
            .submit_once(phase, None, &handle, &ControlCall::Root { proofs })
            .await?;
        let (proof, event) = self.prove::<RootEvent>(phase, None, &handle, &receipt).await?;
        if event.tx_id != tx_id {
            return Err(EngineError::integrity(
                phase,
                None,
                format!("root event names transaction {}", event.tx_id),
            ));
        }
        info!(tx = %tx_id, success = event.success, "root executed");

        self.mined = None;
        self.root_proof = Some(proof.clone());
        if let Some(tx) = self.tx.as_mut() {
            tx.success = Some(event.success);
            tx.phase = TxPhase::Rooted;
        }
        self.unpublished = Some(Unpublished {
            phase,
            call_path: None,
            proof,
            targets: self.registry.ids(),
        });
        self.flush().await?;
        Ok(event.success)
    }

    /// Deliver the Root proof to every ledger holding locked contracts.
    ///
    /// Ledgers already signalled are skipped, so a call after a partial
    /// failure only retries the rest. A Root proof whose publication was cut
    /// short is delivered first. Returns the ledgers signalled by this call.
    pub async fn signalling(&mut self) -> EngineResult<Vec<LedgerId>> {
        let phase = Phase::Signalling;
        self.settle(phase, None).await?;
        let tx = self.require_tx(phase, None)?;
        let tx_id = tx.id;
        let root_ledger = tx.root_ledger;
        let Some(root_proof) = self.root_proof.clone() else {
            return Err(EngineError::invariant(phase, None, "root has not executed"));
        };

        let pending: Vec<(LedgerId, Vec<Proof>)> = self
            .locked_proofs
            .iter()
            .filter(|(ledger, _)| !self.signalled.contains(ledger))
            .map(|(ledger, proofs)| (*ledger, proofs.clone()))
            .collect();
        if pending.is_empty() {
            debug!(tx = %tx_id, "no ledger awaits signalling");
        }

        let mut done = Vec::with_capacity(pending.len());
        for (ledger, locked) in pending {
            let handle = self.handle(phase, None, ledger)?;
            let mut proofs = Vec::with_capacity(locked.len() + 1);
            proofs.push(root_proof.encode());
            proofs.extend(locked.iter().map(Proof::encode));
            let receipt = self
                .submit(phase, None, &handle, &ControlCall::Signalling { proofs })
                .await?;

            let event = receipt
                .logs_for(&handle.control_contract, &SignallingEvent::topic())
                .find_map(|log| SignallingEvent::from_log(log))
                .ok_or_else(|| {
                    EngineError::integrity(phase, None, format!("ledger {ledger} emitted no signalling event"))
                })?
                .map_err(|e| EngineError::integrity(phase, None, e.to_string()))?;
            if event.tx_id != tx_id || event.root_ledger != root_ledger {
                return Err(EngineError::integrity(
                    phase,
                    None,
                    format!("ledger {ledger} signalled transaction {} of {}", event.tx_id, event.root_ledger),
                ));
            }
            info!(tx = %tx_id, ledger = %ledger, segments = locked.len(), "signalled");
            self.signalled.insert(ledger);
            done.push(ledger);
        }

        if let Some(tx) = self.tx.as_mut() {
            tx.phase = TxPhase::Signalled;
        }
        Ok(done)
    }

    fn require_tx(&self, phase: Phase, at: Option<&CallPath>) -> EngineResult<&CrossLedgerTransaction> {
        self.tx
            .as_ref()
            .ok_or_else(|| EngineError::invariant(phase, at, "transaction has not started"))
    }

    fn handle(&self, phase: Phase, at: Option<&CallPath>, ledger: LedgerId) -> EngineResult<LedgerHandle> {
        self.registry
            .get(ledger)
            .map_err(|e| EngineError::from_ledger(phase, at, e))
    }

    /// Start proof followed by the proofs filed under `path`, in child order.
    fn proofs_for(&self, path: &CallPath) -> EngineResult<Vec<Vec<u8>>> {
        let phase = if path.is_root() { Phase::Root } else { Phase::Segment };
        let start = self
            .start_proof
            .as_ref()
            .ok_or_else(|| EngineError::invariant(phase, Some(path), "no start proof"))?;
        let mut proofs = vec![start.encode()];
        if let Some(children) = self.segment_proofs.get(path) {
            proofs.extend(children.values().map(Proof::encode));
        }
        Ok(proofs)
    }

    /// Submit `call` unless an earlier attempt of the same phase already got
    /// it mined on that ledger.
    async fn submit_once(
        &mut self,
        phase: Phase,
        at: Option<&CallPath>,
        handle: &LedgerHandle,
        call: &ControlCall,
    ) -> EngineResult<TransactionReceipt> {
        if let Some(mined) = &self.mined {
            if mined.phase == phase && mined.call_path.as_ref() == at && mined.ledger == handle.id() {
                debug!(%phase, ledger = %mined.ledger, "reusing mined receipt");
                return Ok(mined.receipt.clone());
            }
        }
        let receipt = self.submit(phase, at, handle, call).await?;
        self.mined = Some(Mined {
            phase,
            call_path: at.cloned(),
            ledger: handle.id(),
            receipt: receipt.clone(),
        });
        Ok(receipt)
    }

    async fn submit(
        &mut self,
        phase: Phase,
        at: Option<&CallPath>,
        handle: &LedgerHandle,
        call: &ControlCall,
    ) -> EngineResult<TransactionReceipt> {
        let started = Instant::now();
        let receipt = handle
            .ledger
            .submit(handle.control_contract, call)
            .await
            .map_err(|e| {
                match &e {
                    LedgerError::Reverted { reason } => {
                        error!(%phase, ledger = %handle.id(), function = call.function(), %reason, "call reverted")
                    }
                    LedgerError::Transport(reason) => {
                        warn!(%phase, ledger = %handle.id(), function = call.function(), %reason, "ledger unreachable")
                    }
                    _ => {}
                }
                EngineError::from_ledger(phase, at, e)
            })?;

        let record = PhaseRecord {
            phase,
            ledger: handle.id(),
            call_path: at.cloned(),
            gas_used: receipt.gas_used,
            elapsed: started.elapsed(),
        };
        debug!(%phase, ledger = %record.ledger, gas = record.gas_used, "control call mined");
        self.observer.on_phase(&record);
        self.records.push(record);
        Ok(receipt)
    }

    async fn prove<E: ControlEvent>(
        &self,
        phase: Phase,
        at: Option<&CallPath>,
        handle: &LedgerHandle,
        receipt: &TransactionReceipt,
    ) -> EngineResult<(Proof, E)> {
        let proof = self
            .strategy
            .produce_proof(handle, receipt, E::topic())
            .await
            .map_err(|e| EngineError::from_trust(phase, at, e))?;
        let event = proof
            .event::<E>()
            .map_err(|e| EngineError::from_trust(phase, at, e))?;
        Ok((proof, event))
    }

    async fn publish(
        &self,
        phase: Phase,
        at: Option<&CallPath>,
        proof: &Proof,
        ledgers: &[LedgerId],
    ) -> EngineResult<()> {
        let targets = ledgers
            .iter()
            .map(|id| self.handle(phase, at, *id))
            .collect::<EngineResult<Vec<_>>>()?;
        self.strategy
            .publish(proof, &targets)
            .await
            .map_err(|e| EngineError::from_trust(phase, at, e))
    }

    /// Finish an interrupted publication. Returns whether it belonged to
    /// `phase` at `at`, in which case that call has already been recorded.
    async fn settle(&mut self, phase: Phase, at: Option<&CallPath>) -> EngineResult<bool> {
        let resumes = match &self.unpublished {
            None => return Ok(false),
            Some(u) => u.phase == phase && u.call_path.as_ref() == at,
        };
        self.flush().await?;
        Ok(resumes)
    }

    /// Publish the outstanding proof one ledger at a time, keeping whatever
    /// is left when a target fails.
    async fn flush(&mut self) -> EngineResult<()> {
        let Some(mut pending) = self.unpublished.take() else {
            return Ok(());
        };
        while let Some(&ledger) = pending.targets.first() {
            let published = self
                .publish(pending.phase, pending.call_path.as_ref(), &pending.proof, &[ledger])
                .await;
            if let Err(e) = published {
                warn!(
                    phase = %pending.phase,
                    ledger = %ledger,
                    remaining = pending.targets.len(),
                    error = %e,
                    "publication interrupted"
                );
                self.unpublished = Some(pending);
                return Err(e);
            }
            pending.targets.remove(0);
        }
        Ok(())
    }

    fn check_timeout(&mut self, phase: Phase) {
        let now = self.clock.now_secs();
        let window = self.config.warning_window_secs;
        let Some(tx) = self.tx.as_mut() else {
            return;
        };
        if now >= tx.timeout {
            if !tx.timed_out {
                warn!(tx = %tx.id, %phase, timeout = tx.timeout, now, "transaction has timed out");
            }
            tx.timed_out = true;
            tx.phase = TxPhase::TimedOut;
        } else if tx.timeout - now <= window {
            warn!(tx = %tx.id, %phase, remaining = tx.timeout - now, "time-out is soon");
        }
    }
}

fn check_segment_event(
    event: &SegmentEvent,
    tx_id: TransactionId,
    path: &CallPath,
    graph_hash: &H256,
) -> EngineResult<()> {
    let at = Some(path);
    if event.tx_id != tx_id {
        return Err(EngineError::integrity(
            Phase::Segment,
            at,
            format!("segment event names transaction {}", event.tx_id),
        ));
    }
    if event.call_path != *path {
        return Err(EngineError::integrity(
            Phase::Segment,
            at,
            format!("segment event names call path {}", event.call_path),
        ));
    }
    if event.graph_hash != *graph_hash {
        return Err(EngineError::integrity(
            Phase::Segment,
            at,
            format!("segment event graph hash {} differs from {graph_hash}", event.graph_hash),
        ));
    }
    Ok(())
}

fn log_segment_event(event: &SegmentEvent) {
    let locked: Vec<String> = event.locked.iter().map(ToString::to_string).collect();
    let return_value = hex::encode(&event.return_value);
    info!(
        tx = %event.tx_id,
        call_path = %event.call_path,
        graph_hash = %event.graph_hash,
        success = event.success,
        return_value = %return_value,
        locked = ?locked,
        "segment event"
    );
}
