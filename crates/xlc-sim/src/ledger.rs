use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;
use xlc_crypto::{event_topic, keccak256, keccak256_concat};
use xlc_ledger::{
    Block, ControlCall, Ledger, LedgerError, LedgerHandle, LedgerResult, Log, Receipt,
    TransactionReceipt,
};
use xlc_rlp::{Encodable, RlpItem};
use xlc_trie::ordered_root;
use xlc_trust::TrustAnchor;
use xlc_types::{Address, Clock, LedgerId, SystemClock, H256};

use crate::contract::ContractState;

const BASE_GAS: u64 = 21_000;
const GAS_PER_PROOF: u64 = 35_000;
const GAS_PER_LOG: u64 = 8_000;

/// An in-memory ledger that mines one block per accepted call.
///
/// Each block carries a few unrelated receipts around the submitted one so
/// inclusion proofs walk real branch and extension nodes.
pub struct SimLedger {
    id: LedgerId,
    control: Address,
    root_storage: Address,
    clock: Arc<dyn Clock>,
    inner: RwLock<LedgerState>,
}

struct LedgerState {
    contracts: ContractState,
    blocks: HashMap<H256, Block>,
    head: H256,
    height: u64,
    calls: BTreeMap<&'static str, usize>,
    corrupt_receipts_root: bool,
    unreachable: bool,
}

impl SimLedger {
    pub fn new(id: LedgerId) -> Arc<Self> {
        Self::with_clock(id, Arc::new(SystemClock))
    }

    pub fn with_clock(id: LedgerId, clock: Arc<dyn Clock>) -> Arc<Self> {
        let control = derive_address("control", id);
        let root_storage = derive_address("root-storage", id);
        let operator = derive_address("operator", id);
        Arc::new(Self {
            id,
            control,
            root_storage,
            clock,
            inner: RwLock::new(LedgerState {
                contracts: ContractState::new(id, control, root_storage, operator),
                blocks: HashMap::new(),
                head: H256::zero(),
                height: 0,
                calls: BTreeMap::new(),
                corrupt_receipts_root: false,
                unreachable: false,
            }),
        })
    }

    pub fn control_contract(&self) -> Address {
        self.control
    }

    pub fn root_storage(&self) -> Address {
        self.root_storage
    }

    pub fn handle(self: &Arc<Self>) -> LedgerHandle {
        LedgerHandle::new(Arc::clone(self) as Arc<dyn Ledger>, self.control, self.root_storage)
    }

    /// Accept proofs about `ledger` emitted by `control`.
    pub fn register_remote(&self, ledger: LedgerId, control: Address) {
        self.inner
            .write()
            .expect("lock poisoned")
            .contracts
            .register_remote(ledger, control);
    }

    /// Create an empty key/value store at `address`.
    pub fn deploy_store(&self, address: Address) {
        self.inner.write().expect("lock poisoned").contracts.store_mut(address);
    }

    /// Write directly into a store, deploying it if needed.
    pub fn seed(&self, store: Address, key: &[u8], value: &[u8]) {
        self.inner
            .write()
            .expect("lock poisoned")
            .contracts
            .store_mut(store)
            .put(key.to_vec(), value.to_vec());
    }

    pub fn value(&self, store: &Address, key: &[u8]) -> Option<Vec<u8>> {
        let state = self.inner.read().expect("lock poisoned");
        state.contracts.store(store).and_then(|s| s.get(key).cloned())
    }

    pub fn is_locked(&self, store: &Address, key: &[u8]) -> bool {
        let state = self.inner.read().expect("lock poisoned");
        state.contracts.store(store).is_some_and(|s| s.is_locked(key))
    }

    pub fn has_locks(&self, store: &Address) -> bool {
        let state = self.inner.read().expect("lock poisoned");
        state.contracts.store(store).is_some_and(|s| s.has_locks())
    }

    pub fn signers(&self, source: LedgerId) -> BTreeSet<Address> {
        self.inner.read().expect("lock poisoned").contracts.signers(source)
    }

    pub fn is_trusted_root(&self, source: LedgerId, root: &H256) -> bool {
        self.inner
            .read()
            .expect("lock poisoned")
            .contracts
            .is_trusted_root(source, root)
    }

    /// Report a wrong receipts root in every block mined from now on.
    pub fn set_corrupt_receipts_root(&self, corrupt: bool) {
        self.inner.write().expect("lock poisoned").corrupt_receipts_root = corrupt;
    }

    /// Fail every request with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.write().expect("lock poisoned").unreachable = unreachable;
    }

    /// Calls of `function` that reached the ledger, reverted or not.
    pub fn call_count(&self, function: &str) -> usize {
        self.inner
            .read()
            .expect("lock poisoned")
            .calls
            .get(function)
            .copied()
            .unwrap_or(0)
    }

    pub fn height(&self) -> u64 {
        self.inner.read().expect("lock poisoned").height
    }

    fn apply(&self, contract: Address, call: &ControlCall) -> LedgerResult<TransactionReceipt> {
        let mut state = self.inner.write().expect("lock poisoned");
        if state.unreachable {
            return Err(LedgerError::Transport(format!("ledger {} is unreachable", self.id)));
        }
        *state.calls.entry(call.function()).or_default() += 1;

        let now = self.clock.now_secs();
        let logs = state.contracts.execute(contract, call, now).inspect_err(|e| {
            debug!(ledger = %self.id, function = call.function(), error = %e, "call reverted");
        })?;
        let gas_used = BASE_GAS + GAS_PER_PROOF * proof_count(call) + GAS_PER_LOG * logs.len() as u64;
        Ok(state.mine(self.id, call.function(), logs, gas_used))
    }

    fn block(&self, hash: &H256) -> LedgerResult<Block> {
        let state = self.inner.read().expect("lock poisoned");
        if state.unreachable {
            return Err(LedgerError::Transport(format!("ledger {} is unreachable", self.id)));
        }
        state
            .blocks
            .get(hash)
            .cloned()
            .ok_or(LedgerError::UnknownBlock(*hash))
    }
}

impl LedgerState {
    fn mine(&mut self, ledger: LedgerId, function: &str, logs: Vec<Log>, gas_used: u64) -> TransactionReceipt {
        let number = self.height + 1;
        let fillers = 1 + (number % 3) as usize;

        let mut receipts = Vec::with_capacity(fillers + 2);
        let mut cumulative = 0;
        for i in 0..fillers {
            cumulative += BASE_GAS;
            receipts.push(Receipt::new(true, cumulative, vec![filler_log(number, i)]));
        }
        let index = receipts.len();
        cumulative += gas_used;
        receipts.push(Receipt::new(true, cumulative, logs));
        cumulative += BASE_GAS;
        receipts.push(Receipt::new(false, cumulative, Vec::new()));

        let encoded: Vec<Vec<u8>> = receipts.iter().map(Encodable::rlp_bytes).collect();
        let mut receipts_root = ordered_root(&encoded);
        if self.corrupt_receipts_root {
            receipts_root = keccak256(receipts_root.as_bytes());
        }
        let header = RlpItem::list(vec![
            ledger.to_rlp(),
            RlpItem::uint(number),
            self.head.to_rlp(),
            receipts_root.to_rlp(),
        ]);
        let hash = keccak256(&header.rlp_bytes());
        let transaction_hash = keccak256(
            &RlpItem::list(vec![
                hash.to_rlp(),
                RlpItem::uint(index as u64),
                RlpItem::bytes(function.as_bytes().to_vec()),
            ])
            .rlp_bytes(),
        );

        let receipt = receipts[index].clone();
        self.blocks.insert(
            hash,
            Block {
                hash,
                number,
                receipts_root,
                receipts,
            },
        );
        self.head = hash;
        self.height = number;
        debug!(ledger = %ledger, block = number, function, gas_used, "mined");

        TransactionReceipt {
            ledger_id: ledger,
            transaction_hash,
            block_hash: hash,
            block_number: number,
            transaction_index: index as u64,
            gas_used,
            receipt,
        }
    }
}

#[async_trait]
impl Ledger for SimLedger {
    fn id(&self) -> LedgerId {
        self.id
    }

    async fn submit(&self, contract: Address, call: &ControlCall) -> LedgerResult<TransactionReceipt> {
        self.apply(contract, call)
    }

    async fn get_block(&self, hash: &H256) -> LedgerResult<Block> {
        self.block(hash)
    }
}

fn proof_count(call: &ControlCall) -> u64 {
    match call {
        ControlCall::Segment { proofs, .. } | ControlCall::Root { proofs } | ControlCall::Signalling { proofs } => {
            proofs.len() as u64
        }
        ControlCall::AddReceiptsRoot { signatures, .. } => signatures.len() as u64,
        ControlCall::Start { .. } | ControlCall::RegisterSigner { .. } => 0,
    }
}

fn filler_log(block: u64, index: usize) -> Log {
    let mut data = block.to_be_bytes().to_vec();
    data.extend_from_slice(&(index as u64).to_be_bytes());
    Log::new(
        Address::new([0xfe; 20]),
        event_topic("Transfer(address,address,uint256)"),
        data,
    )
}

/// Deterministic contract address for `label` on ledger `id`.
fn derive_address(label: &str, id: LedgerId) -> Address {
    let hash = keccak256_concat(&[label.as_bytes(), &id.as_u64().to_be_bytes()]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash.as_bytes()[12..]);
    Address::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlc_graph::CallGraphNode;
    use xlc_ledger::{ControlEvent, StartEvent};
    use xlc_trie::{index_key, PatriciaTrie};
    use xlc_types::{ManualClock, TransactionId};

    use crate::kv::KvOp;

    fn start_call(ledger: LedgerId) -> ControlCall {
        let graph = CallGraphNode::root(
            ledger,
            Address::new([1; 20]),
            KvOp::get("k").rlp_bytes(),
            vec![],
        );
        ControlCall::Start {
            tx_id: TransactionId::from_u64(1),
            timeout_secs: 30,
            call_graph: graph.encode(),
        }
    }

    #[tokio::test]
    async fn mined_block_root_matches_its_receipts() {
        let ledger = SimLedger::with_clock(LedgerId::new(1), Arc::new(ManualClock::new(500)));
        let receipt = ledger
            .submit(ledger.control_contract(), &start_call(LedgerId::new(1)))
            .await
            .unwrap();
        let block = ledger.get_block(&receipt.block_hash).await.unwrap();

        let mut trie = PatriciaTrie::new();
        for (i, r) in block.receipts.iter().enumerate() {
            trie.put(&index_key(i as u64), r.rlp_bytes());
        }
        assert_eq!(trie.root_hash(), block.receipts_root);
        assert_eq!(block.receipts[receipt.transaction_index as usize], receipt.receipt);

        let control = ledger.control_contract();
        let topic = StartEvent::topic();
        let log = receipt
            .logs_for(&control, &topic)
            .next()
            .unwrap();
        let event = StartEvent::from_log(log).unwrap().unwrap();
        assert_eq!(event.timeout, 530);
    }

    #[tokio::test]
    async fn corrupt_root_is_reported() {
        let ledger = SimLedger::new(LedgerId::new(2));
        ledger.set_corrupt_receipts_root(true);
        let receipt = ledger
            .submit(ledger.control_contract(), &start_call(LedgerId::new(2)))
            .await
            .unwrap();
        let block = ledger.get_block(&receipt.block_hash).await.unwrap();
        let encoded: Vec<Vec<u8>> = block.receipts.iter().map(Encodable::rlp_bytes).collect();
        assert_ne!(ordered_root(&encoded), block.receipts_root);
    }

    #[tokio::test]
    async fn reverted_calls_mine_nothing() {
        let ledger = SimLedger::new(LedgerId::new(3));
        let err = ledger
            .submit(ledger.control_contract(), &start_call(LedgerId::new(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Reverted { .. }));
        assert_eq!(ledger.height(), 0);
        assert_eq!(ledger.call_count("start"), 1);
    }

    #[tokio::test]
    async fn unreachable_ledger_fails_with_transport() {
        let ledger = SimLedger::new(LedgerId::new(4));
        ledger.set_unreachable(true);
        let err = ledger
            .submit(ledger.control_contract(), &start_call(LedgerId::new(4)))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(ledger.call_count("start"), 0);
        assert!(ledger.get_block(&H256::zero()).await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn blocks_chain_and_vary_in_size() {
        let ledger = SimLedger::new(LedgerId::new(5));
        let mut sizes = BTreeSet::new();
        let mut previous = None;
        for i in 0..3 {
            let call = ControlCall::RegisterSigner {
                source: LedgerId::new(i),
                signer: Address::new([i as u8; 20]),
            };
            let receipt = ledger.submit(ledger.root_storage(), &call).await.unwrap();
            assert_ne!(Some(receipt.block_hash), previous);
            previous = Some(receipt.block_hash);
            sizes.insert(ledger.get_block(&receipt.block_hash).await.unwrap().receipts.len());
        }
        assert_eq!(sizes.len(), 3);
        assert_eq!(ledger.height(), 3);
    }

    #[test]
    fn addresses_differ_per_ledger_and_role() {
        let a = SimLedger::new(LedgerId::new(1));
        let b = SimLedger::new(LedgerId::new(2));
        assert_ne!(a.control_contract(), b.control_contract());
        assert_ne!(a.control_contract(), a.root_storage());
        assert_eq!(a.handle().id(), LedgerId::new(1));
    }
}
