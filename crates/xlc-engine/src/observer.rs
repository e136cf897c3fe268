use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::Serialize;
use xlc_types::{CallPath, LedgerId};

use crate::error::Phase;

/// Cost of one control call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub ledger: LedgerId,
    /// Set for Segment calls only.
    pub call_path: Option<CallPath>,
    pub gas_used: u64,
    /// Wall-clock time of the submit, including mining.
    pub elapsed: Duration,
}

/// Sink for per-call statistics. Shared across transactions.
pub trait PhaseObserver: Send + Sync {
    fn on_phase(&self, record: &PhaseRecord);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl PhaseObserver for NoopObserver {
    fn on_phase(&self, _record: &PhaseRecord) {}
}

/// Totals for one phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub calls: usize,
    pub gas_used: u64,
    pub elapsed: Duration,
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct StatsCollector {
    records: RwLock<Vec<PhaseRecord>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PhaseRecord> {
        self.records.read().expect("lock poisoned").clone()
    }

    pub fn total_gas(&self) -> u64 {
        self.records
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|r| r.gas_used)
            .sum()
    }

    /// Calls, gas, and time per phase.
    pub fn summary(&self) -> BTreeMap<Phase, PhaseSummary> {
        let mut out: BTreeMap<Phase, PhaseSummary> = BTreeMap::new();
        for record in self.records.read().expect("lock poisoned").iter() {
            let entry = out.entry(record.phase).or_default();
            entry.calls += 1;
            entry.gas_used += record.gas_used;
            entry.elapsed += record.elapsed;
        }
        out
    }

    pub fn clear(&self) {
        self.records.write().expect("lock poisoned").clear();
    }
}

impl PhaseObserver for StatsCollector {
    fn on_phase(&self, record: &PhaseRecord) {
        self.records.write().expect("lock poisoned").push(record.clone());
    }
}
