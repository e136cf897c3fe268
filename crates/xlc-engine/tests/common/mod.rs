#![allow(dead_code)]

use std::sync::Arc;

use xlc_crypto::{SigningIdentity, SigningKey};
use xlc_engine::{strategy_for, Executor, ExecutorConfig, PhaseObserver, StatsCollector};
use xlc_sim::scenario::Scenario;
use xlc_sim::{SimLedger, SimNetwork};
use xlc_trust::StrategyKind;
use xlc_types::{Address, Clock, LedgerId, ManualClock};

pub const ROOT: LedgerId = LedgerId::new(1);
pub const OTHER: LedgerId = LedgerId::new(2);
pub const NOW: u64 = 1_700_000_000;

pub const BOTH: [StrategyKind; 2] = [StrategyKind::ReceiptRoot, StrategyKind::SignedEvent];

pub struct Fixture {
    pub network: SimNetwork,
    pub scenario: Scenario,
    pub clock: Arc<ManualClock>,
    pub stats: Arc<StatsCollector>,
    pub signers: Vec<Arc<dyn SigningIdentity>>,
}

pub fn keys(n: usize) -> Vec<Arc<dyn SigningIdentity>> {
    (0..n)
        .map(|_| Arc::new(SigningKey::generate()) as Arc<dyn SigningIdentity>)
        .collect()
}

/// Two ledgers, the purchase scenario deployed, three registered signers.
pub async fn fixture(fail: bool) -> Fixture {
    let clock = Arc::new(ManualClock::new(NOW));
    let network = SimNetwork::new(&[ROOT, OTHER], Arc::clone(&clock) as Arc<dyn Clock>);
    let scenario = Scenario::purchase(ROOT, OTHER, fail);
    scenario.deploy(&network);

    let signers = keys(3);
    let addresses: Vec<Address> = signers.iter().map(|s| s.address()).collect();
    network.register_signers(&addresses).await.unwrap();

    Fixture {
        network,
        scenario,
        clock,
        stats: Arc::new(StatsCollector::new()),
        signers,
    }
}

impl Fixture {
    pub fn executor(&self, kind: StrategyKind) -> Executor {
        self.executor_with(ExecutorConfig::with_strategy(kind))
    }

    pub fn executor_with(&self, config: ExecutorConfig) -> Executor {
        Executor::new(
            self.network.registry(),
            strategy_for(config.strategy, self.signers.clone()),
            config,
        )
        .with_clock(Arc::clone(&self.clock) as Arc<dyn Clock>)
        .with_observer(Arc::clone(&self.stats) as Arc<dyn PhaseObserver>)
    }

    pub fn root(&self) -> &Arc<SimLedger> {
        self.network.ledger(ROOT).unwrap()
    }

    pub fn other(&self) -> &Arc<SimLedger> {
        self.network.ledger(OTHER).unwrap()
    }
}
