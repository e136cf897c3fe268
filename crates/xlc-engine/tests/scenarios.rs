mod common;

use common::{fixture, BOTH, OTHER, ROOT};
use xlc_engine::{EngineError, Phase, TxPhase};
use xlc_sim::scenario::{Scenario, ORDER_KEY, PRICE_KEY, STOCK_KEY};
use xlc_trust::StrategyKind;
use xlc_types::{CallPath, TransactionId};

#[tokio::test]
async fn scenario_a_commits_and_unlocks() {
    for kind in BOTH {
        let fx = fixture(false).await;
        let mut executor = fx.executor(kind);
        let outcome = executor.run(fx.scenario.graph.clone()).await.unwrap();

        assert!(outcome.success, "{kind}");
        assert!(!outcome.timed_out);
        let read = &outcome.segments[&CallPath::new(vec![0])];
        assert!(read.success);
        assert!(read.locked.is_empty());
        assert_eq!(read.return_value, Scenario::PRICE);

        let reserve = &outcome.segments[&CallPath::new(vec![1])];
        assert!(reserve.success);
        assert_eq!(reserve.locked, vec![fx.scenario.other_store]);
        assert_eq!(outcome.signalled, vec![OTHER]);

        let other = fx.other();
        assert!(!other.is_locked(&fx.scenario.other_store, STOCK_KEY));
        assert_eq!(
            other.value(&fx.scenario.other_store, STOCK_KEY).unwrap(),
            Scenario::RESERVED_STOCK
        );
        assert_eq!(other.value(&fx.scenario.other_store, PRICE_KEY).unwrap(), Scenario::PRICE);
        assert_eq!(fx.root().value(&fx.scenario.root_store, ORDER_KEY).unwrap(), b"placed");
        assert_eq!(executor.phase(), TxPhase::Signalled);
    }
}

#[tokio::test]
async fn scenario_b_fails_and_still_signals() {
    for kind in BOTH {
        let fx = fixture(true).await;
        let mut executor = fx.executor(kind);
        let outcome = executor.run(fx.scenario.graph.clone()).await.unwrap();

        assert!(!outcome.success, "{kind}");
        let reserve = &outcome.segments[&CallPath::new(vec![0])];
        assert!(reserve.success);
        assert!(reserve.has_locks());
        let declined = &outcome.segments[&CallPath::new(vec![1])];
        assert!(!declined.success);
        assert_eq!(declined.return_value, b"payment declined");

        assert_eq!(outcome.signalled, vec![OTHER]);
        let other = fx.other();
        assert!(!other.has_locks(&fx.scenario.other_store));
        assert_eq!(
            other.value(&fx.scenario.other_store, STOCK_KEY).unwrap(),
            Scenario::INITIAL_STOCK
        );
        assert!(fx.root().value(&fx.scenario.root_store, ORDER_KEY).is_none());
    }
}

#[tokio::test]
async fn scenario_c_root_mismatch_aborts_before_root() {
    let fx = fixture(false).await;
    fx.root().set_corrupt_receipts_root(true);
    let mut executor = fx.executor(StrategyKind::ReceiptRoot);

    let err = executor.run(fx.scenario.graph.clone()).await.unwrap_err();
    assert!(matches!(err, EngineError::ProofIntegrity { phase: Phase::Start, .. }), "{err}");
    assert!(!err.is_retryable());
    assert_eq!(fx.root().call_count("root"), 0);
    assert_eq!(fx.other().call_count("segment"), 0);
    assert!(executor.transaction().is_none());
}

#[tokio::test]
async fn mismatch_on_a_segment_ledger_aborts_at_that_segment() {
    let fx = fixture(false).await;
    fx.other().set_corrupt_receipts_root(true);
    let mut executor = fx.executor(StrategyKind::ReceiptRoot);

    let err = executor.run(fx.scenario.graph.clone()).await.unwrap_err();
    match err {
        EngineError::ProofIntegrity {
            phase: Phase::Segment,
            call_path,
            ..
        } => assert_eq!(call_path, Some(CallPath::new(vec![0]))),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.root().call_count("root"), 0);
}

#[tokio::test]
async fn signed_events_do_not_depend_on_receipts_roots() {
    let fx = fixture(false).await;
    fx.root().set_corrupt_receipts_root(true);
    fx.other().set_corrupt_receipts_root(true);
    let mut executor = fx.executor(StrategyKind::SignedEvent);
    let outcome = executor.run(fx.scenario.graph.clone()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(fx.root().call_count("addTxReceiptRoot"), 0);
}

#[tokio::test]
async fn step_by_step_walks_every_phase() {
    for kind in BOTH {
        let fx = fixture(false).await;
        let mut executor = fx.executor(kind);
        assert_eq!(executor.phase(), TxPhase::Init);

        let tx_id = TransactionId::random();
        executor.start(tx_id, 120, fx.scenario.graph.clone()).await.unwrap();
        assert_eq!(executor.phase(), TxPhase::Started);
        let tx = executor.transaction().unwrap();
        assert_eq!(tx.id, tx_id);
        assert_eq!(tx.root_ledger, ROOT);
        assert_eq!(tx.timeout, common::NOW + 120);
        assert!(executor.start_proof().is_some());

        executor.segment(&CallPath::new(vec![0])).await.unwrap();
        assert_eq!(executor.phase(), TxPhase::Segmenting);
        let reserve = executor.segment(&CallPath::new(vec![1])).await.unwrap();
        assert!(reserve.has_locks());
        assert_eq!(executor.locked_ledgers(), vec![OTHER]);
        assert!(fx.other().is_locked(&fx.scenario.other_store, STOCK_KEY));

        assert!(executor.root().await.unwrap());
        assert_eq!(executor.phase(), TxPhase::Rooted);
        assert!(fx.other().is_locked(&fx.scenario.other_store, STOCK_KEY));

        assert_eq!(executor.signalling().await.unwrap(), vec![OTHER]);
        assert_eq!(executor.phase(), TxPhase::Signalled);
        assert!(!fx.other().is_locked(&fx.scenario.other_store, STOCK_KEY));
    }
}

#[tokio::test]
async fn observer_sees_every_control_call() {
    let fx = fixture(false).await;
    let mut executor = fx.executor(StrategyKind::ReceiptRoot);
    let outcome = executor.run(fx.scenario.graph.clone()).await.unwrap();

    let summary = fx.stats.summary();
    assert_eq!(summary[&Phase::Start].calls, 1);
    assert_eq!(summary[&Phase::Segment].calls, 2);
    assert_eq!(summary[&Phase::Root].calls, 1);
    assert_eq!(summary[&Phase::Signalling].calls, 1);
    assert_eq!(outcome.phases, fx.stats.records());
    assert!(fx.stats.total_gas() > 0);

    let segment_paths: Vec<_> = outcome
        .phases
        .iter()
        .filter(|r| r.phase == Phase::Segment)
        .map(|r| r.call_path.clone())
        .collect();
    assert_eq!(
        segment_paths,
        vec![Some(CallPath::new(vec![0])), Some(CallPath::new(vec![1]))]
    );
}

#[tokio::test]
async fn receipt_roots_are_published_where_proofs_are_consumed() {
    let fx = fixture(false).await;
    let mut executor = fx.executor(StrategyKind::ReceiptRoot);
    executor.run(fx.scenario.graph.clone()).await.unwrap();

    // Start and Root go to both ledgers; both segments go to their caller
    // on the root ledger, and the locking one also to its own ledger.
    assert_eq!(fx.root().call_count("addTxReceiptRoot"), 4);
    assert_eq!(fx.other().call_count("addTxReceiptRoot"), 3);
}
