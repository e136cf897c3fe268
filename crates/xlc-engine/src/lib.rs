//! Cross-ledger commit engine.
//!
//! An [`Executor`] drives one cross-ledger transaction through its phases:
//!
//! 1. **Start** on the root ledger, which records the call graph and the
//!    absolute timeout.
//! 2. **Segment** for every non-root node, children before parents. Each
//!    call carries the Start proof and the proofs of the node's children.
//! 3. **Root** on the root ledger, which decides the outcome.
//! 4. **Signalling** to every ledger holding locked contracts, carrying the
//!    Root proof so the locks can be committed or rolled back.
//!
//! Every phase produces a proof through the configured
//! [`TrustStrategy`](xlc_trust::TrustStrategy) that the next phase consumes.

pub mod config;
pub mod error;
pub mod executor;
pub mod observer;
pub mod transaction;

pub use config::{strategy_for, ExecutorConfig};
pub use error::{EngineError, EngineResult, Phase};
pub use executor::{ExecutionOutcome, Executor};
pub use observer::{NoopObserver, PhaseObserver, PhaseRecord, PhaseSummary, StatsCollector};
pub use transaction::{CrossLedgerTransaction, SegmentResult, TxPhase};
