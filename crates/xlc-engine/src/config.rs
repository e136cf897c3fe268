use std::sync::Arc;

use serde::{Deserialize, Serialize};
use xlc_crypto::SigningIdentity;
use xlc_trust::{ReceiptRootTransfer, SignedEventStrategy, StrategyKind, TrustStrategy};

/// Configuration for an [`Executor`](crate::Executor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Trust strategy for every transaction driven with this configuration.
    pub strategy: StrategyKind,
    /// Relative timeout passed to Start; the root ledger turns it into an
    /// absolute deadline.
    pub timeout_secs: u64,
    /// Warn when fewer than this many seconds remain at a phase boundary.
    pub warning_window_secs: u64,
    /// Whether `run` finishes with Signalling. When `false` the caller must
    /// call `signalling` itself or locked contracts stay locked.
    pub auto_signal: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::ReceiptRoot,
            timeout_secs: 300,
            warning_window_secs: 10,
            auto_signal: true,
        }
    }
}

impl ExecutorConfig {
    pub fn with_strategy(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }
}

/// Build the strategy for `kind`, signing with `signers`.
pub fn strategy_for(
    kind: StrategyKind,
    signers: Vec<Arc<dyn SigningIdentity>>,
) -> Arc<dyn TrustStrategy> {
    match kind {
        StrategyKind::ReceiptRoot => Arc::new(ReceiptRootTransfer::new(signers)),
        StrategyKind::SignedEvent => Arc::new(SignedEventStrategy::new(signers)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlc_crypto::SigningKey;

    #[test]
    fn defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.strategy, StrategyKind::ReceiptRoot);
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.warning_window_secs, 10);
        assert!(config.auto_signal);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: ExecutorConfig = toml::from_str(
            r#"
            strategy = "signed-event"
            timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.strategy, StrategyKind::SignedEvent);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.auto_signal);
    }

    #[test]
    fn json_roundtrip() {
        let config = ExecutorConfig {
            auto_signal: false,
            ..ExecutorConfig::with_strategy(StrategyKind::SignedEvent)
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"signed-event\""));
        assert_eq!(serde_json::from_str::<ExecutorConfig>(&json).unwrap(), config);
    }

    #[test]
    fn factory_matches_kind() {
        let key = Arc::new(SigningKey::generate()) as Arc<dyn SigningIdentity>;
        for kind in [StrategyKind::ReceiptRoot, StrategyKind::SignedEvent] {
            let strategy = strategy_for(kind, vec![Arc::clone(&key)]);
            assert_eq!(strategy.kind(), kind);
            assert_eq!(strategy.signer_addresses(), vec![key.address()]);
        }
    }
}
