use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use xlc_engine::ExecutorConfig;
use xlc_types::LedgerId;

/// A simulated ledger taking part in the demo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSpec {
    pub id: LedgerId,
    pub label: String,
}

/// Settings for `xlc demo`.
///
/// The first ledger hosts the root call, the second the leaves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub ledgers: Vec<LedgerSpec>,
    /// Identities generated and registered on every ledger.
    pub signers: usize,
    pub executor: ExecutorConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            ledgers: vec![
                LedgerSpec {
                    id: LedgerId::new(31),
                    label: "shop".into(),
                },
                LedgerSpec {
                    id: LedgerId::new(32),
                    label: "warehouse".into(),
                },
            ],
            signers: 3,
            executor: ExecutorConfig::default(),
        }
    }
}

impl DemoConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ledgers.len() != 2 {
            bail!("the demo needs exactly two ledgers, {} configured", self.ledgers.len());
        }
        let ids: BTreeSet<LedgerId> = self.ledgers.iter().map(|l| l.id).collect();
        if ids.len() != self.ledgers.len() {
            bail!("ledger ids must be distinct");
        }
        if let Some(zero) = self.ledgers.iter().find(|l| l.id.is_zero()) {
            bail!("ledger '{}' has the reserved id 0", zero.label);
        }
        if self.signers == 0 {
            bail!("at least one signer is required");
        }
        Ok(())
    }

    pub fn root(&self) -> &LedgerSpec {
        &self.ledgers[0]
    }

    pub fn other(&self) -> &LedgerSpec {
        &self.ledgers[1]
    }

    pub fn label(&self, id: LedgerId) -> &str {
        self.ledgers
            .iter()
            .find(|l| l.id == id)
            .map_or("?", |l| l.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use xlc_trust::StrategyKind;

    #[test]
    fn default_is_valid() {
        let config = DemoConfig::default();
        config.validate().unwrap();
        assert_eq!(config.root().label, "shop");
        assert_eq!(config.label(LedgerId::new(32)), "warehouse");
        assert_eq!(config.label(LedgerId::new(7)), "?");
    }

    #[test]
    fn load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
signers = 5

[executor]
strategy = "signed-event"
timeout_secs = 60

[[ledgers]]
id = 1
label = "a"

[[ledgers]]
id = 2
label = "b"
"#
        )
        .unwrap();

        let config = DemoConfig::load(file.path()).unwrap();
        assert_eq!(config.signers, 5);
        assert_eq!(config.executor.strategy, StrategyKind::SignedEvent);
        assert_eq!(config.executor.timeout_secs, 60);
        assert_eq!(config.executor.warning_window_secs, 10);
        assert_eq!(config.other().id, LedgerId::new(2));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "signers = 1").unwrap();
        let config = DemoConfig::load(file.path()).unwrap();
        assert_eq!(config.signers, 1);
        assert_eq!(config.ledgers, DemoConfig::default().ledgers);
    }

    #[test]
    fn invalid_configs_are_refused() {
        let mut config = DemoConfig::default();
        config.ledgers[1].id = config.ledgers[0].id;
        assert!(config.validate().is_err());

        let mut config = DemoConfig::default();
        config.ledgers.pop();
        assert!(config.validate().is_err());

        let mut config = DemoConfig::default();
        config.ledgers[0].id = LedgerId::new(0);
        assert!(config.validate().is_err());

        let config = DemoConfig {
            signers: 0,
            ..DemoConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DemoConfig::load(&dir.path().join("absent.toml")).is_err());
        assert_eq!(DemoConfig::load_or_default(None).unwrap(), DemoConfig::default());
    }
}
