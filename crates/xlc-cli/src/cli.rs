use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use xlc_trust::StrategyKind;

#[derive(Parser)]
#[command(
    name = "xlc",
    about = "Cross-ledger atomic commit engine",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StrategyArg {
    ReceiptRoot,
    SignedEvent,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::ReceiptRoot => StrategyKind::ReceiptRoot,
            StrategyArg::SignedEvent => StrategyKind::SignedEvent,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the purchase scenario across two simulated ledgers
    Demo(DemoArgs),
    /// Print the receipts-trie root of hex-encoded values
    TrieRoot(TrieRootArgs),
    /// Validate a TOML or JSON call graph and print its wire encoding
    Graph(GraphArgs),
}

#[derive(Args)]
pub struct DemoArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides the strategy from the config file
    #[arg(long)]
    pub strategy: Option<StrategyArg>,
    /// Make the second leaf fail so the reservation rolls back
    #[arg(long)]
    pub fail: bool,
}

#[derive(Args)]
pub struct TrieRootArgs {
    #[arg(required = true)]
    pub values: Vec<String>,
}

#[derive(Args)]
pub struct GraphArgs {
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_demo() {
        let cli = Cli::try_parse_from(["xlc", "demo"]).unwrap();
        if let Command::Demo(args) = cli.command {
            assert!(args.config.is_none());
            assert!(args.strategy.is_none());
            assert!(!args.fail);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_demo_with_options() {
        let cli = Cli::try_parse_from([
            "xlc", "demo", "--strategy", "signed-event", "--fail", "--config", "demo.toml",
        ])
        .unwrap();
        if let Command::Demo(args) = cli.command {
            assert_eq!(args.strategy, Some(StrategyArg::SignedEvent));
            assert!(args.fail);
            assert_eq!(args.config, Some(PathBuf::from("demo.toml")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn unknown_strategy_is_refused() {
        assert!(Cli::try_parse_from(["xlc", "demo", "--strategy", "optimistic"]).is_err());
    }

    #[test]
    fn parse_trie_root() {
        let cli = Cli::try_parse_from(["xlc", "trie-root", "0x01", "ff"]).unwrap();
        if let Command::TrieRoot(args) = cli.command {
            assert_eq!(args.values, vec!["0x01", "ff"]);
        } else {
            panic!("wrong command");
        }
        assert!(Cli::try_parse_from(["xlc", "trie-root"]).is_err());
    }

    #[test]
    fn parse_graph() {
        let cli = Cli::try_parse_from(["xlc", "graph", "tx.json"]).unwrap();
        assert!(matches!(cli.command, Command::Graph(_)));
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from(["xlc", "--verbose", "--format", "json", "demo"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn strategy_arg_maps_to_kind() {
        assert_eq!(StrategyKind::from(StrategyArg::ReceiptRoot), StrategyKind::ReceiptRoot);
        assert_eq!(StrategyKind::from(StrategyArg::SignedEvent), StrategyKind::SignedEvent);
    }
}
