use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};
use xlc_crypto::{SigningIdentity, SigningKey};
use xlc_engine::{strategy_for, Executor, PhaseObserver, StatsCollector};
use xlc_graph::CallGraphNode;
use xlc_sim::scenario::{Scenario, ORDER_KEY, STOCK_KEY};
use xlc_sim::SimNetwork;
use xlc_trie::ordered_root;
use xlc_trust::StrategyKind;
use xlc_types::{Address, Clock, LedgerId, SystemClock, H256};

use crate::cli::*;
use crate::config::DemoConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Demo(args) => cmd_demo(args, cli.format).await,
        Command::TrieRoot(args) => cmd_trie_root(args, cli.format),
        Command::Graph(args) => cmd_graph(args, cli.format),
    }
}

#[derive(Debug, Serialize)]
struct SegmentLine {
    call_path: String,
    ledger: String,
    success: bool,
    return_value: String,
    locked: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PhaseLine {
    phase: String,
    calls: usize,
    gas_used: u64,
    elapsed_us: u64,
}

#[derive(Debug, Serialize)]
struct DemoReport {
    strategy: StrategyKind,
    tx_id: String,
    success: bool,
    timed_out: bool,
    segments: Vec<SegmentLine>,
    signalled: Vec<String>,
    phases: Vec<PhaseLine>,
    total_gas: u64,
    stock: Option<String>,
    order: Option<String>,
}

async fn run_demo(config: &DemoConfig, fail: bool) -> anyhow::Result<DemoReport> {
    config.validate()?;
    debug!(?config, fail, "demo configuration");
    let root = config.root().id;
    let other = config.other().id;

    let network = SimNetwork::new(&[root, other], Arc::new(SystemClock) as Arc<dyn Clock>);
    let scenario = Scenario::purchase(root, other, fail);
    scenario.deploy(&network);

    let signers: Vec<Arc<dyn SigningIdentity>> = (0..config.signers)
        .map(|_| Arc::new(SigningKey::generate()) as Arc<dyn SigningIdentity>)
        .collect();
    let addresses: Vec<Address> = signers.iter().map(|s| s.address()).collect();
    network
        .register_signers(&addresses)
        .await
        .context("registering signers")?;

    let kind = config.executor.strategy;
    let stats = Arc::new(StatsCollector::new());
    let mut executor = Executor::new(
        network.registry(),
        strategy_for(kind, signers),
        config.executor.clone(),
    )
    .with_observer(Arc::clone(&stats) as Arc<dyn PhaseObserver>);
    let mut outcome = executor.run(scenario.graph.clone()).await?;
    if !config.executor.auto_signal {
        outcome.signalled = executor.signalling().await?;
    }
    info!(tx = %outcome.tx_id, success = outcome.success, "demo transaction finished");

    let label = |id: LedgerId| format!("{} ({id})", config.label(id));
    let segments = outcome
        .segments
        .values()
        .map(|s| SegmentLine {
            call_path: s.call_path.to_string(),
            ledger: label(s.ledger_id),
            success: s.success,
            return_value: String::from_utf8_lossy(&s.return_value).into_owned(),
            locked: s.locked.iter().map(ToString::to_string).collect(),
        })
        .collect();
    let phases = stats
        .summary()
        .into_iter()
        .map(|(phase, summary)| PhaseLine {
            phase: phase.to_string(),
            calls: summary.calls,
            gas_used: summary.gas_used,
            elapsed_us: u64::try_from(summary.elapsed.as_micros()).unwrap_or(u64::MAX),
        })
        .collect();
    let text = |v: Option<Vec<u8>>| v.map(|v| String::from_utf8_lossy(&v).into_owned());
    let stock = network
        .ledger(other)
        .and_then(|l| l.value(&scenario.other_store, STOCK_KEY));
    let order = network
        .ledger(root)
        .and_then(|l| l.value(&scenario.root_store, ORDER_KEY));

    Ok(DemoReport {
        strategy: kind,
        tx_id: outcome.tx_id.to_string(),
        success: outcome.success,
        timed_out: outcome.timed_out,
        segments,
        signalled: outcome.signalled.iter().map(|id| label(*id)).collect(),
        phases,
        total_gas: stats.total_gas(),
        stock: text(stock),
        order: text(order),
    })
}

async fn cmd_demo(args: DemoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut config = DemoConfig::load_or_default(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        config.executor.strategy = strategy.into();
    }
    let report = run_demo(&config, args.fail).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Strategy: {}", report.strategy.to_string().cyan());
    println!("Transaction: {}", report.tx_id.dimmed());
    for segment in &report.segments {
        let mark = if segment.success { "✓".green() } else { "✗".red() };
        print!("  {} segment {} on {}", mark, segment.call_path.yellow(), segment.ledger);
        if !segment.return_value.is_empty() {
            print!(" → {}", segment.return_value);
        }
        if !segment.locked.is_empty() {
            print!(" (locked {})", segment.locked.join(", ").blue());
        }
        println!();
    }
    if report.success {
        println!("{} Root committed", "✓".green().bold());
    } else if report.timed_out {
        println!("{} Root failed: transaction timed out", "✗".red().bold());
    } else {
        println!("{} Root failed: transaction rolled back", "✗".red().bold());
    }
    if !report.signalled.is_empty() {
        println!("  Signalled: {}", report.signalled.join(", "));
    }
    println!(
        "  Stock: {}  Order: {}",
        report.stock.as_deref().unwrap_or("-").bold(),
        report.order.as_deref().unwrap_or("-").bold()
    );
    for phase in &report.phases {
        println!(
            "  {:<10} {} call(s), {} gas, {}µs",
            phase.phase, phase.calls, phase.gas_used, phase.elapsed_us
        );
    }
    println!("  Total gas: {}", report.total_gas);
    Ok(())
}

fn trie_root(values: &[String]) -> anyhow::Result<H256> {
    let decoded = values
        .iter()
        .map(|v| {
            let digits = v.strip_prefix("0x").unwrap_or(v);
            hex::decode(digits).with_context(|| format!("'{v}' is not hex"))
        })
        .collect::<anyhow::Result<Vec<Vec<u8>>>>()?;
    Ok(ordered_root(&decoded))
}

fn cmd_trie_root(args: TrieRootArgs, format: OutputFormat) -> anyhow::Result<()> {
    let root = trie_root(&args.values)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "values": args.values.len(), "root": root })
        ),
        OutputFormat::Text => println!("{}", root.to_string().yellow()),
    }
    Ok(())
}

/// Read a call graph, as JSON when the extension says so and TOML otherwise.
fn load_graph(path: &Path) -> anyhow::Result<CallGraphNode> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let graph: CallGraphNode = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    };
    graph.validate()?;
    debug!(path = %path.display(), nodes = graph.node_count(), "call graph loaded");
    Ok(graph)
}

fn cmd_graph(args: GraphArgs, format: OutputFormat) -> anyhow::Result<()> {
    let graph = load_graph(&args.file)?;
    let encoded = hex::encode(graph.encode());
    let ledgers: Vec<String> = graph.ledgers().iter().map(ToString::to_string).collect();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "nodes": graph.node_count(),
                "ledgers": ledgers,
                "hash": graph.hash(),
                "segment_order": graph.segment_order(),
                "encoding": encoded,
            }))?
        ),
        OutputFormat::Text => {
            println!("{} {} call(s) on {}", "✓".green().bold(), graph.node_count(), ledgers.join(", "));
            println!("  Hash: {}", graph.hash().to_string().yellow());
            let order: Vec<String> = graph.segment_order().iter().map(ToString::to_string).collect();
            println!("  Segment order: {}", order.join(" "));
            println!("  Encoding: 0x{encoded}");
        }
    }
    Ok(())
}
