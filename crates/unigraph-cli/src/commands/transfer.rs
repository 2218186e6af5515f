//! `unigraph transfer`: wipe the graph and migrate the source into it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use unigraph_core::{Catalog, DefaultPolicy};
use unigraph_graph::{GraphClient, GraphStore, MemoryGraph, Neo4jStore, Outcome, Transfer, TransferReport};

use super::{GraphArgs, SourceArgs};
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub graph: GraphArgs,

    /// Fail on source tables without a catalog entry instead of treating them as node tables
    #[arg(long)]
    pub strict: bool,

    /// Transfer into an in-memory graph and print what would be created
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: TransferArgs) -> Result<()> {
    let report = run_transfer(&args.source, &args.graph, args.strict, args.dry_run).await?;
    output::print_transfer_report(&report);
    Ok(())
}

/// Connect to both stores and run one transfer. Ctrl-C stops it at the next table.
pub async fn run_transfer(
    source_args: &SourceArgs,
    graph_args: &GraphArgs,
    strict: bool,
    dry_run: bool,
) -> Result<TransferReport> {
    let policy = if strict { DefaultPolicy::Reject } else { DefaultPolicy::TreatAsNode };
    let catalog = Catalog::university().with_policy(policy);

    let source = unigraph_db::connect(&source_args.config()?)
        .await
        .context("Failed to open relational source")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current table");
            on_interrupt.cancel();
        }
    });

    println!(
        "{} {} {} {}",
        "Transferring".bold(),
        source.kind().cyan(),
        "→".dimmed(),
        if dry_run { "memory (dry run)".yellow() } else { graph_args.neo4j_url.cyan() }
    );

    let result = if dry_run {
        let graph = MemoryGraph::new();
        let result = transfer(&catalog, source.as_ref(), &graph, cancel).await;
        let (labels, types) = graph.breakdown();
        println!("\n{}", "Graph contents".bold());
        output::print_breakdown(&labels, &types);
        result
    } else {
        let client = GraphClient::connect(&graph_args.config()).await?;
        transfer(&catalog, source.as_ref(), &Neo4jStore::new(client), cancel).await
    };

    source.close().await;
    result
}

async fn transfer(
    catalog: &Catalog,
    source: &dyn unigraph_db::SourceStore,
    target: &dyn GraphStore,
    cancel: CancellationToken,
) -> Result<TransferReport> {
    let report = Transfer::new(catalog, source, target)
        .with_cancellation(cancel)
        .run()
        .await
        .context("Transfer aborted")?;

    if report.outcome() == Outcome::Cancelled {
        warn!(tables = report.tables_processed(), "Transfer was cancelled; the graph is incomplete");
    }
    Ok(report)
}
