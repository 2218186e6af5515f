//! `unigraph run`: transfer, then write every report.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use unigraph_graph::{GraphClient, Outcome};

use super::{GraphArgs, ReportOptions, SourceArgs, report, transfer};
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub graph: GraphArgs,

    /// Fail on source tables without a catalog entry
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub report: ReportOptions,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let summary = transfer::run_transfer(&args.source, &args.graph, args.strict, false).await?;
    output::print_transfer_report(&summary);

    if summary.outcome() == Outcome::Cancelled {
        bail!("Transfer was cancelled; reports were not written");
    }
    if summary.outcome() == Outcome::CompleteWithErrors {
        println!("\n{}", "Reports reflect a partially migrated graph.".yellow());
    }

    println!();
    let client = GraphClient::connect(&args.graph.config()).await?;
    report::write_reports(&client, &args.report).await
}
