//! `unigraph report`: run the fixed queries and write their JSON files.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use unigraph_graph::GraphClient;

use super::{GraphArgs, ReportOptions};
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    #[command(flatten)]
    pub report: ReportOptions,
}

pub async fn execute(args: ReportArgs) -> Result<()> {
    let client = GraphClient::connect(&args.graph.config()).await?;
    write_reports(&client, &args.report).await
}

pub async fn write_reports(client: &GraphClient, options: &ReportOptions) -> Result<()> {
    let kinds = options.kinds();
    println!(
        "{} {} report(s) into {}",
        "Writing".bold(),
        kinds.len(),
        options.output.display().to_string().cyan()
    );

    let written = unigraph_graph::write_reports(client, &kinds, &options.params(), &options.output).await?;
    output::print_written(&written);
    Ok(())
}
