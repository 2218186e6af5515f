//! `unigraph status`: what the graph currently holds.

use anyhow::Result;
use colored::Colorize;

use unigraph_graph::GraphClient;

use super::GraphArgs;
use crate::output;

pub async fn execute(args: GraphArgs) -> Result<()> {
    let client = GraphClient::connect(&args.config()).await?;

    println!("{}", "Graph Status".bold());
    println!("{}", "─".repeat(40));

    let counts = client.get_counts().await?;
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());

    let breakdown = client.get_breakdown().await?;
    println!();
    output::print_breakdown(&breakdown.labels, &breakdown.relationship_types);

    println!("{}", "─".repeat(40));
    Ok(())
}
