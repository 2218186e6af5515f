//! `unigraph catalog`: show the schema catalog.
//!
//! With a source configured, every discovered table is resolved the way a
//! transfer would resolve it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use unigraph_core::{Catalog, DefaultPolicy};

use super::SourceArgs;
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Resolve with the strict policy
    #[arg(long)]
    pub strict: bool,
}

pub async fn execute(args: CatalogArgs) -> Result<()> {
    let policy = if args.strict { DefaultPolicy::Reject } else { DefaultPolicy::TreatAsNode };
    let catalog = Catalog::university().with_policy(policy);

    match catalog.validate() {
        Ok(()) => println!("{} {}", "Catalog".bold(), "valid".green()),
        Err(e) => println!("{} {}", "Catalog".bold(), e.to_string().red()),
    }

    if !args.source.is_set() {
        println!();
        for (table, role) in catalog.entries() {
            output::print_role(table, role, true);
        }
        return Ok(());
    }

    let source = unigraph_db::connect(&args.source.config()?)
        .await
        .context("Failed to open relational source")?;
    let tables = source.list_tables().await.context("Failed to list source tables")?;
    source.close().await;

    println!("\n{} ({} tables in {})", "Source tables".bold(), tables.len(), source.kind());
    for table in &tables {
        match catalog.resolve(table) {
            Ok(role) => output::print_role(table, &role, catalog.get(table).is_some()),
            Err(e) => println!("  {:<14} {}", table, e.to_string().red()),
        }
    }

    let absent: Vec<&str> = catalog
        .entries()
        .map(|(name, _)| name)
        .filter(|name| !tables.iter().any(|t| t == name))
        .collect();
    if !absent.is_empty() {
        println!("\n{} {}", "Not in source (skipped):".dimmed(), absent.join(", "));
    }
    Ok(())
}
