//! Terminal output formatting.

use std::path::PathBuf;

use colored::{ColoredString, Colorize};
use unigraph_core::{EdgeDirection, TableRole};
use unigraph_graph::{Outcome, TransferReport};

/// Print the end-of-run summary of a transfer.
pub fn print_transfer_report(report: &TransferReport) {
    println!();
    println!("{} {}", "Transfer".bold(), outcome_label(report.outcome()));
    println!("{}", "─".repeat(60));

    println!(
        "{:<14} {:<14} {:>6} {:>7} {:>7} {:>8} {:>8}",
        "Table", "Phase", "Rows", "Nodes", "Rels", "Skipped", "Missing"
    );
    for t in &report.tables {
        println!(
            "{:<14} {:<14} {:>6} {:>7} {:>7} {:>8} {:>8}",
            truncate(&t.table, 14),
            t.phase.to_string(),
            t.rows_read,
            t.nodes_created,
            t.relationships_created,
            dim_zero(t.rows_skipped),
            dim_zero(t.missing_endpoints),
        );
    }
    println!("{}", "─".repeat(60));

    println!("  Constraints:         {}", report.constraints.to_string().cyan());
    println!("  Tables processed:    {}", report.tables_processed().to_string().cyan());
    println!("  Nodes created:       {}", report.nodes_created().to_string().cyan());
    println!("  Relationships:       {}", report.relationships_created().to_string().cyan());
    println!("  Rows materialized:   {}", report.rows_materialized().to_string().cyan());

    if !report.failures.is_empty() {
        println!("\n{} ({}):", "Failed tables".red().bold(), report.failures.len());
        for f in &report.failures {
            println!("  {} {} [{}] {}", "✗".red(), f.table, f.phase, f.error.dimmed());
        }
    }

    if !report.skipped_rows.is_empty() {
        println!("\n{} ({}):", "Skipped rows".yellow().bold(), report.skipped_rows.len());
        for s in &report.skipped_rows {
            println!("  {} {}#{} {}", "•".dimmed(), s.table, s.row, s.reason.dimmed());
        }
    }

    if !report.missing_endpoints.is_empty() {
        println!("\n{} ({}):", "Missing endpoints".yellow().bold(), report.missing_endpoints.len());
        for m in &report.missing_endpoints {
            println!(
                "  {} {}#{} {} {} {}",
                "•".dimmed(),
                m.table,
                m.row,
                m.from.dimmed(),
                format!("-[{}]->", m.rel_type).yellow(),
                m.to.dimmed()
            );
        }
    }
}

fn outcome_label(outcome: Outcome) -> ColoredString {
    match outcome {
        Outcome::Complete => "complete".green().bold(),
        Outcome::CompleteWithErrors => "complete with errors".yellow().bold(),
        Outcome::Cancelled => "cancelled".red().bold(),
    }
}

fn dim_zero(n: usize) -> ColoredString {
    if n == 0 { n.to_string().dimmed() } else { n.to_string().yellow() }
}

/// Print per-label and per-type counts.
pub fn print_breakdown(labels: &[(String, usize)], relationship_types: &[(String, usize)]) {
    if labels.is_empty() && relationship_types.is_empty() {
        println!("{}", "Graph is empty.".dimmed());
        return;
    }
    for (label, count) in labels {
        println!("  ({:<20}) {}", label.cyan(), count);
    }
    for (rel_type, count) in relationship_types {
        println!("  [{:<20}] {}", rel_type.yellow(), count);
    }
}

/// Print one catalog entry per line.
pub fn print_role(table: &str, role: &TableRole, declared: bool) {
    let origin = if declared { "".normal() } else { " (default)".dimmed() };
    match role {
        TableRole::Node(node) => {
            println!(
                "  {:<14} {} {}.{}{}",
                table,
                "node".green(),
                node.label.cyan(),
                node.key,
                origin
            );
            for fk in &node.foreign_keys {
                let arrow = match fk.direction {
                    EdgeDirection::Outgoing => format!("-[{}]->", fk.rel_type),
                    EdgeDirection::Incoming => format!("<-[{}]-", fk.rel_type),
                };
                println!(
                    "  {:<14}   {} {} {}.{}",
                    "",
                    fk.column.dimmed(),
                    arrow.yellow(),
                    fk.target.label.cyan(),
                    fk.target.key
                );
            }
        }
        TableRole::Relationship(rel) => {
            println!(
                "  {:<14} {} ({}.{} via {}) {} ({}.{} via {}){}",
                table,
                "rel ".magenta(),
                rel.from.endpoint.label.cyan(),
                rel.from.endpoint.key,
                rel.from.column.dimmed(),
                format!("-[{}]->", rel.rel_type).yellow(),
                rel.to.endpoint.label.cyan(),
                rel.to.endpoint.key,
                rel.to.column.dimmed(),
                origin
            );
        }
    }
}

/// List the files a report run wrote.
pub fn print_written(paths: &[PathBuf]) {
    println!("\n{} ({}):", "Reports written".green().bold(), paths.len());
    for path in paths {
        println!("  {} {}", "→".dimmed(), path.display());
    }
}

/// Truncate a string to a maximum length.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
