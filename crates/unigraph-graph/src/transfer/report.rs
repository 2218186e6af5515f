//! What a transfer run did, table by table.

use serde::Serialize;

use super::Phase;

/// Counters for one table in one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableStats {
    pub table: String,
    pub phase: Phase,
    pub rows_read: usize,
    pub nodes_created: usize,
    pub relationships_created: usize,
    pub rows_skipped: usize,
    pub missing_endpoints: usize,
}

impl TableStats {
    pub fn new(table: &str, phase: Phase, rows_read: usize) -> Self {
        Self {
            table: table.to_string(),
            phase,
            rows_read,
            ..Default::default()
        }
    }
}

/// A row that was not migrated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub table: String,
    /// Zero-based position in fetch order.
    pub row: usize,
    pub reason: String,
}

/// A relationship row whose endpoints did not both resolve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingEndpoint {
    pub table: String,
    pub row: usize,
    pub rel_type: String,
    pub from: String,
    pub to: String,
}

/// A table that could not be processed at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub phase: Phase,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Complete,
    CompleteWithErrors,
    Cancelled,
}

/// Completion signal of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferReport {
    pub constraints: usize,
    pub tables: Vec<TableStats>,
    pub skipped_rows: Vec<SkippedRow>,
    pub missing_endpoints: Vec<MissingEndpoint>,
    pub failures: Vec<TableFailure>,
    pub cancelled: bool,
}

impl TransferReport {
    /// Distinct tables that were fetched and materialized in any phase.
    pub fn tables_processed(&self) -> usize {
        let mut names: Vec<&str> = self.tables.iter().map(|t| t.table.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    pub fn nodes_created(&self) -> usize {
        self.tables.iter().map(|t| t.nodes_created).sum()
    }

    pub fn relationships_created(&self) -> usize {
        self.tables.iter().map(|t| t.relationships_created).sum()
    }

    /// Rows that became a node or at least one relationship.
    pub fn rows_materialized(&self) -> usize {
        self.nodes_created() + self.relationships_created()
    }

    pub fn outcome(&self) -> Outcome {
        if self.cancelled {
            Outcome::Cancelled
        } else if self.skipped_rows.is_empty() && self.missing_endpoints.is_empty() && self.failures.is_empty() {
            Outcome::Complete
        } else {
            Outcome::CompleteWithErrors
        }
    }

    pub(crate) fn skip(&mut self, stats: &mut TableStats, row: usize, reason: String) {
        stats.rows_skipped += 1;
        self.skipped_rows.push(SkippedRow {
            table: stats.table.clone(),
            row,
            reason,
        });
    }

    pub(crate) fn fail(&mut self, table: &str, phase: Phase, error: String) {
        self.failures.push(TableFailure {
            table: table.to_string(),
            phase,
            error,
        });
    }
}
