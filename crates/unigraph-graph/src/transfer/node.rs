//! Node materializer: one node-table row becomes one `CREATE` of a labeled node.

use tracing::{debug, info, warn};

use unigraph_core::{NodeCreate, NodeTable, SqlValue};

use super::{Phase, TableStats, Transfer, TransferReport, properties};
use crate::error::{MaterializeError, TransferError};

/// Build the node for one row: every column becomes a property.
pub fn materialize_node(
    node: &NodeTable,
    columns: &[String],
    row: &[SqlValue],
) -> Result<NodeCreate, MaterializeError> {
    Ok(NodeCreate {
        label: node.label.clone(),
        properties: properties(columns, row, |_| false)?,
    })
}

impl Transfer<'_> {
    /// Create one node per row of `table`.
    pub(super) async fn transfer_node_table(
        &self,
        table: &str,
        node: &NodeTable,
        report: &mut TransferReport,
    ) -> Result<(), TransferError> {
        let Some((columns, rows)) = self.fetch(table, Phase::Nodes, report).await? else {
            return Ok(());
        };

        if !columns.contains(&node.key) {
            warn!(table, key = %node.key, "Key column missing; nodes cannot be matched as endpoints");
        }

        let mut stats = TableStats::new(table, Phase::Nodes, rows.len());
        for (i, row) in rows.iter().enumerate() {
            let op = match materialize_node(node, &columns, row) {
                Ok(op) => op,
                Err(e) => {
                    warn!(table, row = i, error = %e, "Row not migrated");
                    report.skip(&mut stats, i, e.to_string());
                    continue;
                }
            };

            match self.target.create_node(&op).await {
                Ok(()) => {
                    stats.nodes_created += 1;
                    debug!(table, row = i, label = %op.label, "Node created");
                }
                Err(e) if e.is_connection() => {
                    return Err(TransferError::Store {
                        phase: Phase::Nodes,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(table, row = i, error = %e, "Row not migrated");
                    report.skip(&mut stats, i, e.to_string());
                }
            }
        }

        info!(
            table,
            label = %node.label,
            nodes = stats.nodes_created,
            skipped = stats.rows_skipped,
            "Nodes created"
        );
        report.tables.push(stats);
        Ok(())
    }
}
