//! Relationship materializer.
//!
//! A join-table row becomes one relationship between the nodes its two anchor
//! columns point at; the remaining columns become relationship properties.
//! Foreign-key edges of node tables go through the same path with no
//! properties.

use tracing::{debug, info, warn};

use unigraph_core::{
    EdgeDirection, EndpointMatch, ForeignKeyEdge, NodeTable, RelationshipCreate, RelationshipTable,
    SqlValue, coerce,
};

use super::report::MissingEndpoint;
use super::{Phase, TableStats, Transfer, TransferReport, column_index, properties};
use crate::error::{MaterializeError, TransferError};

fn endpoint(
    label: &str,
    key: &str,
    columns: &[String],
    row: &[SqlValue],
    column: &str,
) -> Result<EndpointMatch, MaterializeError> {
    let index = column_index(columns, column)?;
    let value = row.get(index).ok_or(MaterializeError::Arity {
        expected: columns.len(),
        found: row.len(),
    })?;
    Ok(EndpointMatch {
        label: label.to_string(),
        key: key.to_string(),
        value: coerce(column, value)?,
    })
}

/// Build the relationship for one join-table row, directed `from` → `to`.
pub fn materialize_relationship(
    rel: &RelationshipTable,
    columns: &[String],
    row: &[SqlValue],
) -> Result<RelationshipCreate, MaterializeError> {
    let from = endpoint(&rel.from.endpoint.label, &rel.from.endpoint.key, columns, row, &rel.from.column)?;
    let to = endpoint(&rel.to.endpoint.label, &rel.to.endpoint.key, columns, row, &rel.to.column)?;
    Ok(RelationshipCreate {
        rel_type: rel.rel_type.clone(),
        from,
        to,
        properties: properties(columns, row, |c| rel.is_anchor(c))?,
    })
}

/// Build the relationship a node row's foreign-key column implies.
pub fn materialize_foreign_key(
    owner: &NodeTable,
    edge: &ForeignKeyEdge,
    columns: &[String],
    row: &[SqlValue],
) -> Result<RelationshipCreate, MaterializeError> {
    let own = endpoint(&owner.label, &owner.key, columns, row, &owner.key)?;
    let target = endpoint(&edge.target.label, &edge.target.key, columns, row, &edge.column)?;
    let (from, to) = match edge.direction {
        EdgeDirection::Outgoing => (own, target),
        EdgeDirection::Incoming => (target, own),
    };
    Ok(RelationshipCreate {
        rel_type: edge.rel_type.clone(),
        from,
        to,
        properties: Vec::new(),
    })
}

fn describe(endpoint: &EndpointMatch) -> String {
    format!("{}.{} = {}", endpoint.label, endpoint.key, endpoint.value)
}

/// How one relationship row ended up.
enum Created {
    Yes(u64),
    MissingEndpoint,
}

impl Transfer<'_> {
    /// Create one relationship per row of a join table.
    pub(super) async fn transfer_relationship_table(
        &self,
        table: &str,
        rel: &RelationshipTable,
        report: &mut TransferReport,
    ) -> Result<(), TransferError> {
        let Some((columns, rows)) = self.fetch(table, Phase::Relationships, report).await? else {
            return Ok(());
        };

        for anchor in [&rel.from, &rel.to] {
            if let Err(e) = column_index(&columns, &anchor.column) {
                warn!(table, error = %e, "Anchor column missing, table skipped");
                report.fail(table, Phase::Relationships, e.to_string());
                return Ok(());
            }
        }

        let mut stats = TableStats::new(table, Phase::Relationships, rows.len());
        for (i, row) in rows.iter().enumerate() {
            match materialize_relationship(rel, &columns, row) {
                Ok(op) => self.create(table, i, &op, &mut stats, report).await?,
                Err(e) => {
                    warn!(table, row = i, error = %e, "Row not migrated");
                    report.skip(&mut stats, i, e.to_string());
                }
            }
        }

        info!(
            table,
            rel_type = %rel.rel_type,
            relationships = stats.relationships_created,
            missing_endpoints = stats.missing_endpoints,
            skipped = stats.rows_skipped,
            "Relationships created"
        );
        report.tables.push(stats);
        Ok(())
    }

    /// Create the foreign-key relationships declared on a node table.
    ///
    /// A null foreign key means "no relationship" and is not counted.
    pub(super) async fn transfer_foreign_keys(
        &self,
        table: &str,
        owner: &NodeTable,
        report: &mut TransferReport,
    ) -> Result<(), TransferError> {
        let Some((columns, rows)) = self.fetch(table, Phase::Relationships, report).await? else {
            return Ok(());
        };

        let mut stats = TableStats::new(table, Phase::Relationships, rows.len());
        for edge in &owner.foreign_keys {
            if let Err(e) = column_index(&columns, &edge.column).and(column_index(&columns, &owner.key)) {
                warn!(table, rel_type = %edge.rel_type, error = %e, "Foreign key edge skipped");
                report.fail(table, Phase::Relationships, format!("{}: {}", edge.rel_type, e));
                continue;
            }

            for (i, row) in rows.iter().enumerate() {
                match materialize_foreign_key(owner, edge, &columns, row) {
                    Ok(op) if op.from.value.is_null() || op.to.value.is_null() => {
                        debug!(table, row = i, rel_type = %edge.rel_type, "Null foreign key, no relationship");
                    }
                    Ok(op) => self.create(table, i, &op, &mut stats, report).await?,
                    Err(e) => {
                        warn!(table, row = i, rel_type = %edge.rel_type, error = %e, "Row not migrated");
                        report.skip(&mut stats, i, e.to_string());
                    }
                }
            }
        }

        info!(
            table,
            relationships = stats.relationships_created,
            missing_endpoints = stats.missing_endpoints,
            "Foreign key relationships created"
        );
        report.tables.push(stats);
        Ok(())
    }

    async fn create(
        &self,
        table: &str,
        row: usize,
        op: &RelationshipCreate,
        stats: &mut TableStats,
        report: &mut TransferReport,
    ) -> Result<(), TransferError> {
        let outcome = if op.from.value.is_null() || op.to.value.is_null() {
            Created::MissingEndpoint
        } else {
            match self.target.create_relationship(op).await {
                Ok(0) => Created::MissingEndpoint,
                Ok(n) => Created::Yes(n),
                Err(e) if e.is_connection() => {
                    return Err(TransferError::Store {
                        phase: Phase::Relationships,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(table, row, error = %e, "Row not migrated");
                    report.skip(stats, row, e.to_string());
                    return Ok(());
                }
            }
        };

        match outcome {
            Created::Yes(n) => {
                stats.relationships_created += n as usize;
                debug!(table, row, rel_type = %op.rel_type, "Relationship created");
            }
            Created::MissingEndpoint => {
                warn!(
                    table,
                    row,
                    rel_type = %op.rel_type,
                    from = %describe(&op.from),
                    to = %describe(&op.to),
                    "Endpoint not found, relationship not created"
                );
                stats.missing_endpoints += 1;
                report.missing_endpoints.push(MissingEndpoint {
                    table: table.to_string(),
                    row,
                    rel_type: op.rel_type.clone(),
                    from: describe(&op.from),
                    to: describe(&op.to),
                });
            }
        }
        Ok(())
    }
}
