//! Transfer orchestration.
//!
//! A run moves through [`Phase`]s in a fixed order: the catalog is validated,
//! the target is wiped, source tables are discovered, uniqueness constraints
//! are declared, every node table is materialized and only then every
//! relationship table. Row and table failures are collected in the
//! [`TransferReport`]; source and store connection failures end the run.

pub mod node;
pub mod relationship;
pub mod report;

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use unigraph_core::{Catalog, DefaultPolicy, Endpoint, Properties, SqlValue, TableRole, coerce};
use unigraph_db::{Row, SourceError, SourceStore};

use crate::error::{MaterializeError, TransferError};
use crate::schema;
use crate::store::GraphStore;

pub use node::materialize_node;
pub use relationship::{materialize_foreign_key, materialize_relationship};
pub use report::{MissingEndpoint, Outcome, SkippedRow, TableFailure, TableStats, TransferReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Validate,
    Wipe,
    Discover,
    Constraints,
    Nodes,
    Relationships,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validate => "validate",
            Phase::Wipe => "wipe",
            Phase::Discover => "discover",
            Phase::Constraints => "constraints",
            Phase::Nodes => "nodes",
            Phase::Relationships => "relationships",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Proof that the node phase ran to completion.
///
/// Only [`Transfer::node_phase`] can build one, and the relationship phase
/// requires it.
#[derive(Debug)]
pub struct NodePhase {
    nodes_created: usize,
}

/// Position of `column` in the column list.
pub(crate) fn column_index(columns: &[String], column: &str) -> Result<usize, MaterializeError> {
    columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| MaterializeError::MissingColumn(column.to_string()))
}

/// Coerce a row into a property list, leaving out nulls and `exclude`d columns.
pub(crate) fn properties(
    columns: &[String],
    row: &[SqlValue],
    exclude: impl Fn(&str) -> bool,
) -> Result<Properties, MaterializeError> {
    if columns.len() != row.len() {
        return Err(MaterializeError::Arity {
            expected: columns.len(),
            found: row.len(),
        });
    }

    let mut props = Vec::with_capacity(columns.len());
    for (column, value) in columns.iter().zip(row) {
        if value.is_null() || exclude(column) {
            continue;
        }
        props.push((column.clone(), coerce(column, value)?));
    }
    Ok(props)
}

/// Discovered tables with their resolved roles, in table-name order.
type Plan<'c> = Vec<(String, Cow<'c, TableRole>)>;

/// One transfer run from a relational source into a graph store.
pub struct Transfer<'a> {
    catalog: &'a Catalog,
    source: &'a dyn SourceStore,
    target: &'a dyn GraphStore,
    cancel: CancellationToken,
}

impl<'a> Transfer<'a> {
    pub fn new(catalog: &'a Catalog, source: &'a dyn SourceStore, target: &'a dyn GraphStore) -> Self {
        Self {
            catalog,
            source,
            target,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run at the next table boundary once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every phase and return what happened.
    ///
    /// `Err` means the run was aborted: catalog problems (before anything is
    /// wiped), a failed table listing, or a lost source or graph store
    /// connection.
    pub async fn run(&self) -> Result<TransferReport, TransferError> {
        let mut report = TransferReport::default();

        self.validate().await?;
        if self.cancelled(&mut report) {
            return Ok(report);
        }

        info!(phase = %Phase::Wipe, store = self.target.kind(), "Wiping target graph");
        self.target
            .wipe()
            .await
            .map_err(|source| TransferError::Store { phase: Phase::Wipe, source })?;

        let plan = self.discover().await?;

        report.constraints = self.declare_constraints(&plan).await?;

        let Some(nodes) = self.node_phase(&plan, &mut report).await? else {
            return Ok(report);
        };
        self.relationship_phase(nodes, &plan, &mut report).await?;
        if report.cancelled {
            return Ok(report);
        }

        info!(
            phase = %Phase::Done,
            tables = report.tables_processed(),
            nodes = report.nodes_created(),
            relationships = report.relationships_created(),
            skipped = report.skipped_rows.len(),
            missing_endpoints = report.missing_endpoints.len(),
            failures = report.failures.len(),
            "Transfer finished"
        );
        Ok(report)
    }

    async fn validate(&self) -> Result<(), TransferError> {
        self.catalog.validate()?;
        if self.catalog.policy() == DefaultPolicy::Reject {
            let tables = self.list_tables(Phase::Validate).await?;
            self.catalog.check_tables(&tables)?;
        }
        info!(phase = %Phase::Validate, source = self.source.kind(), "Catalog validated");
        Ok(())
    }

    async fn list_tables(&self, phase: Phase) -> Result<Vec<String>, TransferError> {
        let mut tables = self
            .source
            .list_tables()
            .await
            .map_err(|source| TransferError::Source { phase, source })?;
        tables.sort();
        Ok(tables)
    }

    async fn discover(&self) -> Result<Plan<'a>, TransferError> {
        let tables = self.list_tables(Phase::Discover).await?;

        let mut plan = Vec::with_capacity(tables.len());
        for table in tables {
            let role = self.catalog.resolve(&table)?;
            plan.push((table, role));
        }

        let absent: Vec<&str> = self
            .catalog
            .entries()
            .map(|(name, _)| name)
            .filter(|name| !plan.iter().any(|(table, _)| table == name))
            .collect();
        if !absent.is_empty() {
            info!(tables = ?absent, "Catalog tables absent from source, skipped");
        }

        info!(
            phase = %Phase::Discover,
            tables = plan.len(),
            node_tables = plan.iter().filter(|(_, role)| role.is_node()).count(),
            "Source tables discovered"
        );
        Ok(plan)
    }

    async fn declare_constraints(&self, plan: &Plan<'a>) -> Result<usize, TransferError> {
        let mut keys: BTreeSet<Endpoint> = self.catalog.unique_keys().into_iter().collect();
        for (_, role) in plan {
            if let TableRole::Node(node) = role.as_ref() {
                keys.insert(node.endpoint());
            }
        }
        let keys: Vec<Endpoint> = keys.into_iter().collect();

        schema::initialize_schema(self.target, &keys)
            .await
            .map_err(|source| TransferError::Store {
                phase: Phase::Constraints,
                source,
            })?;
        Ok(keys.len())
    }

    /// Materialize every node table. `None` when the run was cancelled.
    async fn node_phase(
        &self,
        plan: &Plan<'a>,
        report: &mut TransferReport,
    ) -> Result<Option<NodePhase>, TransferError> {
        info!(phase = %Phase::Nodes, "Creating nodes");
        for (table, role) in plan {
            let TableRole::Node(node) = role.as_ref() else {
                continue;
            };
            if self.cancelled(report) {
                return Ok(None);
            }
            self.transfer_node_table(table, node, report).await?;
        }
        Ok(Some(NodePhase {
            nodes_created: report.nodes_created(),
        }))
    }

    async fn relationship_phase(
        &self,
        nodes: NodePhase,
        plan: &Plan<'a>,
        report: &mut TransferReport,
    ) -> Result<(), TransferError> {
        info!(phase = %Phase::Relationships, nodes = nodes.nodes_created, "Creating relationships");
        for (table, role) in plan {
            match role.as_ref() {
                TableRole::Node(node) if node.foreign_keys.is_empty() => continue,
                TableRole::Node(node) => {
                    if self.cancelled(report) {
                        return Ok(());
                    }
                    self.transfer_foreign_keys(table, node, report).await?;
                }
                TableRole::Relationship(rel) => {
                    if self.cancelled(report) {
                        return Ok(());
                    }
                    self.transfer_relationship_table(table, rel, report).await?;
                }
            }
        }
        Ok(())
    }

    fn cancelled(&self, report: &mut TransferReport) -> bool {
        if self.cancel.is_cancelled() {
            info!(tables = report.tables_processed(), "Transfer cancelled");
            report.cancelled = true;
        }
        report.cancelled
    }

    /// Columns and rows of `table`.
    ///
    /// A table that cannot be read is recorded and yields `None`; a lost
    /// source connection ends the run.
    async fn fetch(
        &self,
        table: &str,
        phase: Phase,
        report: &mut TransferReport,
    ) -> Result<Option<(Vec<String>, Vec<Row>)>, TransferError> {
        let fetched = async {
            let columns = self.source.columns(table).await?;
            let rows = self.source.fetch_rows(table).await?;
            Ok::<_, SourceError>((columns, rows))
        }
        .await;

        match fetched {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_connection() => {
                error!(table, %phase, error = %e, "Source connection lost");
                Err(TransferError::Source { phase, source: e })
            }
            Err(e) => {
                error!(table, %phase, error = %e, "Table could not be read");
                report.fail(table, phase, e.to_string());
                Ok(None)
            }
        }
    }
}
