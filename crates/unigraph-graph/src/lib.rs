//! # Unigraph Graph
//!
//! The graph side of the migration: the Neo4j client and store, the node and
//! relationship materializers, the transfer orchestrator and the fixed report
//! queries.

pub mod client;
pub mod cypher;
pub mod error;
pub mod reports;
pub mod schema;
pub mod store;
pub mod transfer;

pub use client::{GraphBreakdown, GraphClient, GraphConfig, GraphCounts};
pub use error::{MaterializeError, TransferError};
pub use reports::{ReportKind, ReportParams, run_report, write_report_file, write_reports};
pub use schema::initialize_schema;
pub use store::{GraphSnapshot, GraphStore, MemoryGraph, Neo4jStore, StoreError, StoreResult};
pub use transfer::{NodePhase, Outcome, Phase, Transfer, TransferReport};
