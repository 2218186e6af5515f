//! The graph side of a transfer.
//!
//! [`GraphStore`] is the narrow write interface the orchestrator needs. The
//! Neo4j implementation renders Cypher; [`MemoryGraph`] applies the same
//! operations to an in-process graph.

pub mod memory;
pub mod neo4j;

use async_trait::async_trait;
use thiserror::Error;

use unigraph_core::{Endpoint, NodeCreate, RelationshipCreate};

pub use memory::{GraphSnapshot, MemoryGraph, MemoryNode, MemoryRelationship};
pub use neo4j::Neo4jStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store cannot be reached. Fatal for the whole run.
    #[error("Graph store connection failed: {0}")]
    Connection(String),

    /// The store refused one statement (constraint violation, bad value, ...).
    #[error("Graph store rejected the statement: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Result type for graph store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Short store name for log lines.
    fn kind(&self) -> &'static str;

    /// Delete every node together with its relationships.
    async fn wipe(&self) -> StoreResult<()>;

    /// Declare `endpoint.key` unique among nodes labeled `endpoint.label`.
    async fn ensure_unique(&self, endpoint: &Endpoint) -> StoreResult<()>;

    async fn create_node(&self, node: &NodeCreate) -> StoreResult<()>;

    /// Create the relationship between every matching endpoint pair.
    ///
    /// Returns how many relationships were created; zero means an endpoint
    /// did not match any node.
    async fn create_relationship(&self, rel: &RelationshipCreate) -> StoreResult<u64>;
}
