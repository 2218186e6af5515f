//! Neo4j-backed graph store.

use async_trait::async_trait;
use tracing::debug;

use unigraph_core::{Endpoint, NodeCreate, RelationshipCreate};

use super::{GraphStore, StoreError, StoreResult};
use crate::GraphClient;
use crate::cypher::{self, Statement};

/// Writes transfer operations to Neo4j, one auto-commit statement each.
#[derive(Clone)]
pub struct Neo4jStore {
    client: GraphClient,
}

impl Neo4jStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn run(&self, statement: Statement) -> StoreResult<()> {
        self.client
            .inner()
            .run(statement.into_query())
            .await
            .map_err(classify)
    }
}

/// Transport and authentication failures are fatal; anything else the server
/// reports is a rejection of that one statement.
fn classify(err: neo4rs::Error) -> StoreError {
    match &err {
        neo4rs::Error::IOError { .. }
        | neo4rs::Error::ConnectionError
        | neo4rs::Error::AuthenticationError(_) => StoreError::Connection(err.to_string()),
        _ => StoreError::Rejected(err.to_string()),
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    fn kind(&self) -> &'static str {
        "neo4j"
    }

    async fn wipe(&self) -> StoreResult<()> {
        self.run(cypher::wipe()).await
    }

    async fn ensure_unique(&self, endpoint: &Endpoint) -> StoreResult<()> {
        self.run(cypher::unique_constraint(endpoint)).await
    }

    async fn create_node(&self, node: &NodeCreate) -> StoreResult<()> {
        self.run(cypher::create_node(node)).await
    }

    async fn create_relationship(&self, rel: &RelationshipCreate) -> StoreResult<u64> {
        let statement = cypher::create_relationship(rel);
        let mut stream = self
            .client
            .inner()
            .execute(statement.into_query())
            .await
            .map_err(classify)?;

        // Drain the stream so the connection goes back to the pool clean.
        let mut created: i64 = 0;
        while let Some(row) = stream.next().await.map_err(classify)? {
            created += row
                .get::<i64>("created")
                .map_err(|e| StoreError::Rejected(format!("unreadable relationship count: {:?}", e)))?;
        }
        debug!(rel_type = %rel.rel_type, created, "Relationship statement executed");
        Ok(created.max(0) as u64)
    }
}
