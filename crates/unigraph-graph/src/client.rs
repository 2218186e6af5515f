//! Neo4j connection client.

use anyhow::{Context, Result};
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
        }
    }
}

/// Client for the target Neo4j database.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create a new GraphClient from config.
    ///
    /// `Graph::connect` only builds a lazy pool, so a `RETURN 1` ping forces the
    /// bolt handshake here. An unreachable server fails the connect call instead
    /// of the first transfer statement.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(2) // single writer
            .fetch_size(200)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .with_context(|| format!("Neo4j at {} is not responding to queries", config.uri))?;

        Ok(Self { graph })
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(query).await.context("Neo4j query failed")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.context("Failed to read Neo4j result row")? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a Cypher query and return a single scalar value.
    pub async fn query_scalar<T: DeserializeOwned>(&self, query: Query, field: &str) -> Result<Option<T>> {
        let rows = self.query(query).await?;
        if let Some(row) = rows.into_iter().next() {
            let val: T = row
                .get(field)
                .map_err(|e| anyhow::anyhow!("Failed to get field '{}': {:?}", field, e))?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    /// Get node and relationship counts for status display.
    pub async fn get_counts(&self) -> Result<GraphCounts> {
        let node_query = Query::new("MATCH (n) RETURN count(n) as count".to_string());
        let rel_query = Query::new("MATCH ()-[r]->() RETURN count(r) as count".to_string());

        let node_count: i64 = self.query_scalar(node_query, "count").await?.unwrap_or(0);
        let rel_count: i64 = self.query_scalar(rel_query, "count").await?.unwrap_or(0);

        Ok(GraphCounts {
            nodes: node_count as usize,
            relationships: rel_count as usize,
        })
    }

    /// Node count per label and relationship count per type.
    pub async fn get_breakdown(&self) -> Result<GraphBreakdown> {
        let labels = self
            .counted(
                "MATCH (n) UNWIND labels(n) AS name
                 RETURN name, count(*) AS count ORDER BY name",
            )
            .await?;
        let relationship_types = self
            .counted(
                "MATCH ()-[r]->() WITH type(r) AS name
                 RETURN name, count(*) AS count ORDER BY name",
            )
            .await?;

        Ok(GraphBreakdown {
            labels,
            relationship_types,
        })
    }

    async fn counted(&self, cypher: &str) -> Result<Vec<(String, usize)>> {
        let rows = self.query(Query::new(cypher.to_string())).await?;
        rows.into_iter()
            .map(|row| {
                let name: String = row
                    .get("name")
                    .map_err(|e| anyhow::anyhow!("Failed to get field 'name': {:?}", e))?;
                let count: i64 = row
                    .get("count")
                    .map_err(|e| anyhow::anyhow!("Failed to get field 'count': {:?}", e))?;
                Ok((name, count as usize))
            })
            .collect()
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

/// Node and relationship counts.
#[derive(Debug, Clone)]
pub struct GraphCounts {
    pub nodes: usize,
    pub relationships: usize,
}

/// Per-label and per-type counts.
#[derive(Debug, Clone)]
pub struct GraphBreakdown {
    pub labels: Vec<(String, usize)>,
    pub relationship_types: Vec<(String, usize)>,
}
