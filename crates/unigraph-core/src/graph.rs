//! Graph write operations emitted by the materializers.
//!
//! These are store-agnostic: the Neo4j adapter renders them as parameterized
//! Cypher, the in-memory graph applies them directly.

use serde::Serialize;

use crate::value::GraphValue;

/// Property bag in source column order. Null values are never stored.
pub type Properties = Vec<(String, GraphValue)>;

/// `CREATE (:Label {properties})`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCreate {
    pub label: String,
    pub properties: Properties,
}

impl NodeCreate {
    pub fn property(&self, name: &str) -> Option<&GraphValue> {
        self.properties.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// One relationship endpoint, matched by its unique key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointMatch {
    pub label: String,
    pub key: String,
    pub value: GraphValue,
}

/// `MATCH (a), (b) CREATE (a)-[:TYPE {properties}]->(b)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipCreate {
    pub rel_type: String,
    pub from: EndpointMatch,
    pub to: EndpointMatch,
    pub properties: Properties,
}
