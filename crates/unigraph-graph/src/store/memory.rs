//! In-process property graph with Neo4j's creation semantics.
//!
//! Used for dry runs and tests: uniqueness constraints reject duplicate keys,
//! relationship creation matches endpoints by label and key and creates one
//! relationship per matched pair, and wiping keeps declared constraints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;

use unigraph_core::{Endpoint, EndpointMatch, GraphValue, NodeCreate, RelationshipCreate};

use super::{GraphStore, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryNode {
    pub label: String,
    pub properties: BTreeMap<String, GraphValue>,
}

impl MemoryNode {
    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.properties.get(key)
    }

    fn matches(&self, endpoint: &EndpointMatch) -> bool {
        self.label == endpoint.label
            && self
                .properties
                .get(&endpoint.key)
                .is_some_and(|value| same_value(value, &endpoint.value))
    }
}

/// Equality as Cypher's `=` sees it: integers and floats compare by value.
fn same_value(a: &GraphValue, b: &GraphValue) -> bool {
    match (a, b) {
        (GraphValue::Integer(i), GraphValue::Float(x)) | (GraphValue::Float(x), GraphValue::Integer(i)) => {
            *i as f64 == *x
        }
        _ => a == b,
    }
}

/// A relationship with both endpoints resolved to full nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRelationship {
    pub rel_type: String,
    pub from: MemoryNode,
    pub to: MemoryNode,
    pub properties: BTreeMap<String, GraphValue>,
}

/// Order-independent view of the whole graph; equal snapshots mean isomorphic graphs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<MemoryNode>,
    pub relationships: Vec<MemoryRelationship>,
}

#[derive(Debug)]
struct StoredRelationship {
    rel_type: String,
    from: usize,
    to: usize,
    properties: BTreeMap<String, GraphValue>,
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<MemoryNode>,
    relationships: Vec<StoredRelationship>,
    constraints: BTreeSet<Endpoint>,
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, GraphState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Connection("in-memory graph lock poisoned".to_string()))
    }

    fn read(&self) -> MutexGuard<'_, GraphState> {
        // Mutations cannot panic halfway, so a poisoned graph is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.read().relationships.len()
    }

    pub fn constraints(&self) -> Vec<Endpoint> {
        self.read().constraints.iter().cloned().collect()
    }

    /// Nodes carrying `label`, in creation order.
    pub fn nodes(&self, label: &str) -> Vec<MemoryNode> {
        self.read().nodes.iter().filter(|n| n.label == label).cloned().collect()
    }

    /// Relationships of `rel_type`, in creation order.
    pub fn relationships(&self, rel_type: &str) -> Vec<MemoryRelationship> {
        let state = self.read();
        state
            .relationships
            .iter()
            .filter(|r| r.rel_type == rel_type)
            .map(|r| resolve(&state, r))
            .collect()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.read();
        let mut nodes = state.nodes.clone();
        nodes.sort_by_cached_key(|n| format!("{:?}", n));
        let mut relationships: Vec<MemoryRelationship> =
            state.relationships.iter().map(|r| resolve(&state, r)).collect();
        relationships.sort_by_cached_key(|r| format!("{:?}", r));
        GraphSnapshot { nodes, relationships }
    }

    /// Per-label node counts and per-type relationship counts.
    pub fn breakdown(&self) -> (Vec<(String, usize)>, Vec<(String, usize)>) {
        let state = self.read();
        let mut labels: BTreeMap<String, usize> = BTreeMap::new();
        for node in &state.nodes {
            *labels.entry(node.label.clone()).or_default() += 1;
        }
        let mut types: BTreeMap<String, usize> = BTreeMap::new();
        for rel in &state.relationships {
            *types.entry(rel.rel_type.clone()).or_default() += 1;
        }
        (labels.into_iter().collect(), types.into_iter().collect())
    }
}

fn resolve(state: &GraphState, rel: &StoredRelationship) -> MemoryRelationship {
    MemoryRelationship {
        rel_type: rel.rel_type.clone(),
        from: state.nodes[rel.from].clone(),
        to: state.nodes[rel.to].clone(),
        properties: rel.properties.clone(),
    }
}

fn stored_properties(properties: &[(String, GraphValue)]) -> BTreeMap<String, GraphValue> {
    properties
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[async_trait]
impl GraphStore for MemoryGraph {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn wipe(&self) -> StoreResult<()> {
        let mut state = self.state()?;
        state.relationships.clear();
        state.nodes.clear();
        Ok(())
    }

    async fn ensure_unique(&self, endpoint: &Endpoint) -> StoreResult<()> {
        let mut state = self.state()?;
        if !state.constraints.contains(endpoint) {
            let mut seen: Vec<&GraphValue> = Vec::new();
            for node in state.nodes.iter().filter(|n| n.label == endpoint.label) {
                if let Some(value) = node.get(&endpoint.key) {
                    if seen.iter().any(|other| same_value(other, value)) {
                        return Err(StoreError::Rejected(format!(
                            "cannot create constraint on {}.{}: duplicate value {}",
                            endpoint.label, endpoint.key, value
                        )));
                    }
                    seen.push(value);
                }
            }
            state.constraints.insert(endpoint.clone());
        }
        Ok(())
    }

    async fn create_node(&self, node: &NodeCreate) -> StoreResult<()> {
        let mut state = self.state()?;
        let candidate = MemoryNode {
            label: node.label.clone(),
            properties: stored_properties(&node.properties),
        };

        for constraint in state.constraints.iter().filter(|c| c.label == node.label) {
            let Some(value) = candidate.get(&constraint.key) else {
                continue;
            };
            let clash = state
                .nodes
                .iter()
                .any(|n| n.label == constraint.label && n.get(&constraint.key).is_some_and(|v| same_value(v, value)));
            if clash {
                return Err(StoreError::Rejected(format!(
                    "Node already exists with label `{}` and property `{}` = {}",
                    constraint.label, constraint.key, value
                )));
            }
        }

        state.nodes.push(candidate);
        Ok(())
    }

    async fn create_relationship(&self, rel: &RelationshipCreate) -> StoreResult<u64> {
        let mut state = self.state()?;
        let matching = |endpoint: &EndpointMatch| -> Vec<usize> {
            state
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.matches(endpoint))
                .map(|(i, _)| i)
                .collect()
        };
        let froms = matching(&rel.from);
        let tos = matching(&rel.to);

        let properties = stored_properties(&rel.properties);
        let mut created = 0;
        for &from in &froms {
            for &to in &tos {
                state.relationships.push(StoredRelationship {
                    rel_type: rel.rel_type.clone(),
                    from,
                    to,
                    properties: properties.clone(),
                });
                created += 1;
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(label: &str, props: &[(&str, GraphValue)]) -> NodeCreate {
        NodeCreate {
            label: label.into(),
            properties: props.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    fn endpoint(label: &str, value: &str) -> EndpointMatch {
        EndpointMatch {
            label: label.into(),
            key: "id".into(),
            value: value.into(),
        }
    }

    #[tokio::test]
    async fn test_unique_constraint_rejects_duplicates() {
        let graph = MemoryGraph::new();
        graph.ensure_unique(&Endpoint::new("Student", "id")).await.unwrap();
        graph.create_node(&node("Student", &[("id", "1".into())])).await.unwrap();

        let err = graph.create_node(&node("Student", &[("id", "1".into())])).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        // Other labels are unaffected.
        graph.create_node(&node("Professor", &[("id", "1".into())])).await.unwrap();
        assert_eq!(graph.node_count(), 2);
    }

    #[tokio::test]
    async fn test_numbers_compare_by_value() {
        let graph = MemoryGraph::new();
        graph.ensure_unique(&Endpoint::new("Student", "id")).await.unwrap();
        graph.create_node(&node("Student", &[("id", GraphValue::Integer(1))])).await.unwrap();

        let err = graph
            .create_node(&node("Student", &[("id", GraphValue::Float(1.0))]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        graph.create_node(&node("Course", &[("id", GraphValue::Float(7.0))])).await.unwrap();
        let rel = RelationshipCreate {
            rel_type: "TAKES".into(),
            from: EndpointMatch {
                label: "Student".into(),
                key: "id".into(),
                value: GraphValue::Float(1.0),
            },
            to: EndpointMatch {
                label: "Course".into(),
                key: "id".into(),
                value: GraphValue::Integer(7),
            },
            properties: vec![],
        };
        assert_eq!(graph.create_relationship(&rel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_constraint_on_existing_duplicates_is_rejected() {
        let graph = MemoryGraph::new();
        graph.create_node(&node("Subj", &[("id", GraphValue::Integer(3))])).await.unwrap();
        graph.create_node(&node("Subj", &[("id", GraphValue::Float(3.0))])).await.unwrap();

        let err = graph.ensure_unique(&Endpoint::new("Subj", "id")).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(graph.constraints().is_empty());
    }

    #[tokio::test]
    async fn test_null_properties_are_not_stored() {
        let graph = MemoryGraph::new();
        graph
            .create_node(&node("Student", &[("id", "1".into()), ("group_id", GraphValue::Null)]))
            .await
            .unwrap();
        let stored = &graph.nodes("Student")[0];
        assert_eq!(stored.properties.len(), 1);
        assert!(stored.get("group_id").is_none());
    }

    #[tokio::test]
    async fn test_relationship_requires_both_endpoints() {
        let graph = MemoryGraph::new();
        graph.create_node(&node("Professor", &[("id", "P005".into())])).await.unwrap();
        graph.create_node(&node("Subj", &[("id", "SUB101".into())])).await.unwrap();

        let mut rel = RelationshipCreate {
            rel_type: "TEACHES".into(),
            from: endpoint("Professor", "P005"),
            to: endpoint("Subj", "SUB101"),
            properties: vec![("semester".into(), "2".into())],
        };
        assert_eq!(graph.create_relationship(&rel).await.unwrap(), 1);

        rel.to = endpoint("Subj", "SUB999");
        assert_eq!(graph.create_relationship(&rel).await.unwrap(), 0);

        let teaches = graph.relationships("TEACHES");
        assert_eq!(teaches.len(), 1);
        assert_eq!(teaches[0].from.get("id"), Some(&GraphValue::from("P005")));
        assert_eq!(teaches[0].properties.get("semester"), Some(&GraphValue::from("2")));
    }

    #[tokio::test]
    async fn test_wipe_keeps_constraints() {
        let graph = MemoryGraph::new();
        graph.ensure_unique(&Endpoint::new("Course", "id")).await.unwrap();
        graph.create_node(&node("Course", &[("id", "CC".into())])).await.unwrap();
        graph.wipe().await.unwrap();

        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.constraints(), vec![Endpoint::new("Course", "id")]);
    }

    #[tokio::test]
    async fn test_snapshot_ignores_creation_order() {
        let a = MemoryGraph::new();
        let b = MemoryGraph::new();
        for (label, id) in [("Subj", "S1"), ("Subj", "S2")] {
            a.create_node(&node(label, &[("id", id.into())])).await.unwrap();
        }
        for (label, id) in [("Subj", "S2"), ("Subj", "S1")] {
            b.create_node(&node(label, &[("id", id.into())])).await.unwrap();
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }
}
