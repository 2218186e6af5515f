//! Cypher rendering of graph operations.
//!
//! Labels, relationship types and property keys are backtick-quoted; values
//! always travel as parameters.

use neo4rs::{BoltNull, BoltType, Query};

use unigraph_core::{Endpoint, GraphValue, NodeCreate, Properties, RelationshipCreate};

/// A Cypher statement with its parameters, before it is handed to neo4rs.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<(String, GraphValue)>,
}

impl Statement {
    fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn into_query(self) -> Query {
        self.params
            .into_iter()
            .fold(Query::new(self.text), |query, (key, value)| query.param(&key, to_bolt(&value)))
    }
}

/// Quote a name for use as a Cypher identifier.
pub fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn to_bolt(value: &GraphValue) -> BoltType {
    match value {
        GraphValue::Null => BoltType::Null(BoltNull),
        GraphValue::Bool(b) => (*b).into(),
        GraphValue::Integer(i) => (*i).into(),
        GraphValue::Float(x) => (*x).into(),
        GraphValue::String(s) => s.as_str().into(),
    }
}

pub fn wipe() -> Statement {
    Statement::bare("MATCH (n) DETACH DELETE n")
}

/// Stable constraint name, e.g. `unigraph_tccgroup_id`.
pub fn constraint_name(endpoint: &Endpoint) -> String {
    let raw = format!("unigraph_{}_{}", endpoint.label, endpoint.key).to_lowercase();
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn unique_constraint(endpoint: &Endpoint) -> Statement {
    Statement::bare(format!(
        "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        quote(&constraint_name(endpoint)),
        quote(&endpoint.label),
        quote(&endpoint.key)
    ))
}

/// Render `{`k`: $p0, ...}` and append the values to `params`.
fn property_map(properties: &Properties, prefix: &str, params: &mut Vec<(String, GraphValue)>) -> String {
    if properties.is_empty() {
        return String::new();
    }
    let entries: Vec<String> = properties
        .iter()
        .enumerate()
        .map(|(i, (key, value))| {
            let param = format!("{}{}", prefix, i);
            params.push((param.clone(), value.clone()));
            format!("{}: ${}", quote(key), param)
        })
        .collect();
    format!(" {{{}}}", entries.join(", "))
}

pub fn create_node(node: &NodeCreate) -> Statement {
    let mut params = Vec::new();
    let props = property_map(&node.properties, "p", &mut params);
    Statement {
        text: format!("CREATE (n:{}{})", quote(&node.label), props),
        params,
    }
}

pub fn create_relationship(rel: &RelationshipCreate) -> Statement {
    let mut params = vec![
        ("from_key".to_string(), rel.from.value.clone()),
        ("to_key".to_string(), rel.to.value.clone()),
    ];
    let props = property_map(&rel.properties, "p", &mut params);
    Statement {
        text: format!(
            "MATCH (a:{} {{{}: $from_key}}), (b:{} {{{}: $to_key}})\n\
             CREATE (a)-[r:{}{}]->(b)\n\
             RETURN count(r) AS created",
            quote(&rel.from.label),
            quote(&rel.from.key),
            quote(&rel.to.label),
            quote(&rel.to.key),
            quote(&rel.rel_type),
            props
        ),
        params,
    }
}
