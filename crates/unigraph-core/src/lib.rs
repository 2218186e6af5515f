//! # Unigraph Core
//!
//! Domain model for moving a relational university schema into a property graph.
//!
//! Nothing in this crate performs I/O: it holds the schema catalog that decides
//! what every table becomes, the coercion rules for scalar values, and the graph
//! operations the materializers emit.

pub mod catalog;
pub mod error;
pub mod graph;
pub mod value;

pub use catalog::{
    Anchor, Catalog, DefaultPolicy, EdgeDirection, Endpoint, ForeignKeyEdge, NodeTable,
    RelationshipTable, TableRole, derive_label,
};
pub use error::{CatalogError, CoercionError};
pub use graph::{EndpointMatch, NodeCreate, Properties, RelationshipCreate};
pub use value::{GraphValue, SqlValue, coerce};
