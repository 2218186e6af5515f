//! Centralized error types for the transfer domain model.

use thiserror::Error;

/// Problems with the table-to-graph mapping itself.
///
/// All of these are raised before the target graph is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Table '{0}' has no catalog entry")]
    UnlistedTable(String),

    #[error("Source tables without catalog entry: {}", .0.join(", "))]
    UnlistedTables(Vec<String>),

    #[error("Invalid catalog: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// A relational value that has no graph-storable equivalent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("Column '{column}': decimal {value} does not fit a finite float")]
    DecimalOutOfRange { column: String, value: String },

    #[error("Column '{column}': {type_name} values cannot be stored in the graph")]
    Unsupported { column: String, type_name: String },
}

impl CoercionError {
    /// Name of the offending column.
    pub fn column(&self) -> &str {
        match self {
            Self::DecimalOutOfRange { column, .. } | Self::Unsupported { column, .. } => column,
        }
    }
}
