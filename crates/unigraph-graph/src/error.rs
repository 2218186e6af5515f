//! Transfer error types.

use thiserror::Error;

use unigraph_core::{CatalogError, CoercionError};
use unigraph_db::SourceError;

use crate::store::StoreError;
use crate::transfer::Phase;

/// Why a single row could not be turned into a graph operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterializeError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("Row has {found} values but the table has {expected} columns")]
    Arity { expected: usize, found: usize },

    #[error("Column '{0}' is not a column of the table")]
    MissingColumn(String),
}

/// A failure that ends the run.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Source error during {phase}: {source}")]
    Source {
        phase: Phase,
        #[source]
        source: SourceError,
    },

    #[error("Graph store error during {phase}: {source}")]
    Store {
        phase: Phase,
        #[source]
        source: StoreError,
    },
}
