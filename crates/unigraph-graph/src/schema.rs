//! Graph schema initialization (uniqueness constraints).

use tracing::{debug, info};

use unigraph_core::Endpoint;

use crate::store::{GraphStore, StoreResult};

/// Declare one uniqueness constraint per `(label, key)` pair.
///
/// Safe to run multiple times: an existing constraint is left as it is.
pub async fn initialize_schema(store: &dyn GraphStore, keys: &[Endpoint]) -> StoreResult<()> {
    info!(store = store.kind(), "Initializing graph schema...");

    for key in keys {
        store.ensure_unique(key).await?;
        debug!(label = %key.label, key = %key.key, "Uniqueness constraint declared");
    }

    info!("Graph schema initialized ({} constraints)", keys.len());
    Ok(())
}
