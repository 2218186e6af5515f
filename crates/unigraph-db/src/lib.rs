//! # Unigraph DB
//!
//! Read-only access to the relational source of a transfer.
//!
//! Every adapter implements [`SourceStore`]: list the tables, list a table's
//! columns in ordinal order, fetch all of its rows as [`SqlValue`]s.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

pub use error::{SourceError, SourceResult};
pub use memory::MemorySource;
pub use postgres::PgSource;
pub use sqlite::SqliteSource;
pub use unigraph_core::SqlValue;

/// One relational row, positionally aligned with the table's columns.
pub type Row = Vec<SqlValue>;

/// The relational side of a transfer.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Short adapter name for log lines.
    fn kind(&self) -> &'static str;

    async fn list_tables(&self) -> SourceResult<Vec<String>>;

    /// Column names of `table` in ordinal order.
    async fn columns(&self, table: &str) -> SourceResult<Vec<String>>;

    /// All rows of `table`, in the column order of `SELECT *`.
    async fn fetch_rows(&self, table: &str) -> SourceResult<Vec<Row>>;

    /// Release the underlying connections.
    async fn close(&self) {}
}

/// Where to read the relational schema from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Postgres { url: String, schema: String },
    Sqlite { path: std::path::PathBuf },
}

/// Open the configured source.
pub async fn connect(config: &SourceConfig) -> SourceResult<Box<dyn SourceStore>> {
    match config {
        SourceConfig::Postgres { url, schema } => {
            let source = PgSource::connect(url, schema).await?;
            info!(schema = %schema, "Connected to PostgreSQL source");
            Ok(Box::new(source))
        }
        SourceConfig::Sqlite { path } => {
            let source = SqliteSource::open(path)?;
            info!(path = %path.display(), "Opened SQLite source");
            Ok(Box::new(source))
        }
    }
}

/// Double-quote an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
