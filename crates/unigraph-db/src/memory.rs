//! In-memory source, for tests and fixtures.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{Row, SourceError, SourceResult, SourceStore};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// Tables held in memory, listed in name order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, MemoryTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, columns: &[&str], rows: Vec<Row>) -> Self {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        );
        self
    }

    fn table(&self, name: &str) -> SourceResult<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| SourceError::TableNotFound(name.to_string()))
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self) -> SourceResult<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn columns(&self, table: &str) -> SourceResult<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn fetch_rows(&self, table: &str) -> SourceResult<Vec<Row>> {
        Ok(self.table(table)?.rows.clone())
    }
}
