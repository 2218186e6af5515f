//! SQLite source.
//!
//! SQLite has no decimal storage class, so columns whose declared type is
//! `DECIMAL`/`NUMERIC`/`MONEY` are read back as decimals and `BOOLEAN`
//! columns as booleans. Everything else maps by storage class.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

use crate::{Row, SourceError, SourceResult, SourceStore, SqlValue, quote_ident};

/// Declared-type affinity that changes how a stored value is read.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Affinity {
    Decimal,
    Boolean,
    Plain,
}

impl Affinity {
    fn from_decl(decl: &str) -> Self {
        let decl = decl.to_ascii_uppercase();
        if ["DECIMAL", "NUMERIC", "MONEY"].iter().any(|t| decl.contains(t)) {
            Affinity::Decimal
        } else if decl.contains("BOOL") {
            Affinity::Boolean
        } else {
            Affinity::Plain
        }
    }
}

/// Reads a SQLite database through a single connection.
pub struct SqliteSource {
    conn: Mutex<Connection>,
}

impl SqliteSource {
    /// Open a database file read-only.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already open connection (e.g. an in-memory database).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, SourceError>) -> SourceResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SourceError::Unavailable("SQLite connection lock poisoned".to_string()))?;
        f(&conn)
    }
}

/// `(name, declared type)` for every column of `table`.
fn table_info(conn: &Connection, table: &str) -> SourceResult<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(SourceError::TableNotFound(table.to_string()));
    }
    Ok(columns)
}

fn read_value(value: ValueRef<'_>, affinity: Affinity) -> SqlValue {
    match (value, affinity) {
        (ValueRef::Null, _) => SqlValue::Null,
        (ValueRef::Integer(i), Affinity::Decimal) => SqlValue::Decimal(Decimal::from(i)),
        (ValueRef::Integer(i), Affinity::Boolean) => SqlValue::Bool(i != 0),
        (ValueRef::Integer(i), Affinity::Plain) => SqlValue::Integer(i),
        (ValueRef::Real(x), Affinity::Decimal) => {
            Decimal::from_f64(x).map(SqlValue::Decimal).unwrap_or(SqlValue::Float(x))
        }
        (ValueRef::Real(x), _) => SqlValue::Float(x),
        (ValueRef::Text(bytes), affinity) => {
            let Ok(text) = String::from_utf8(bytes.to_vec()) else {
                return SqlValue::Unsupported("TEXT (invalid UTF-8)".to_string());
            };
            match affinity {
                Affinity::Decimal => match text.parse::<Decimal>() {
                    Ok(d) => SqlValue::Decimal(d),
                    Err(_) => SqlValue::Text(text),
                },
                _ => SqlValue::Text(text),
            }
        }
        (ValueRef::Blob(_), _) => SqlValue::Unsupported("BLOB".to_string()),
    }
}

#[async_trait]
impl SourceStore for SqliteSource {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn list_tables(&self) -> SourceResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    async fn columns(&self, table: &str) -> SourceResult<Vec<String>> {
        self.with_conn(|conn| {
            Ok(table_info(conn, table)?.into_iter().map(|(name, _)| name).collect())
        })
    }

    async fn fetch_rows(&self, table: &str) -> SourceResult<Vec<Row>> {
        self.with_conn(|conn| {
            let affinities: Vec<Affinity> = table_info(conn, table)?
                .iter()
                .map(|(_, decl)| Affinity::from_decl(decl))
                .collect();

            let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
            let rows = stmt
                .query_map([], |row| {
                    affinities
                        .iter()
                        .enumerate()
                        .map(|(i, affinity)| Ok(read_value(row.get_ref(i)?, *affinity)))
                        .collect::<rusqlite::Result<Row>>()
                })?
                .collect::<Result<Vec<_>, _>>()?;

            debug!(table, rows = rows.len(), "Fetched SQLite rows");
            Ok(rows)
        })
    }
}
