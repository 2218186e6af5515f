//! PostgreSQL source.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::debug;

use crate::{Row, SourceError, SourceResult, SourceStore, SqlValue, quote_ident};

/// Reads one schema of a PostgreSQL database.
pub struct PgSource {
    pool: PgPool,
    schema: String,
}

impl PgSource {
    /// Connect to `url`, reading tables of `schema`.
    pub async fn connect(url: &str, schema: &str) -> SourceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await?;

        Ok(Self {
            pool,
            schema: schema.to_string(),
        })
    }

    /// `(name, udt_name)` of every column of `table` in ordinal order.
    async fn column_types(&self, table: &str) -> SourceResult<Vec<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT column_name::text, udt_name::text FROM information_schema.columns
             WHERE table_schema = $1 AND table_name = $2
             ORDER BY ordinal_position",
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(SourceError::TableNotFound(table.to_string()));
        }
        Ok(rows)
    }
}

#[async_trait]
impl SourceStore for PgSource {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self) -> SourceResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = $1 AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn columns(&self, table: &str) -> SourceResult<Vec<String>> {
        Ok(self.column_types(table).await?.into_iter().map(|(name, _)| name).collect())
    }

    async fn fetch_rows(&self, table: &str) -> SourceResult<Vec<Row>> {
        let columns = self.column_types(table).await?;
        let decodes: Vec<Decode> = columns.iter().map(|(_, udt)| Decode::for_udt(udt)).collect();

        let select = columns
            .iter()
            .zip(&decodes)
            .map(|((name, _), decode)| match decode {
                Decode::Native => quote_ident(name),
                Decode::Numeric | Decode::Text => format!("{0}::text AS {0}", quote_ident(name)),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}.{}", select, quote_ident(&self.schema), quote_ident(table));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        debug!(table, rows = rows.len(), "Fetched PostgreSQL rows");

        rows.iter()
            .map(|row| {
                decodes
                    .iter()
                    .enumerate()
                    .map(|(i, decode)| decode_column(row, i, *decode))
                    .collect()
            })
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// How a column is selected and read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decode {
    /// Read with the matching Rust type.
    Native,
    /// Selected as text, then parsed so any precision or NaN survives.
    Numeric,
    /// Selected as text (UUID, TIME, INTERVAL, JSON, arrays, ...).
    Text,
}

impl Decode {
    fn for_udt(udt: &str) -> Self {
        match udt {
            "bool" | "int2" | "int4" | "int8" | "float4" | "float8" | "text" | "varchar" | "bpchar" | "name"
            | "date" | "timestamp" | "timestamptz" => Decode::Native,
            "numeric" => Decode::Numeric,
            _ => Decode::Text,
        }
    }
}

/// Exact decimal when it fits in 96 bits, float otherwise.
fn parse_numeric(text: &str) -> SqlValue {
    if let Ok(d) = text.parse::<Decimal>() {
        return SqlValue::Decimal(d);
    }
    match text.parse::<f64>() {
        Ok(x) => SqlValue::Float(x),
        Err(_) => SqlValue::Unsupported(format!("NUMERIC ({})", text)),
    }
}

/// Decode one column by its PostgreSQL type.
///
/// Values outside the decodable set become `SqlValue::Unsupported` so the
/// failure surfaces per row at coercion time instead of failing the whole table.
fn decode_column(row: &PgRow, index: usize, decode: Decode) -> SourceResult<SqlValue> {
    match decode {
        Decode::Numeric => {
            let text = row.try_get::<Option<String>, _>(index)?;
            return Ok(text.as_deref().map(parse_numeric).unwrap_or(SqlValue::Null));
        }
        Decode::Text => {
            let text = row.try_get::<Option<String>, _>(index)?;
            return Ok(text.map(SqlValue::Text).unwrap_or(SqlValue::Null));
        }
        Decode::Native => {}
    }

    let type_name = row.column(index).type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(SqlValue::Bool),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(|v| SqlValue::Integer(v.into())),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(|v| SqlValue::Integer(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(SqlValue::Integer),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(|v| SqlValue::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(SqlValue::Float),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.map(SqlValue::Text)
        }
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|d| SqlValue::Text(d.to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|t| SqlValue::Text(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(|t| SqlValue::Text(t.to_rfc3339())),
        _ => {
            if row.try_get_raw(index)?.is_null() {
                None
            } else {
                Some(SqlValue::Unsupported(type_name.clone()))
            }
        }
    };

    Ok(value.unwrap_or(SqlValue::Null))
}
