//! Relational scalars and their graph-storable counterparts.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::error::CoercionError;

/// One scalar read from the relational source.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    /// A value the source adapter could not decode; carries the source type name.
    Unsupported(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Short type name used in log lines and error messages.
    pub fn type_name(&self) -> &str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "boolean",
            SqlValue::Integer(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::Text(_) => "text",
            SqlValue::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Float(x) => write!(f, "{}", x),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Unsupported(name) => write!(f, "<{}>", name),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<Decimal> for SqlValue {
    fn from(d: Decimal) -> Self {
        SqlValue::Decimal(d)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A property value as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl GraphValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Null)
    }
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Null => write!(f, "null"),
            GraphValue::Bool(b) => write!(f, "{}", b),
            GraphValue::Integer(i) => write!(f, "{}", i),
            GraphValue::Float(x) => write!(f, "{:?}", x),
            GraphValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for GraphValue {
    fn from(s: &str) -> Self {
        GraphValue::String(s.to_string())
    }
}

impl From<i64> for GraphValue {
    fn from(i: i64) -> Self {
        GraphValue::Integer(i)
    }
}

impl From<f64> for GraphValue {
    fn from(x: f64) -> Self {
        GraphValue::Float(x)
    }
}

impl From<GraphValue> for SqlValue {
    fn from(v: GraphValue) -> Self {
        match v {
            GraphValue::Null => SqlValue::Null,
            GraphValue::Bool(b) => SqlValue::Bool(b),
            GraphValue::Integer(i) => SqlValue::Integer(i),
            GraphValue::Float(x) => SqlValue::Float(x),
            GraphValue::String(s) => SqlValue::Text(s),
        }
    }
}

/// Convert one relational value of `column` into its graph form.
///
/// Decimals widen to `f64`; every other decodable scalar passes through.
pub fn coerce(column: &str, value: &SqlValue) -> Result<GraphValue, CoercionError> {
    match value {
        SqlValue::Null => Ok(GraphValue::Null),
        SqlValue::Bool(b) => Ok(GraphValue::Bool(*b)),
        SqlValue::Integer(i) => Ok(GraphValue::Integer(*i)),
        SqlValue::Float(x) => Ok(GraphValue::Float(*x)),
        SqlValue::Text(s) => Ok(GraphValue::String(s.clone())),
        SqlValue::Decimal(d) => match d.to_f64() {
            Some(x) if x.is_finite() => Ok(GraphValue::Float(x)),
            _ => Err(CoercionError::DecimalOutOfRange {
                column: column.to_string(),
                value: d.to_string(),
            }),
        },
        SqlValue::Unsupported(type_name) => Err(CoercionError::Unsupported {
            column: column.to_string(),
            type_name: type_name.clone(),
        }),
    }
}
