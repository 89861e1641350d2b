//! Bind parameters and result rows.
//!
//! Statements are opaque SQL strings using `PostgreSQL` placeholders
//! (`$1, $2, ...`). Parameters are passed positionally as [`QueryParam`]
//! values and rows come back as JSON objects keyed by column name, which is
//! the shape the route layer serializes straight into responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One result row: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A single positional bind parameter.
///
/// [`QueryParam::Null`] is bound as a `NULL` of type `text`; cast it in
/// SQL (`$1::int`) when the target column has a different type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QueryParam {
    /// SQL `NULL`.
    Null,
    /// `boolean`.
    Bool(bool),
    /// `bigint`; `PostgreSQL` applies assignment casts to narrower integers.
    Int(i64),
    /// `double precision`.
    Float(f64),
    /// `text`.
    Text(String),
    /// `numeric`.
    Decimal(Decimal),
    /// `uuid`.
    Uuid(Uuid),
    /// `timestamptz`.
    Timestamp(DateTime<Utc>),
    /// `jsonb`.
    Json(serde_json::Value),
    /// `text[]`.
    TextArray(Vec<String>),
}

impl From<bool> for QueryParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for QueryParam {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for QueryParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Decimal> for QueryParam {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<Uuid> for QueryParam {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<DateTime<Utc>> for QueryParam {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<serde_json::Value> for QueryParam {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<String>> for QueryParam {
    fn from(value: Vec<String>) -> Self {
        Self::TextArray(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for QueryParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
