//! `PostgreSQL` store backend.
//!
//! Each store gets its own lazily-connected [`sqlx::PgPool`]; nothing is
//! shared between the two stores, so exhausting one pool never blocks the
//! other. Statements are run with runtime query construction (the mediator
//! only ever sees opaque SQL) and rows are decoded column by column into
//! JSON objects.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::postgres::types::{Oid, PgInterval, PgTimeTz};
use sqlx::postgres::{
    PgArguments, PgColumn, PgConnectOptions, PgPoolOptions, PgRow, PgSslMode, PgTypeKind,
};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::BackendError;
use crate::query::{QueryParam, Row};

/// Application name reported to the server in `pg_stat_activity`.
const APPLICATION_NAME: &str = "mrrobot-store";

/// Connection pool for one `PostgreSQL` store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Build a pool for the store without opening any connection yet.
    ///
    /// Connections are established on first use, so an unreachable server
    /// surfaces as a probe failure rather than a construction error.
    pub fn connect_lazy(config: &StoreConfig) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_lazy_with(connect_options(config));

        tracing::debug!(
            host = config.host,
            port = config.port,
            database = config.database,
            max_connections = config.max_connections,
            tls = config.tls,
            "PostgreSQL pool created"
        );

        Self { pool }
    }

    /// Run `sql` with `params` bound positionally and decode every row.
    pub async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, BackendError> {
        let query = bind_params(sqlx::query(sql), params);
        let rows = query.fetch_all(&self.pool).await?;

        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            decoded.push(row_to_json(row)?);
        }
        Ok(decoded)
    }

    /// Issue `SELECT 1`.
    pub async fn ping(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Translate a [`StoreConfig`] into driver connect options.
fn connect_options(config: &StoreConfig) -> PgConnectOptions {
    let ssl_mode = if config.tls {
        // Encrypted, but the server certificate is not verified.
        PgSslMode::Require
    } else {
        PgSslMode::Disable
    };

    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .ssl_mode(ssl_mode)
        .application_name(APPLICATION_NAME);

    match config.statement_timeout {
        Some(timeout) => options.options([("statement_timeout", timeout.as_millis().to_string())]),
        None => options,
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            QueryParam::Null => query.bind(Option::<String>::None),
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::Text(v) => query.bind(v.clone()),
            QueryParam::Decimal(v) => query.bind(*v),
            QueryParam::Uuid(v) => query.bind(*v),
            QueryParam::Timestamp(v) => query.bind(*v),
            QueryParam::Json(v) => query.bind(v.clone()),
            QueryParam::TextArray(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Decode a row into a JSON object keyed by column name.
fn row_to_json(row: &PgRow) -> Result<Row, BackendError> {
    let mut object = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column)?;
        object.insert(column.name().to_owned(), value);
    }
    Ok(object)
}

/// Decode a single column by its `PostgreSQL` type.
///
/// Values arrive in the binary wire format, so every type needs an explicit
/// mapping:
///
/// - `numeric` (and `numeric[]`) is rendered as a string to keep precision.
/// - Date and time types become ISO 8601 strings.
/// - `interval` becomes `{"months", "days", "microseconds"}`.
/// - `bytea` becomes standard base64.
/// - Enum values are sent as their label and read as text.
///
/// Any other type is a [`BackendError::UnsupportedType`]; the caller should
/// cast it in SQL (for example `inet_col::text`).
fn decode_column(row: &PgRow, column: &PgColumn) -> Result<Value, BackendError> {
    let idx = column.ordinal();
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let type_info = column.type_info();
    let value = match type_info.name() {
        "BOOL" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
        "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
        "OID" => Value::from(row.try_get::<Oid, _>(idx)?.0),
        "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(idx)?)),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
        "NUMERIC" => Value::String(row.try_get::<Decimal, _>(idx)?.to_string()),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            Value::String(row.try_get::<String, _>(idx)?)
        }
        "UUID" => Value::String(row.try_get::<Uuid, _>(idx)?.to_string()),
        "BYTEA" => Value::String(BASE64.encode(row.try_get::<Vec<u8>, _>(idx)?)),
        "TIMESTAMPTZ" => Value::String(row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339()),
        "TIMESTAMP" => Value::String(
            row.try_get::<NaiveDateTime, _>(idx)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        "TIMETZ" => {
            let value = row.try_get::<PgTimeTz<NaiveTime, FixedOffset>, _>(idx)?;
            Value::String(format!("{}{}", value.time, value.offset))
        }
        "INTERVAL" => {
            let interval = row.try_get::<PgInterval, _>(idx)?;
            json!({
                "months": interval.months,
                "days": interval.days,
                "microseconds": interval.microseconds,
            })
        }
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx)?,
        "VOID" => Value::Null,
        "BOOL[]" => Value::from(row.try_get::<Vec<bool>, _>(idx)?),
        "INT2[]" => Value::from(row.try_get::<Vec<i16>, _>(idx)?),
        "INT4[]" => Value::from(row.try_get::<Vec<i32>, _>(idx)?),
        "INT8[]" => Value::from(row.try_get::<Vec<i64>, _>(idx)?),
        "FLOAT4[]" => Value::from(
            row.try_get::<Vec<f32>, _>(idx)?
                .into_iter()
                .map(f64::from)
                .collect::<Vec<_>>(),
        ),
        "FLOAT8[]" => Value::from(row.try_get::<Vec<f64>, _>(idx)?),
        "NUMERIC[]" => strings(&row.try_get::<Vec<Decimal>, _>(idx)?),
        "TEXT[]" | "VARCHAR[]" => Value::from(row.try_get::<Vec<String>, _>(idx)?),
        "UUID[]" => strings(&row.try_get::<Vec<Uuid>, _>(idx)?),
        "DATE[]" => strings(&row.try_get::<Vec<NaiveDate>, _>(idx)?),
        "TIMESTAMPTZ[]" => Value::from(
            row.try_get::<Vec<DateTime<Utc>>, _>(idx)?
                .iter()
                .map(DateTime::to_rfc3339)
                .collect::<Vec<_>>(),
        ),
        _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => {
            Value::String(row.try_get_unchecked::<String, _>(idx)?)
        }
        other => {
            return Err(BackendError::UnsupportedType {
                column: column.name().to_owned(),
                type_name: other.to_owned(),
            });
        }
    };
    Ok(value)
}

fn strings<T: ToString>(values: &[T]) -> Value {
    Value::from(values.iter().map(ToString::to_string).collect::<Vec<_>>())
}
