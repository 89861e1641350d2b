//! Integration tests against live `PostgreSQL` instances.
//!
//! These tests need two local databases (one per store). Run with:
//!
//! ```bash
//! docker run -d --name store-a -e POSTGRES_PASSWORD=mrrobot -p 5433:5432 postgres:16
//! docker run -d --name store-b -e POSTGRES_PASSWORD=mrrobot -p 5434:5432 postgres:16
//! cargo test -p mrrobot-store -- --ignored
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use mrrobot_store::{DualStore, MediatorConfig, MediatorError, QueryParam, StoreConfig, StoreId};
use serde_json::json;
use uuid::Uuid;

fn store_config(port: u16) -> StoreConfig {
    StoreConfig::new("localhost", "postgres", "postgres")
        .with_port(port)
        .with_password("mrrobot")
        .with_max_connections(2)
}

fn both_stores() -> MediatorConfig {
    MediatorConfig {
        store_a: Some(store_config(5433)),
        store_b: Some(store_config(5434)),
        probe_timeout: Duration::from_secs(5),
        reprobe_interval: Duration::from_secs(5),
    }
}

#[tokio::test]
#[ignore = "requires two live PostgreSQL instances on ports 5433 and 5434"]
async fn writes_are_mirrored_and_reads_prefer_store_b() {
    let store = DualStore::initialize(&both_stores()).await.unwrap();
    store.ensure_available().await.unwrap();

    let table = format!("contacts_{}", Uuid::new_v4().simple());
    store
        .query(
            &format!("CREATE TABLE {table} (id SERIAL PRIMARY KEY, name TEXT NOT NULL, meta JSONB)"),
            &[],
        )
        .await
        .unwrap();

    let inserted = store
        .execute_mediated_query(
            &format!("INSERT INTO {table} (name, meta) VALUES ($1, $2) RETURNING id, name, meta"),
            &[
                QueryParam::from("Darlene"),
                QueryParam::from(json!({"source": "booking-form"})),
            ],
        )
        .await
        .unwrap();

    assert_eq!(inserted.selected, StoreId::B);
    assert_eq!(inserted.rows.len(), 1);
    assert_eq!(inserted.rows[0]["name"], "Darlene");
    assert_eq!(inserted.rows[0]["meta"]["source"], "booking-form");

    let status = store.status().await;
    assert!(status.store_a.connected);
    assert!(status.store_b.connected);

    store
        .query(&format!("DROP TABLE {table}"), &[])
        .await
        .unwrap();
    store.shutdown().await;
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL instance on port 5433"]
async fn unreachable_store_b_falls_back_to_store_a() {
    let config = MediatorConfig {
        store_a: Some(store_config(5433)),
        // Nothing listens here.
        store_b: Some(store_config(1)),
        probe_timeout: Duration::from_secs(2),
        reprobe_interval: Duration::from_secs(5),
    };
    let store = DualStore::initialize(&config).await.unwrap();

    let rows = store
        .query("SELECT 42::INT4 AS answer, 'ok'::TEXT AS status, NULL::TEXT AS missing", &[])
        .await
        .unwrap();
    assert_eq!(rows[0]["answer"], 42);
    assert_eq!(rows[0]["status"], "ok");
    assert!(rows[0]["missing"].is_null());

    let status = store.status().await;
    assert!(status.store_a.connected);
    assert!(!status.store_b.connected);
    assert!(status.store_b.error.is_some());

    store.shutdown().await;
}

#[tokio::test]
#[ignore = "requires no PostgreSQL listening on ports 1 and 2"]
async fn both_unreachable_is_reported_not_fatal() {
    let config = MediatorConfig {
        store_a: Some(store_config(1)),
        store_b: Some(store_config(2)),
        probe_timeout: Duration::from_secs(2),
        reprobe_interval: Duration::from_secs(5),
    };

    let store = DualStore::initialize(&config).await.unwrap();
    let err = store.ensure_available().await.unwrap_err();
    assert!(matches!(err, MediatorError::BothStoresUnavailable { .. }));
}

#[tokio::test]
#[ignore = "requires two live PostgreSQL instances on ports 5433 and 5434"]
async fn time_and_binary_types_decode_to_json() {
    let store = DualStore::initialize(&both_stores()).await.unwrap();

    let rows = store
        .query(
            "SELECT '09:30'::TIME AS slot, \
                    '09:30:15+02'::TIMETZ AS slot_tz, \
                    INTERVAL '1 month 2 days 3 seconds' AS span, \
                    '\\xdeadbeef'::BYTEA AS blob, \
                    42::OID AS oid, \
                    12.50::NUMERIC AS price, \
                    'walk-in'::VARCHAR AS source, \
                    pg_sleep(0) AS nothing",
            &[],
        )
        .await
        .unwrap();

    let row = &rows[0];
    assert_eq!(row["slot"], "09:30:00");
    assert_eq!(row["slot_tz"], "09:30:15+02:00");
    assert_eq!(row["span"], json!({"months": 1, "days": 2, "microseconds": 3_000_000}));
    assert_eq!(row["blob"], "3q2+7w==");
    assert_eq!(row["oid"], 42);
    assert_eq!(row["price"], "12.50");
    assert_eq!(row["source"], "walk-in");
    assert!(row["nothing"].is_null());

    store.shutdown().await;
}

#[tokio::test]
#[ignore = "requires two live PostgreSQL instances on ports 5433 and 5434"]
async fn array_types_decode_to_json() {
    let store = DualStore::initialize(&both_stores()).await.unwrap();

    let rows = store
        .query(
            "SELECT ARRAY[true, false] AS flags, \
                    ARRAY['6f1c5b0e-3f4e-4d7a-9a51-0c2f3e9d8b71'::UUID] AS ids, \
                    ARRAY[1.5, 2]::FLOAT8[] AS weights, \
                    ARRAY[10.25, 3]::NUMERIC[] AS prices, \
                    ARRAY[1, 2]::INT2[] AS small, \
                    ARRAY['2024-05-01'::DATE] AS days, \
                    ARRAY['a', 'b']::TEXT[] AS tags",
            &[],
        )
        .await
        .unwrap();

    let row = &rows[0];
    assert_eq!(row["flags"], json!([true, false]));
    assert_eq!(row["ids"], json!(["6f1c5b0e-3f4e-4d7a-9a51-0c2f3e9d8b71"]));
    assert_eq!(row["weights"], json!([1.5, 2.0]));
    assert_eq!(row["prices"], json!(["10.25", "3"]));
    assert_eq!(row["small"], json!([1, 2]));
    assert_eq!(row["days"], json!(["2024-05-01"]));
    assert_eq!(row["tags"], json!(["a", "b"]));

    store.shutdown().await;
}

#[tokio::test]
#[ignore = "requires two live PostgreSQL instances on ports 5433 and 5434"]
async fn enum_columns_decode_as_labels() {
    let store = DualStore::initialize(&both_stores()).await.unwrap();
    let type_name = format!("repair_state_{}", Uuid::new_v4().simple());

    store
        .query(&format!("CREATE TYPE {type_name} AS ENUM ('queued', 'done')"), &[])
        .await
        .unwrap();
    let rows = store
        .query(&format!("SELECT 'done'::{type_name} AS state"), &[])
        .await
        .unwrap();
    assert_eq!(rows[0]["state"], "done");

    store.query(&format!("DROP TYPE {type_name}"), &[]).await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
#[ignore = "requires two live PostgreSQL instances on ports 5433 and 5434"]
async fn returning_a_time_column_reports_success() {
    let store = DualStore::initialize(&both_stores()).await.unwrap();
    let table = format!("bookings_{}", Uuid::new_v4().simple());

    store
        .query(&format!("CREATE TABLE {table} (id SERIAL PRIMARY KEY, slot TIME NOT NULL)"), &[])
        .await
        .unwrap();
    let result = store
        .execute_mediated_query(
            &format!("INSERT INTO {table} (slot) VALUES ('14:00') RETURNING id, slot"),
            &[],
        )
        .await
        .unwrap();

    assert_eq!(result.selected, StoreId::B);
    assert_eq!(result.rows[0]["slot"], "14:00:00");

    store.query(&format!("DROP TABLE {table}"), &[]).await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
#[ignore = "requires two live PostgreSQL instances on ports 5433 and 5434"]
async fn unmapped_type_is_a_clear_error() {
    let store = DualStore::initialize(&both_stores()).await.unwrap();

    let err = store
        .query("SELECT '127.0.0.1'::INET AS addr", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, MediatorError::BothQueriesFailed { .. }));
    let msg = err.to_string();
    assert!(msg.contains("column `addr` has unsupported type INET"), "message was: {msg}");

    let rows = store
        .query("SELECT '127.0.0.1'::INET::TEXT AS addr", &[])
        .await
        .unwrap();
    assert_eq!(rows[0]["addr"], "127.0.0.1/32");

    store.shutdown().await;
}
