//! Behavioral tests for [`DualStore`] using scripted in-memory stores.
//!
//! These run without any database: every store is a [`StubStore`] whose
//! rows and failures are set per test.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use mrrobot_store::{
    DualStore, MediatorError, QueryParam, Row, StoreBackend, StoreId, StoreOutcome, StubStore,
};
use serde_json::json;

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

async fn dual(store_a: Option<StubStore>, store_b: Option<StubStore>) -> DualStore {
    DualStore::from_backends(
        store_a.map(StoreBackend::from),
        store_b.map(StoreBackend::from),
        PROBE_TIMEOUT,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn returns_store_b_rows_when_both_succeed() {
    let store_a = StubStore::with_rows(vec![row(json!({"id": 1, "name": "fromA"}))]);
    let store_b = StubStore::with_rows(vec![row(json!({"id": 1, "name": "fromB"}))]);
    let store = dual(Some(store_a.clone()), Some(store_b.clone())).await;

    let result = store
        .execute_mediated_query(
            "SELECT id, name FROM services WHERE id = $1",
            &[QueryParam::from(1_i64)],
        )
        .await
        .unwrap();

    assert_eq!(result.selected, StoreId::B);
    assert_eq!(result.rows, vec![row(json!({"id": 1, "name": "fromB"}))]);

    // The statement was mirrored to both stores with the same parameters.
    for stub in [&store_a, &store_b] {
        let executed = stub.executed().await;
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].0, "SELECT id, name FROM services WHERE id = $1");
        assert_eq!(executed[0].1, vec![QueryParam::Int(1)]);
    }
}

#[tokio::test]
async fn falls_back_to_store_a_when_b_unavailable() {
    let store_a = StubStore::with_rows(vec![row(json!({"id": 7, "title": "Screen repair"}))]);
    let store_b = StubStore::unreachable("connection refused");
    let store = dual(Some(store_a), Some(store_b.clone())).await;

    let rows = store.query("SELECT * FROM articles", &[]).await.unwrap();

    assert_eq!(rows, vec![row(json!({"id": 7, "title": "Screen repair"}))]);
    // An unavailable store is skipped, not queried.
    assert!(store_b.executed().await.is_empty());
}

#[tokio::test]
async fn partial_write_failure_is_not_an_error() {
    let store_a = StubStore::with_rows(vec![row(json!({"id": 12}))]);
    let store_b = StubStore::new();
    store_b.fail_queries("duplicate key value violates unique constraint").await;
    let store = dual(Some(store_a), Some(store_b)).await;

    let result = store
        .execute_mediated_query(
            "INSERT INTO bookings (name, email) VALUES ($1, $2) RETURNING id",
            &[QueryParam::from("Elliot"), QueryParam::from("elliot@example.com")],
        )
        .await
        .unwrap();

    assert_eq!(result.selected, StoreId::A);
    assert_eq!(result.rows, vec![row(json!({"id": 12}))]);
    assert!(matches!(
        &result.outcomes[&StoreId::B],
        StoreOutcome::Failed { error } if error.contains("duplicate key")
    ));

    // The failure stays visible through the status report.
    let status = store.status().await;
    assert!(status.store_b.connected);
    assert!(status
        .store_b
        .last_query_error
        .is_some_and(|e| e.contains("duplicate key")));
}

#[tokio::test]
async fn both_unavailable_names_both_stores() {
    let store = dual(
        Some(StubStore::unreachable("timeout connecting to aws")),
        Some(StubStore::unreachable("timeout connecting to azure")),
    )
    .await;

    assert!(store.ensure_available().await.is_err());

    let err = store.query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(err, MediatorError::BothStoresUnavailable { .. }));
    let msg = err.to_string();
    assert!(msg.contains("store A"), "message was: {msg}");
    assert!(msg.contains("store B"), "message was: {msg}");
}

#[tokio::test]
async fn both_queries_failing_embeds_both_errors() {
    let store_a = StubStore::new();
    let store_b = StubStore::new();
    store_a.fail_queries("aws: relation \"posts\" does not exist").await;
    store_b.fail_queries("azure: relation \"posts\" does not exist").await;
    let store = dual(Some(store_a), Some(store_b)).await;

    let err = store.query("SELECT * FROM posts", &[]).await.unwrap_err();

    assert!(matches!(err, MediatorError::BothQueriesFailed { .. }));
    let msg = err.to_string();
    assert!(msg.contains("aws: relation"));
    assert!(msg.contains("azure: relation"));
}

#[tokio::test]
async fn status_probe_is_idempotent() {
    let store = dual(
        Some(StubStore::new()),
        Some(StubStore::unreachable("no route to host")),
    )
    .await;

    let first = store.status().await;
    let second = store.status().await;

    assert_eq!(first.store_a.connected, second.store_a.connected);
    assert_eq!(first.store_b.connected, second.store_b.connected);
    assert!(first.store_a.connected);
    assert!(!first.store_b.connected);
    assert_eq!(first.store_b.error.as_deref(), Some("stub failure: no route to host"));
}

#[tokio::test]
async fn never_merges_rows_across_stores() {
    let store_a = StubStore::with_rows(vec![
        row(json!({"id": 1})),
        row(json!({"id": 2})),
        row(json!({"id": 3})),
    ]);
    let store_b = StubStore::with_rows(vec![row(json!({"id": 1})), row(json!({"id": 2}))]);
    let store = dual(Some(store_a), Some(store_b)).await;

    let result = store
        .execute_mediated_query("SELECT id FROM contacts", &[])
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.outcomes[&StoreId::A], StoreOutcome::Succeeded { rows: 3 });
    assert_eq!(result.outcomes[&StoreId::B], StoreOutcome::Succeeded { rows: 2 });
}

#[tokio::test]
async fn only_store_a_configured_routes_to_a() {
    let store_a = StubStore::with_rows(vec![row(json!({"ok": true}))]);
    let store = dual(Some(store_a.clone()), None).await;

    for _ in 0..3 {
        let result = store
            .execute_mediated_query("SELECT true AS ok", &[])
            .await
            .unwrap();
        assert_eq!(result.selected, StoreId::A);
        assert!(matches!(
            &result.outcomes[&StoreId::B],
            StoreOutcome::Skipped { reason } if reason.contains("not configured")
        ));
    }
    assert_eq!(store_a.executed().await.len(), 3);

    let status = store.status().await;
    assert!(!status.store_b.configured);
    assert!(!status.store_b.connected);
    assert!(status.store_b.error.is_none());
}

#[tokio::test]
async fn no_backends_is_configuration_missing() {
    let result = DualStore::from_backends(None, None, PROBE_TIMEOUT).await;
    assert!(matches!(result, Err(MediatorError::ConfigurationMissing)));
}

#[tokio::test]
async fn store_down_at_startup_is_reprobed_before_statements() {
    let store_a = StubStore::with_rows(vec![row(json!({"from": "A"}))]);
    let store_b = StubStore::with_rows(vec![row(json!({"from": "B"}))]);
    store_b.set_unreachable("starting up").await;
    let store = dual(Some(store_a), Some(store_b.clone()))
        .await
        .with_reprobe_interval(Duration::ZERO);

    let rows = store.query("SELECT 'x' AS from", &[]).await.unwrap();
    assert_eq!(rows, vec![row(json!({"from": "A"}))]);

    store_b.clear_failures().await;

    let result = store
        .execute_mediated_query("SELECT 'x' AS from", &[])
        .await
        .unwrap();
    assert_eq!(result.selected, StoreId::B);
    assert_eq!(result.rows, vec![row(json!({"from": "B"}))]);
    assert_eq!(store_b.executed().await.len(), 1);
}

#[tokio::test]
async fn reprobe_waits_for_interval_and_ignores_status() {
    let store_a = StubStore::with_rows(vec![row(json!({"from": "A"}))]);
    let store_b = StubStore::unreachable("starting up");
    let store = dual(Some(store_a), Some(store_b.clone()))
        .await
        .with_reprobe_interval(Duration::from_secs(3600));

    store_b.clear_failures().await;
    assert!(store.status().await.store_b.connected);

    let result = store.execute_mediated_query("SELECT 1", &[]).await.unwrap();
    assert_eq!(result.selected, StoreId::A);
    assert!(matches!(result.outcomes[&StoreId::B], StoreOutcome::Skipped { .. }));
    assert!(store_b.executed().await.is_empty());
}

#[tokio::test]
async fn transient_status_failure_does_not_stop_mirroring() {
    let store_a = StubStore::with_rows(vec![row(json!({"id": 1}))]);
    let store_b = StubStore::with_rows(vec![row(json!({"id": 1}))]);
    let store = dual(Some(store_a.clone()), Some(store_b.clone())).await;

    store_b.set_unreachable("transient blip").await;
    let status = store.status().await;
    assert!(!status.store_b.connected);
    assert_eq!(status.store_b.error.as_deref(), Some("stub failure: transient blip"));
    store_b.clear_failures().await;

    let result = store
        .execute_mediated_query(
            "INSERT INTO bookings (slot) VALUES ($1) RETURNING id",
            &[QueryParam::from("14:00")],
        )
        .await
        .unwrap();

    assert_eq!(result.selected, StoreId::B);
    assert_eq!(result.outcomes[&StoreId::B], StoreOutcome::Succeeded { rows: 1 });
    assert_eq!(store_a.executed().await.len(), 1);
    assert_eq!(store_b.executed().await.len(), 1);
}

#[tokio::test]
async fn shutdown_closes_both_stores() {
    let store_a = StubStore::new();
    let store_b = StubStore::new();
    let store = dual(Some(store_a.clone()), Some(store_b.clone())).await;

    store.shutdown().await;

    assert!(store_a.is_closed().await);
    assert!(store_b.is_closed().await);
    assert!(!store.status().await.any_connected());

    let err = store.query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(err, MediatorError::BothQueriesFailed { .. }));
    assert!(err.to_string().contains("store closed"));
}
