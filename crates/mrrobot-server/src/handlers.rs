//! Operational endpoint handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/health` | Liveness |
//! | `GET` | `/api/health/ready` | Readiness (any store connected) |
//! | `GET` | `/api/admin/db-status` | Per-store connectivity |

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use mrrobot_store::DualStoreStatus;

use crate::error::ApiError;
use crate::state::AppState;

/// Liveness probe. Always succeeds while the process is serving.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness probe.
///
/// Probes both stores and succeeds if at least one of them answered.
pub async fn ready(State(state): State<Arc<AppState>>) -> Result<Json<DualStoreStatus>, ApiError> {
    let status = state.store.status().await;
    if status.any_connected() {
        Ok(Json(status))
    } else {
        Err(ApiError::Unavailable)
    }
}

/// Per-store connectivity for the admin dashboard.
pub async fn db_status(State(state): State<Arc<AppState>>) -> Json<DualStoreStatus> {
    Json(state.store.status().await)
}
