//! Axum router construction.
//!
//! Assembles the operational routes into a single [`Router`] with CORS and
//! request tracing enabled.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the router.
///
/// The router includes:
/// - `GET /api/health` -- liveness
/// - `GET /api/health/ready` -- readiness
/// - `GET /api/admin/db-status` -- store status
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/health/ready", get(handlers::ready))
        .route("/api/admin/db-status", get(handlers::db_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
