//! HTTP surface for the MR-ROBOT dual-store backend.
//!
//! This crate provides an Axum HTTP server that owns the [`DualStore`] and
//! exposes:
//!
//! - **Liveness** (`/api/health`) -- the process is up
//! - **Readiness** (`/api/health/ready`) -- at least one store answers
//! - **Store status** (`/api/admin/db-status`) -- per-store connectivity
//!   for the admin dashboard
//!
//! The CRUD routes of the site are mounted by the application on top of
//! [`build_router`] and reach the database only through
//! [`DualStore::execute_mediated_query`].
//!
//! [`DualStore`]: mrrobot_store::DualStore
//! [`DualStore::execute_mediated_query`]: mrrobot_store::DualStore::execute_mediated_query

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{serve, ServerConfig, ServerError};
pub use state::AppState;
