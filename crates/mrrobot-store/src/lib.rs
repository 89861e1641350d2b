//! Dual-store write mediator for the MR-ROBOT site backend.
//!
//! The site keeps two independent `PostgreSQL` instances (store A on AWS,
//! store B on Azure) and mirrors every statement to both. This crate owns
//! the connections to both stores and exposes one entry point the route
//! layer calls in place of a plain single-database query.
//!
//! # Architecture
//!
//! ```text
//! Route handler
//!     |
//!     +-- DualStore::execute_mediated_query(sql, params)
//!         |-- store B  (preferred, StoreHandle -> StoreBackend)
//!         +-- store A  (fallback,  StoreHandle -> StoreBackend)
//! ```
//!
//! Availability wins over consistency: a statement that succeeds on one
//! store is a success for the caller even if the other store failed. There
//! is no reconciliation between the stores.
//!
//! # Modules
//!
//! - [`config`] -- environment-based configuration for both stores
//! - [`mediator`] -- [`DualStore`]: initializer, mediated executor, status
//! - [`backend`] -- enum-dispatched store backends
//! - [`postgres`] -- `PostgreSQL` pool and row decoding
//! - [`stub`] -- in-memory scripted backend
//! - [`query`] -- bind parameters and result rows
//! - [`status`] -- connectivity report types
//! - [`error`] -- shared error types

pub mod backend;
pub mod config;
pub mod error;
mod handle;
pub mod mediator;
pub mod postgres;
pub mod query;
pub mod status;
pub mod stub;

// Re-export primary types for convenience.
pub use backend::StoreBackend;
pub use config::{MediatorConfig, StoreConfig};
pub use error::{BackendError, MediatorError, StoreError};
pub use handle::StoreId;
pub use mediator::{DualStore, MediatedResult, StoreOutcome};
pub use postgres::PgStore;
pub use query::{QueryParam, Row};
pub use status::{DualStoreStatus, StoreStatus};
pub use stub::StubStore;
