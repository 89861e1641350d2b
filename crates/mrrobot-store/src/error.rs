//! Error types for the dual-store mediator.
//!
//! Failures are layered the same way the mediator sees them:
//!
//! - [`BackendError`] -- a single backend call failed (driver error,
//!   timeout, scripted stub failure).
//! - [`StoreError`] -- a per-store failure tagged with the store identity.
//!   These are recorded and logged but never returned to callers of
//!   [`DualStore::execute_mediated_query`](crate::DualStore::execute_mediated_query).
//! - [`MediatorError`] -- what callers actually see: configuration problems
//!   at startup, or an aggregate failure when no store produced a result.

use std::time::Duration;

use crate::handle::StoreId;

/// A single backend operation failed.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The `PostgreSQL` driver returned an error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// The operation did not finish within the allotted time.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A result column has a type with no JSON mapping.
    #[error("column `{column}` has unsupported type {type_name}")]
    UnsupportedType {
        /// Column name as reported by the server.
        column: String,
        /// `PostgreSQL` type name of the column.
        type_name: String,
    },

    /// A scripted failure from a [`StubStore`](crate::StubStore).
    #[error("stub failure: {0}")]
    Stub(String),
}

/// A failure attributed to one specific store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store has no configuration and therefore no handle.
    #[error("{store} is not configured")]
    NotConfigured {
        /// The store in question.
        store: StoreId,
    },

    /// The store is configured but its last probe did not succeed.
    #[error("{store} is unavailable: {reason}")]
    Unavailable {
        /// The store in question.
        store: StoreId,
        /// Why the store was marked unavailable.
        reason: String,
    },

    /// The statement was sent to the store and failed there.
    #[error("{store} query failed: {source}")]
    QueryFailed {
        /// The store in question.
        store: StoreId,
        /// The underlying backend error.
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    /// The store this error is attributed to.
    pub const fn store(&self) -> StoreId {
        match self {
            Self::NotConfigured { store }
            | Self::Unavailable { store, .. }
            | Self::QueryFailed { store, .. } => *store,
        }
    }

    /// Whether the statement was never attempted on this store.
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::NotConfigured { .. } | Self::Unavailable { .. })
    }
}

/// Errors surfaced to callers of the mediator.
#[derive(Debug, thiserror::Error)]
pub enum MediatorError {
    /// A configuration value is malformed or incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    /// Neither store has the connection fields required to build a handle.
    #[error("configuration missing: neither store A nor store B is configured")]
    ConfigurationMissing,

    /// No store could be asked: both are unconfigured or unavailable.
    #[error("both stores unavailable (store A: {store_a}; store B: {store_b})")]
    BothStoresUnavailable {
        /// Why store A was skipped.
        store_a: String,
        /// Why store B was skipped.
        store_b: String,
    },

    /// No store returned a result: every attempted statement failed.
    #[error("both stores failed (store A: {store_a}; store B: {store_b})")]
    BothQueriesFailed {
        /// Store A's failure or skip reason.
        store_a: String,
        /// Store B's failure or skip reason.
        store_b: String,
    },
}
