//! Store backend dispatch.
//!
//! Uses an enum rather than a trait object because async methods are not
//! dyn-compatible. Each variant owns its own connections; nothing is shared
//! between the two stores.

use crate::error::BackendError;
use crate::postgres::PgStore;
use crate::query::{QueryParam, Row};
use crate::stub::StubStore;

/// A relational store the mediator can send statements to.
pub enum StoreBackend {
    /// A `PostgreSQL` instance behind its own connection pool.
    Postgres(PgStore),
    /// An in-memory scripted store.
    Stub(StubStore),
}

impl StoreBackend {
    /// Execute a statement and return every row it produced.
    ///
    /// Statements that produce no rows (plain `INSERT`, `UPDATE`, DDL)
    /// return an empty vector.
    pub async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, BackendError> {
        match self {
            Self::Postgres(store) => store.fetch(sql, params).await,
            Self::Stub(store) => store.fetch(sql, params).await,
        }
    }

    /// Issue a trivial round-trip (`SELECT 1`).
    pub async fn ping(&self) -> Result<(), BackendError> {
        match self {
            Self::Postgres(store) => store.ping().await,
            Self::Stub(store) => store.ping().await,
        }
    }

    /// Close all connections, waiting for in-flight statements.
    pub async fn close(&self) {
        match self {
            Self::Postgres(store) => store.close().await,
            Self::Stub(store) => store.close().await,
        }
    }

    /// Human-readable backend kind for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Stub(_) => "stub",
        }
    }
}

impl From<PgStore> for StoreBackend {
    fn from(store: PgStore) -> Self {
        Self::Postgres(store)
    }
}

impl From<StubStore> for StoreBackend {
    fn from(store: StubStore) -> Self {
        Self::Stub(store)
    }
}
