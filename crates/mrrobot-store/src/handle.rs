//! Store identities and per-store handles.
//!
//! A [`StoreHandle`] pairs a backend with its availability flag and the most
//! recent failure seen on it. Handles are created once by
//! [`DualStore`](crate::DualStore) and never leave it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::backend::StoreBackend;
use crate::error::{BackendError, StoreError};
use crate::query::{QueryParam, Row};

/// Identity of one of the two stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreId {
    /// Store A (deployed on AWS), the fallback store.
    A,
    /// Store B (deployed on Azure), the preferred store.
    B,
}

impl StoreId {
    /// Result selection order: the first store in this list that succeeded
    /// provides the returned rows.
    pub const PREFERENCE: [Self; 2] = [Self::B, Self::A];

    /// Environment key prefix for this store's configuration.
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::A => "STORE_A",
            Self::B => "STORE_B",
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("store A"),
            Self::B => f.write_str("store B"),
        }
    }
}

/// A configured store: backend, availability, and last observed errors.
pub(crate) struct StoreHandle {
    id: StoreId,
    backend: StoreBackend,
    available: AtomicBool,
    probe_error: RwLock<Option<String>>,
    last_probe: RwLock<Option<Instant>>,
    last_query_error: RwLock<Option<String>>,
}

impl StoreHandle {
    /// Wrap a backend. The handle starts unavailable until probed.
    pub(crate) fn new(id: StoreId, backend: StoreBackend) -> Self {
        Self {
            id,
            backend,
            available: AtomicBool::new(false),
            probe_error: RwLock::new(None),
            last_probe: RwLock::new(None),
            last_query_error: RwLock::new(None),
        }
    }

    pub(crate) const fn kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub(crate) fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Run a round-trip probe without touching any handle state.
    ///
    /// Returns the probe error, if any.
    pub(crate) async fn ping(&self, timeout: Duration) -> Option<String> {
        let result = match tokio::time::timeout(timeout, self.backend.ping()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(BackendError::Timeout(timeout)),
        };
        result.err().map(|e| e.to_string())
    }

    /// Run a round-trip probe and update the availability flag.
    ///
    /// Returns the probe error, if any.
    pub(crate) async fn probe(&self, timeout: Duration) -> Option<String> {
        *self.last_probe.write().await = Some(Instant::now());
        let error = self.ping(timeout).await;
        self.available.store(error.is_none(), Ordering::Release);
        self.probe_error.write().await.clone_from(&error);
        error
    }

    /// Claim the next re-probe of an unavailable handle.
    ///
    /// Returns `true` at most once per `interval`; concurrent callers that
    /// lose the race get `false` and skip the store as before.
    pub(crate) async fn reprobe_due(&self, interval: Duration) -> bool {
        let mut last_probe = self.last_probe.write().await;
        let due = last_probe.is_none_or(|at| at.elapsed() >= interval);
        if due {
            *last_probe = Some(Instant::now());
        }
        due
    }

    /// Execute a statement if the handle is available.
    ///
    /// Unavailable handles are skipped without touching the backend.
    pub(crate) async fn execute(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Vec<Row>, StoreError> {
        if !self.is_available() {
            let reason = self
                .probe_error
                .read()
                .await
                .clone()
                .unwrap_or_else(|| String::from("not probed"));
            return Err(StoreError::Unavailable {
                store: self.id,
                reason,
            });
        }

        match self.backend.fetch(sql, params).await {
            Ok(rows) => {
                *self.last_query_error.write().await = None;
                Ok(rows)
            }
            Err(source) => {
                *self.last_query_error.write().await = Some(source.to_string());
                Err(StoreError::QueryFailed {
                    store: self.id,
                    source,
                })
            }
        }
    }

    pub(crate) async fn probe_error(&self) -> Option<String> {
        self.probe_error.read().await.clone()
    }

    pub(crate) async fn last_query_error(&self) -> Option<String> {
        self.last_query_error.read().await.clone()
    }

    /// Close the backend's connections.
    pub(crate) async fn close(&self) {
        self.backend.close().await;
    }
}
