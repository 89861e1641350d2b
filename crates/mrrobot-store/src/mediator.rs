//! The dual-store mediator.
//!
//! [`DualStore`] owns one optional handle per store and mirrors every
//! statement to both of them, returning a single result chosen by a fixed
//! preference (store B, then store A). It is a best-effort mirror, not a
//! replicated log:
//!
//! - A statement that succeeds on one store and fails on the other leaves
//!   the stores diverged. The divergence is logged; nothing is rolled back.
//! - Rows from the two stores are never merged. The selected store's rows
//!   are returned as-is and the other store's outcome is kept only for
//!   diagnostics.
//! - Only an aggregate failure (no store produced a result) is returned to
//!   the caller.
//!
//! ```text
//! execute_mediated_query(sql, params)
//!     |
//!     +-- store B (if available) --+
//!     |                            +-- join --> select B, else A, else error
//!     +-- store A (if available) --+
//! ```
//!
//! Both per-store statements run concurrently and both outcomes are
//! collected before the selection policy runs.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::StoreBackend;
use crate::config::{DEFAULT_REPROBE_INTERVAL_MS, MediatorConfig};
use crate::error::{MediatorError, StoreError};
use crate::handle::{StoreHandle, StoreId};
use crate::postgres::PgStore;
use crate::query::{QueryParam, Row};
use crate::status::{DualStoreStatus, StoreStatus};

/// What happened on one store during a mediated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StoreOutcome {
    /// The statement ran and returned `rows` rows.
    Succeeded {
        /// Number of rows the store returned.
        rows: usize,
    },
    /// The statement was sent and failed.
    Failed {
        /// The store's error message.
        error: String,
    },
    /// The statement was not sent (store unconfigured or unavailable).
    Skipped {
        /// Why the store was skipped.
        reason: String,
    },
}

/// The result of a mediated call.
#[derive(Debug, Clone)]
pub struct MediatedResult {
    /// Rows from the selected store only.
    pub rows: Vec<Row>,
    /// The store whose rows were returned.
    pub selected: StoreId,
    /// Outcome on every store, selected or not.
    pub outcomes: BTreeMap<StoreId, StoreOutcome>,
}

/// Owner of both store handles.
///
/// Construct once at process start with [`DualStore::initialize`], share
/// it (typically behind an [`Arc`](std::sync::Arc)) with every route
/// handler, and call [`DualStore::shutdown`] once at process exit.
pub struct DualStore {
    store_a: Option<StoreHandle>,
    store_b: Option<StoreHandle>,
    probe_timeout: Duration,
    reprobe_interval: Duration,
}

impl DualStore {
    /// Build `PostgreSQL` pools for every configured store and probe them.
    ///
    /// A store that fails its probe is marked unavailable without affecting
    /// the other. If no store answers, an aggregate error is logged but the
    /// mediator is still returned; use [`DualStore::ensure_available`] to
    /// decide whether that is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::ConfigurationMissing`] if neither store is
    /// configured.
    pub async fn initialize(config: &MediatorConfig) -> Result<Self, MediatorError> {
        let store_a = config
            .store_a
            .as_ref()
            .map(|c| StoreBackend::from(PgStore::connect_lazy(c)));
        let store_b = config
            .store_b
            .as_ref()
            .map(|c| StoreBackend::from(PgStore::connect_lazy(c)));

        Self::from_backends(store_a, store_b, config.probe_timeout)
            .await
            .map(|store| store.with_reprobe_interval(config.reprobe_interval))
    }

    /// Build the mediator from already-constructed backends and probe them.
    ///
    /// Unavailable stores are re-probed at most every 5 seconds; see
    /// [`DualStore::with_reprobe_interval`].
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::ConfigurationMissing`] if both backends are
    /// `None`.
    pub async fn from_backends(
        store_a: Option<StoreBackend>,
        store_b: Option<StoreBackend>,
        probe_timeout: Duration,
    ) -> Result<Self, MediatorError> {
        if store_a.is_none() && store_b.is_none() {
            return Err(MediatorError::ConfigurationMissing);
        }

        let store = Self {
            store_a: store_a.map(|backend| StoreHandle::new(StoreId::A, backend)),
            store_b: store_b.map(|backend| StoreHandle::new(StoreId::B, backend)),
            probe_timeout,
            reprobe_interval: Duration::from_millis(DEFAULT_REPROBE_INTERVAL_MS),
        };

        tokio::join!(
            store.probe_at_startup(StoreId::A),
            store.probe_at_startup(StoreId::B),
        );

        if let Err(e) = store.ensure_available().await {
            error!(error = %e, "No store reachable at startup");
        }

        Ok(store)
    }

    async fn probe_at_startup(&self, id: StoreId) {
        let Some(handle) = self.handle(id) else {
            info!(store = %id, "Store not configured, skipping");
            return;
        };

        match handle.probe(self.probe_timeout).await {
            None => info!(store = %id, backend = handle.kind(), "Store connected"),
            Some(e) => warn!(
                store = %id,
                backend = handle.kind(),
                error = %e,
                "Store unavailable at startup"
            ),
        }
    }

    /// Set the minimum delay between re-probes of an unavailable store.
    ///
    /// A store that failed its startup probe is probed again before a
    /// statement would skip it, at most once per `interval`.
    #[must_use]
    pub const fn with_reprobe_interval(mut self, interval: Duration) -> Self {
        self.reprobe_interval = interval;
        self
    }

    const fn handle(&self, id: StoreId) -> Option<&StoreHandle> {
        match id {
            StoreId::A => self.store_a.as_ref(),
            StoreId::B => self.store_b.as_ref(),
        }
    }

    /// Whether at least one store is currently marked available.
    pub fn has_available_store(&self) -> bool {
        [&self.store_a, &self.store_b]
            .into_iter()
            .flatten()
            .any(StoreHandle::is_available)
    }

    /// Fail if no store is currently marked available.
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::BothStoresUnavailable`] naming why each
    /// store is unusable.
    pub async fn ensure_available(&self) -> Result<(), MediatorError> {
        if self.has_available_store() {
            return Ok(());
        }
        Err(MediatorError::BothStoresUnavailable {
            store_a: self.skip_reason(StoreId::A).await,
            store_b: self.skip_reason(StoreId::B).await,
        })
    }

    async fn skip_reason(&self, id: StoreId) -> String {
        match self.handle(id) {
            None => String::from("not configured"),
            Some(handle) => handle
                .probe_error()
                .await
                .unwrap_or_else(|| String::from("unavailable")),
        }
    }

    /// Run one statement against every available store and return the
    /// preferred store's result.
    ///
    /// The statement is passed through untouched. Per-store failures are
    /// logged and recorded in [`MediatedResult::outcomes`]; a partial
    /// failure is not an error.
    ///
    /// # Errors
    ///
    /// - [`MediatorError::BothStoresUnavailable`] if no store could be asked.
    /// - [`MediatorError::BothQueriesFailed`] if every attempted statement
    ///   failed.
    pub async fn execute_mediated_query(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<MediatedResult, MediatorError> {
        let (result_b, result_a) = tokio::join!(
            self.run_on(StoreId::B, sql, params),
            self.run_on(StoreId::A, sql, params),
        );

        let mut attempts = BTreeMap::new();
        attempts.insert(StoreId::A, result_a);
        attempts.insert(StoreId::B, result_b);
        select_result(attempts)
    }

    /// Like [`execute_mediated_query`](Self::execute_mediated_query) but
    /// returns only the rows.
    ///
    /// # Errors
    ///
    /// Same as [`execute_mediated_query`](Self::execute_mediated_query).
    pub async fn query(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, MediatorError> {
        self.execute_mediated_query(sql, params)
            .await
            .map(|result| result.rows)
    }

    async fn run_on(
        &self,
        id: StoreId,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Vec<Row>, StoreError> {
        let Some(handle) = self.handle(id) else {
            return Err(StoreError::NotConfigured { store: id });
        };

        if !handle.is_available() && handle.reprobe_due(self.reprobe_interval).await {
            match handle.probe(self.probe_timeout).await {
                None => info!(store = %id, "Store reachable again"),
                Some(e) => debug!(store = %id, error = %e, "Store still unavailable"),
            }
        }

        let result = handle.execute(sql, params).await;
        if let Err(e) = &result {
            if e.is_skip() {
                debug!(store = %id, error = %e, "Store skipped");
            } else {
                warn!(store = %id, error = %e, "Store query failed");
            }
        }
        result
    }

    /// Probe every configured store and report connectivity.
    ///
    /// Each report reflects the probe just issued. Probes do not change
    /// which stores statements are sent to. Unconfigured stores are reported
    /// as disconnected without a probe.
    pub async fn status(&self) -> DualStoreStatus {
        let (store_a, store_b) = tokio::join!(
            self.probe_status(StoreId::A),
            self.probe_status(StoreId::B),
        );
        DualStoreStatus { store_a, store_b }
    }

    async fn probe_status(&self, id: StoreId) -> StoreStatus {
        let Some(handle) = self.handle(id) else {
            return StoreStatus::not_configured();
        };

        let error = handle.ping(self.probe_timeout).await;
        if let Some(e) = &error {
            debug!(store = %id, error = %e, "Status probe failed");
        }

        StoreStatus {
            configured: true,
            connected: error.is_none(),
            error,
            last_query_error: handle.last_query_error().await,
        }
    }

    /// Close both pools, waiting for in-flight statements to finish.
    pub async fn shutdown(&self) {
        tokio::join!(self.close_store(StoreId::A), self.close_store(StoreId::B));
        info!("Store pools closed");
    }

    async fn close_store(&self, id: StoreId) {
        if let Some(handle) = self.handle(id) {
            handle.close().await;
            debug!(store = %id, "Store pool closed");
        }
    }
}

/// Apply the selection policy to the per-store results.
///
/// The first store in [`StoreId::PREFERENCE`] that succeeded wins. Rows are
/// never merged across stores.
fn select_result(
    mut attempts: BTreeMap<StoreId, Result<Vec<Row>, StoreError>>,
) -> Result<MediatedResult, MediatorError> {
    let outcomes: BTreeMap<StoreId, StoreOutcome> = attempts
        .iter()
        .map(|(id, result)| (*id, outcome_of(result)))
        .collect();

    let mut failures = BTreeMap::new();
    let winner = StoreId::PREFERENCE
        .into_iter()
        .find_map(|id| match attempts.remove(&id)? {
            Ok(rows) => Some((id, rows)),
            Err(e) => {
                failures.insert(id, e);
                None
            }
        });

    let Some((selected, rows)) = winner else {
        return Err(aggregate_failure(&failures));
    };

    log_divergence(selected, &outcomes);

    Ok(MediatedResult {
        rows,
        selected,
        outcomes,
    })
}

fn outcome_of(result: &Result<Vec<Row>, StoreError>) -> StoreOutcome {
    match result {
        Ok(rows) => StoreOutcome::Succeeded { rows: rows.len() },
        Err(e) if e.is_skip() => StoreOutcome::Skipped {
            reason: e.to_string(),
        },
        Err(e) => StoreOutcome::Failed {
            error: e.to_string(),
        },
    }
}

fn aggregate_failure(failures: &BTreeMap<StoreId, StoreError>) -> MediatorError {
    let message = |id: StoreId| {
        failures
            .get(&id)
            .map_or_else(|| String::from("no result"), ToString::to_string)
    };

    if failures.values().all(StoreError::is_skip) {
        MediatorError::BothStoresUnavailable {
            store_a: message(StoreId::A),
            store_b: message(StoreId::B),
        }
    } else {
        MediatorError::BothQueriesFailed {
            store_a: message(StoreId::A),
            store_b: message(StoreId::B),
        }
    }
}

/// Log when the non-selected store disagrees with the selected one.
fn log_divergence(selected: StoreId, outcomes: &BTreeMap<StoreId, StoreOutcome>) {
    let Some(StoreOutcome::Succeeded { rows: selected_rows }) = outcomes.get(&selected) else {
        return;
    };

    for (id, outcome) in outcomes.iter().filter(|(id, _)| **id != selected) {
        match outcome {
            StoreOutcome::Failed { error } => warn!(
                selected = %selected,
                diverged = %id,
                error = error.as_str(),
                "Statement succeeded on one store only, stores may have diverged"
            ),
            StoreOutcome::Succeeded { rows } if rows != selected_rows => warn!(
                selected = %selected,
                selected_rows,
                other = %id,
                other_rows = rows,
                "Stores returned different row counts"
            ),
            StoreOutcome::Succeeded { .. } | StoreOutcome::Skipped { .. } => {}
        }
    }
}
