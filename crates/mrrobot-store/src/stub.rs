//! In-memory scripted store.
//!
//! [`StubStore`] answers every statement with a fixed row set and can be
//! told to fail probes or queries. Clones share state, so a test can keep a
//! clone after handing one to [`DualStore`](crate::DualStore) and flip
//! failures or inspect the executed statements later.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::BackendError;
use crate::query::{QueryParam, Row};

#[derive(Debug, Default)]
struct StubState {
    rows: Vec<Row>,
    unreachable: Option<String>,
    query_failure: Option<String>,
    executed: Vec<(String, Vec<QueryParam>)>,
    closed: bool,
}

/// A scripted store with no database behind it.
#[derive(Debug, Clone, Default)]
pub struct StubStore {
    state: Arc<Mutex<StubState>>,
}

impl StubStore {
    /// A reachable store that returns no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reachable store that answers every statement with `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                rows,
                ..StubState::default()
            })),
        }
    }

    /// A store whose probes and queries all fail with `reason`.
    pub fn unreachable(reason: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                unreachable: Some(reason.to_owned()),
                ..StubState::default()
            })),
        }
    }

    /// Make subsequent statements fail while probes keep succeeding.
    pub async fn fail_queries(&self, reason: &str) {
        self.state.lock().await.query_failure = Some(reason.to_owned());
    }

    /// Make the store unreachable: probes and statements fail.
    pub async fn set_unreachable(&self, reason: &str) {
        self.state.lock().await.unreachable = Some(reason.to_owned());
    }

    /// Clear every scripted failure.
    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.unreachable = None;
        state.query_failure = None;
    }

    /// Statements (and their parameters) received so far, in order.
    pub async fn executed(&self) -> Vec<(String, Vec<QueryParam>)> {
        self.state.lock().await.executed.clone()
    }

    /// Whether [`close`](Self::close) has been called.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub(crate) async fn fetch(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Vec<Row>, BackendError> {
        let mut state = self.state.lock().await;
        state.executed.push((sql.to_owned(), params.to_vec()));

        if let Some(reason) = state.unreachable.as_ref().or(state.query_failure.as_ref()) {
            return Err(BackendError::Stub(reason.clone()));
        }
        if state.closed {
            return Err(BackendError::Stub(String::from("store closed")));
        }
        Ok(state.rows.clone())
    }

    pub(crate) async fn ping(&self) -> Result<(), BackendError> {
        let state = self.state.lock().await;
        match &state.unreachable {
            Some(reason) => Err(BackendError::Stub(reason.clone())),
            None if state.closed => Err(BackendError::Stub(String::from("store closed"))),
            None => Ok(()),
        }
    }

    pub(crate) async fn close(&self) {
        self.state.lock().await.closed = true;
    }
}
