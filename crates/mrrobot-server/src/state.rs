//! Shared application state.

use std::sync::Arc;

use mrrobot_store::DualStore;

/// State injected into every handler through Axum's `State` extractor.
///
/// The store is constructed once at startup and shared by reference; route
/// handlers never open connections of their own.
#[derive(Clone)]
pub struct AppState {
    /// The dual-store mediator.
    pub store: Arc<DualStore>,
}

impl AppState {
    /// Wrap an initialized store.
    pub fn new(store: DualStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}
