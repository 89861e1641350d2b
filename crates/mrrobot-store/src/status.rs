//! Connectivity report produced by [`DualStore::status`](crate::DualStore::status).

use serde::Serialize;

/// Connectivity of a single store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    /// Whether the store has a handle at all.
    pub configured: bool,
    /// Whether the probe just issued succeeded.
    pub connected: bool,
    /// The probe error, if the probe failed.
    pub error: Option<String>,
    /// The most recent statement error on this store since its last success.
    pub last_query_error: Option<String>,
}

impl StoreStatus {
    /// Status of a store that has no configuration.
    pub const fn not_configured() -> Self {
        Self {
            configured: false,
            connected: false,
            error: None,
            last_query_error: None,
        }
    }
}

/// Connectivity of both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DualStoreStatus {
    /// Store A.
    pub store_a: StoreStatus,
    /// Store B.
    pub store_b: StoreStatus,
}

impl DualStoreStatus {
    /// Whether at least one store answered its probe.
    pub const fn any_connected(&self) -> bool {
        self.store_a.connected || self.store_b.connected
    }
}
