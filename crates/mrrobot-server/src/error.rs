//! Error types for the HTTP layer.
//!
//! [`ApiError`] converts into an Axum response. Store identities and driver
//! messages are logged but never sent to clients; they only ever see a
//! generic service error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mrrobot_store::MediatorError;

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No store can currently serve requests.
    #[error("service unavailable")]
    Unavailable,

    /// The store layer failed.
    #[error("store error: {0}")]
    Store(#[from] MediatorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unavailable
            | Self::Store(
                MediatorError::BothStoresUnavailable { .. }
                | MediatorError::ConfigurationMissing,
            ) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!(error = %self, status = status.as_u16(), "Request failed");

        let body = serde_json::json!({
            "error": "The service is temporarily unavailable. Please try again later.",
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
