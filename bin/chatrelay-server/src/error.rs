//! Unified server error type.
//!
//! Handlers return `Result<T, ServerError>`; the [`IntoResponse`] impl turns
//! every variant into a `{"error": ...}` JSON body with a matching status.
//! Backend failures are reported verbatim with 502 so callers can tell an
//! unreachable model from a bad request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chatrelay_core::BridgeError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the relay core.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The caller sent a malformed request body.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            ServerError::Bridge(BridgeError::Validation(m)) | ServerError::BadRequest(m) => {
                (StatusCode::BAD_REQUEST, m)
            }
            ServerError::Bridge(e) => {
                warn!(error = %e, "backend failure");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
