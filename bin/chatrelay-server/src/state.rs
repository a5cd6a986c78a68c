//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use chatrelay_core::Relay;

use crate::config::Config;

/// Immutable state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Routes validated requests to the Ollama or CLI backend.
    pub relay: Arc<Relay>,
    /// Chat URL advertised on the landing page when none is given.
    pub chat_url: String,
}
