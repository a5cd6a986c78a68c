//! Streaming bridge between a chat caller and one of two LLM backends.
//!
//! A request is validated and routed ([`router`]), handed to a backend
//! adapter ([`backend::ollama`] or [`backend::cli`]) that produces
//! [`OutputRecord`]s, and pumped onto a bounded channel as NDJSON lines by
//! the [`writer`].
//!
//! ```rust,no_run
//! use chatrelay_core::backend::{cli::CliConfig, ollama::OllamaConfig};
//! use chatrelay_core::{router, writer, Relay};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), chatrelay_core::BridgeError> {
//! let relay = Relay::from_config(OllamaConfig::default(), CliConfig::default())?;
//! let request = router::route(Some("Hello".into()), None, Some("ollama"))?;
//! let records = relay.stream(&request).await;
//! let _body = writer::ndjson_body(records, writer::DEFAULT_BUFFER);
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod error;
pub mod normalizer;
pub mod router;
mod types;
pub mod writer;

pub use backend::{ChatBackend, RecordStream};
pub use error::BridgeError;
pub use router::Relay;
pub use types::{ChatRequest, OutputRecord, Provider, Turn};
