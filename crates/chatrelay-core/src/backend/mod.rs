//! Backend adapters.
//!
//! Each adapter turns a [`ChatRequest`] into a lazy [`RecordStream`]. The
//! stream owns the adapter's live resource (HTTP response body or child
//! process); dropping it releases that resource.

pub mod cli;
pub mod ollama;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};

use crate::{BridgeError, ChatRequest, OutputRecord};

/// Records in arrival order. Ends after the backend finishes or after the
/// first [`OutputRecord::Error`].
pub type RecordStream = BoxStream<'static, OutputRecord>;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Start a streaming generation. Failures are reported in-band as a
    /// terminal error record, never as a panic or an `Err`.
    async fn stream(&self, request: &ChatRequest) -> RecordStream;

    /// Run a generation to completion and return the full reply.
    async fn complete(&self, request: &ChatRequest) -> Result<String, BridgeError>;
}

pub(crate) fn single_record(record: OutputRecord) -> RecordStream {
    stream::once(async move { record }).boxed()
}
