//! Ollama HTTP adapter.
//!
//! Requests without history go to `/api/generate` with the message as the
//! prompt; requests with history go to `/api/chat` with the full turn list.
//! In streaming mode the body is NDJSON, one fragment per line.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{single_record, ChatBackend, RecordStream};
use crate::error::describe;
use crate::normalizer::{decode_fragment, Decoded, LineBuffer};
use crate::{BridgeError, ChatRequest, OutputRecord, Turn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gpt-oss:20b";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest silence tolerated between two body chunks of a stream.
const STREAM_READ_TIMEOUT: Duration = Duration::from_secs(600);
/// Whole-request budget for non-streaming calls.
const COMPLETE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<Turn>,
    stream: bool,
}

pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(STREAM_READ_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Transport(describe(&e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn prepare(&self, request: &ChatRequest, stream: bool) -> RequestBuilder {
        let model = self.config.model.as_str();
        if request.history.is_empty() {
            self.client.post(self.endpoint("generate")).json(&GenerateBody {
                model,
                prompt: &request.message,
                stream,
            })
        } else {
            self.client.post(self.endpoint("chat")).json(&ChatBody {
                model,
                messages: request.conversation(),
                stream,
            })
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn stream(&self, request: &ChatRequest) -> RecordStream {
        debug!(
            model = %self.config.model,
            turns = request.history.len(),
            "opening ollama stream"
        );
        let response = self
            .prepare(request, true)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match response {
            Ok(response) => fragment_stream(Box::pin(response.bytes_stream())),
            Err(e) => {
                let message = describe(&e);
                warn!(error = %message, "ollama stream could not be opened");
                single_record(OutputRecord::error(BridgeError::Transport(message).to_string()))
            }
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BridgeError> {
        let transport = |e: reqwest::Error| BridgeError::Transport(describe(&e));
        let response = self
            .prepare(request, false)
            .timeout(COMPLETE_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport)?;
        let body: Value = response.json().await.map_err(transport)?;
        Ok(reply_text(&body))
    }
}

/// `/api/generate` answers with `response`, `/api/chat` with
/// `message.content`.
fn reply_text(body: &Value) -> String {
    body.get("response")
        .and_then(Value::as_str)
        .or_else(|| {
            body.get("message")
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str)
        })
        .unwrap_or_default()
        .to_owned()
}

struct FragmentState<S> {
    body: S,
    lines: LineBuffer,
    eof: bool,
    finished: bool,
}

/// Decode a chunked NDJSON body into records.
///
/// Reading stops at the first fragment with `done: true`; the body (and so
/// the connection) is released as soon as the returned stream is dropped or
/// exhausted. A body error becomes one terminal error record.
pub fn fragment_stream<S, E>(body: S) -> RecordStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::error::Error + Send + 'static,
{
    let state = FragmentState {
        body,
        lines: LineBuffer::new(),
        eof: false,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }
            let line = match st.lines.next_line() {
                Some(line) => line,
                None if st.eof => st.lines.finish()?,
                None => {
                    match st.body.next().await {
                        Some(Ok(chunk)) => st.lines.push(&chunk),
                        Some(Err(e)) => {
                            st.finished = true;
                            let message = describe(&e);
                            warn!(error = %message, "ollama stream interrupted");
                            let record = OutputRecord::error(
                                BridgeError::Transport(message).to_string(),
                            );
                            return Some((record, st));
                        }
                        None => st.eof = true,
                    }
                    continue;
                }
            };

            match decode_fragment(&line) {
                Decoded::Noise => continue,
                Decoded::Fragment { text, done } => {
                    if done {
                        debug!("ollama signalled done");
                        st.finished = true;
                    }
                    if let Some(text) = text {
                        return Some((OutputRecord::Response(text), st));
                    }
                }
            }
        }
    })
    .boxed()
}
