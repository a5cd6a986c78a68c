//! Request validation and backend selection.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::cli::{CliBackend, CliConfig};
use crate::backend::ollama::{OllamaBackend, OllamaConfig};
use crate::{BridgeError, ChatBackend, ChatRequest, Provider, RecordStream, Turn};

/// Longer messages are truncated, not rejected.
pub const MAX_MESSAGE_CHARS: usize = 8000;
/// Only the most recent turns are forwarded.
pub const MAX_HISTORY_TURNS: usize = 20;

/// Resolve a caller-supplied provider selector.
///
/// Absent, blank and unrecognized selectors all resolve to
/// [`Provider::Ollama`]; only a recognized secondary name selects the CLI.
pub fn select_provider(selector: Option<&str>) -> Provider {
    let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
        return Provider::default();
    };
    match selector.parse::<Provider>() {
        Ok(provider) => provider,
        Err(_) => {
            warn!(provider = selector, "unrecognized provider; falling back to ollama");
            Provider::default()
        }
    }
}

/// Validate and normalize raw request fields into a [`ChatRequest`].
pub fn route(
    message: Option<String>,
    history: Option<Vec<Turn>>,
    provider: Option<&str>,
) -> Result<ChatRequest, BridgeError> {
    let message = truncate_chars(message.as_deref().unwrap_or_default().trim(), MAX_MESSAGE_CHARS);
    let mut history = history.unwrap_or_default();
    if message.is_empty() && history.is_empty() {
        return Err(BridgeError::Validation("message is required".into()));
    }
    if history.len() > MAX_HISTORY_TURNS {
        history.drain(..history.len() - MAX_HISTORY_TURNS);
    }
    Ok(ChatRequest {
        message,
        history,
        provider: select_provider(provider),
    })
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_owned(),
        None => text.to_owned(),
    }
}

/// Dispatches validated requests to the backend their provider names.
#[derive(Clone)]
pub struct Relay {
    ollama: Arc<dyn ChatBackend>,
    gemini: Arc<dyn ChatBackend>,
}

impl Relay {
    pub fn new(ollama: Arc<dyn ChatBackend>, gemini: Arc<dyn ChatBackend>) -> Self {
        Self { ollama, gemini }
    }

    pub fn from_config(ollama: OllamaConfig, cli: CliConfig) -> Result<Self, BridgeError> {
        Ok(Self::new(
            Arc::new(OllamaBackend::new(ollama)?),
            Arc::new(CliBackend::new(cli)),
        ))
    }

    pub fn backend(&self, provider: Provider) -> &dyn ChatBackend {
        match provider {
            Provider::Ollama => self.ollama.as_ref(),
            Provider::GeminiCli => self.gemini.as_ref(),
        }
    }

    pub async fn stream(&self, request: &ChatRequest) -> RecordStream {
        let backend = self.backend(request.provider);
        debug!(backend = backend.name(), turns = request.history.len(), "routing stream");
        backend.stream(request).await
    }

    pub async fn complete(&self, request: &ChatRequest) -> Result<String, BridgeError> {
        let backend = self.backend(request.provider);
        debug!(backend = backend.name(), turns = request.history.len(), "routing completion");
        backend.complete(request).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn turns(n: usize) -> Vec<Turn> {
        (0..n).map(|i| Turn::user(format!("turn {i}"))).collect()
    }

    #[test]
    fn empty_message_and_history_is_rejected() {
        let err = route(None, None, None).unwrap_err();
        assert!(err.is_validation());
        let err = route(Some("   ".into()), Some(Vec::new()), Some("gemini")).unwrap_err();
        assert_eq!(err.to_string(), "message is required");
    }

    #[test]
    fn message_is_trimmed_and_truncated_by_characters() {
        let long = format!("  {}  ", "é".repeat(MAX_MESSAGE_CHARS + 10));
        let req = route(Some(long), None, None).unwrap();
        assert_eq!(req.message.chars().count(), MAX_MESSAGE_CHARS);
        assert!(req.message.chars().all(|c| c == 'é'));
    }

    #[test]
    fn short_message_is_kept_verbatim() {
        let req = route(Some(" hello ".into()), None, None).unwrap();
        assert_eq!(req.message, "hello");
    }

    #[test]
    fn history_keeps_most_recent_turns() {
        let req = route(None, Some(turns(25)), None).unwrap();
        assert_eq!(req.history.len(), MAX_HISTORY_TURNS);
        assert_eq!(req.history[0].content, "turn 5");
        assert_eq!(req.history[19].content, "turn 24");
    }

    #[test]
    fn history_alone_is_enough() {
        let req = route(None, Some(turns(1)), None).unwrap();
        assert!(req.message.is_empty());
        assert_eq!(req.history.len(), 1);
    }

    #[test]
    fn provider_defaults_to_ollama() {
        assert_eq!(select_provider(None), Provider::Ollama);
        assert_eq!(select_provider(Some("")), Provider::Ollama);
        assert_eq!(select_provider(Some(" OLLAMA ")), Provider::Ollama);
        assert_eq!(select_provider(Some("mystery")), Provider::Ollama);
        assert_eq!(select_provider(Some(" Gemini ")), Provider::GeminiCli);
    }

    #[test]
    #[tracing_test::traced_test]
    fn unrecognized_provider_is_logged() {
        assert_eq!(select_provider(Some("openai")), Provider::Ollama);
        assert!(logs_contain("unrecognized provider"));
    }
}
