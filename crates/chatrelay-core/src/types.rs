use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One role-tagged message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Backend selector.
///
/// `Ollama` is the primary (HTTP) backend and the default for absent or
/// unrecognized selectors; `GeminiCli` is the secondary (subprocess) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Provider {
    #[default]
    #[strum(to_string = "ollama")]
    Ollama,
    #[strum(to_string = "gemini", serialize = "gemini-cli")]
    GeminiCli,
}

/// A validated chat request. Built by [`crate::router::route`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Trimmed current message; may be empty when `history` is not.
    pub message: String,
    /// At most the 20 most recent turns.
    pub history: Vec<Turn>,
    pub provider: Provider,
}

impl ChatRequest {
    /// History plus the current message appended as a final user turn.
    pub fn conversation(&self) -> Vec<Turn> {
        let mut turns = self.history.clone();
        if !self.message.is_empty() {
            turns.push(Turn::user(self.message.clone()));
        }
        turns
    }

    /// Prompt for single-prompt backends: the message, or the content of the
    /// latest turn when the message is empty.
    pub fn prompt(&self) -> &str {
        if !self.message.is_empty() {
            return &self.message;
        }
        self.history
            .last()
            .map(|turn| turn.content.as_str())
            .unwrap_or_default()
    }
}

/// One unit of the outward NDJSON protocol.
///
/// Serializes as `{"response": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputRecord {
    Response(String),
    Error(String),
}

impl OutputRecord {
    pub fn response(text: impl Into<String>) -> Self {
        OutputRecord::Response(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutputRecord::Error(message.into())
    }

    /// An error record ends the stream; nothing may follow it.
    pub fn is_error(&self) -> bool {
        matches!(self, OutputRecord::Error(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn provider_parses_known_names_case_insensitively() {
        assert_eq!("ollama".parse::<Provider>().ok(), Some(Provider::Ollama));
        assert_eq!("Gemini".parse::<Provider>().ok(), Some(Provider::GeminiCli));
        assert_eq!("gemini-cli".parse::<Provider>().ok(), Some(Provider::GeminiCli));
        assert!("openai".parse::<Provider>().is_err());
        assert_eq!(Provider::GeminiCli.to_string(), "gemini");
    }

    #[test]
    fn record_serializes_with_exactly_one_field() {
        let json = serde_json::to_string(&OutputRecord::response("hi")).unwrap();
        assert_eq!(json, r#"{"response":"hi"}"#);
        let json = serde_json::to_string(&OutputRecord::error("boom")).unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }

    #[test]
    fn conversation_appends_message_as_user_turn() {
        let req = ChatRequest {
            message: "next".into(),
            history: vec![Turn::new("assistant", "prev")],
            provider: Provider::Ollama,
        };
        let turns = req.conversation();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1], Turn::user("next"));
    }

    #[test]
    fn prompt_falls_back_to_latest_turn() {
        let req = ChatRequest {
            message: String::new(),
            history: vec![Turn::user("first"), Turn::user("second")],
            provider: Provider::GeminiCli,
        };
        assert_eq!(req.prompt(), "second");
        assert!(req.conversation().iter().all(|t| !t.content.is_empty()));
    }
}
