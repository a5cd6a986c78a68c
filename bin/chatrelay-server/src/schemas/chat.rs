//! Request / response bodies of the chat endpoints.

use chatrelay_core::{router, ChatRequest, Turn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ServerError;

/// Body of `POST /chat` and `POST /chat_stream`.
///
/// All fields are optional; an empty or missing body is treated as `{}` and
/// then rejected by validation.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ChatBody {
    /// The current user message.
    #[serde(default)]
    pub message: Option<String>,
    /// Prior turns, oldest first. Only the 20 most recent are used.
    #[serde(default, alias = "messages")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub history: Option<Vec<Turn>>,
    /// `"ollama"` (default) or `"gemini"`.
    #[serde(default)]
    pub provider: Option<String>,
}

impl ChatBody {
    /// Parse a raw request body. Missing content type and empty bodies are
    /// tolerated.
    pub fn parse(raw: &[u8]) -> Result<Self, ServerError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice::<Option<Self>>(raw)
            .map(Option::unwrap_or_default)
            .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
    }

    pub fn into_request(self) -> Result<ChatRequest, ServerError> {
        Ok(router::route(
            self.message,
            self.history,
            self.provider.as_deref(),
        )?)
    }
}

/// Body of a successful `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    /// Full reply text.
    pub reply: String,
}
