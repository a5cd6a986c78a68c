//! Server configuration, loaded from environment variables at startup.

use chatrelay_core::backend::cli::{self, CliConfig};
use chatrelay_core::backend::ollama::{self, OllamaConfig};
use chatrelay_core::writer;

/// Runtime configuration for chatrelay-server.
///
/// Every field has a default so the server works without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind (default: `"0.0.0.0"`).
    pub host: String,

    /// TCP port to bind (default: `8000`).
    pub port: u16,

    /// Base URL of the Ollama HTTP API.
    pub ollama_base: String,

    /// Model name sent to Ollama; also reported by `/healthz`.
    pub ollama_model: String,

    /// Gemini CLI executable.
    pub gemini_cmd: String,

    pub gemini_model: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Encoded records buffered per streaming response.
    pub stream_buffer: usize,

    /// Open the landing page in the local browser once listening.
    pub open_browser: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: env_or(&lookup, "HOST", "0.0.0.0"),
            port: parse_env(&lookup, "PORT", 8000),
            ollama_base: env_or(&lookup, "OLLAMA_BASE", ollama::DEFAULT_BASE_URL),
            ollama_model: env_or(&lookup, "OLLAMA_MODEL", ollama::DEFAULT_MODEL),
            gemini_cmd: env_or(&lookup, "GEMINI_CMD", cli::DEFAULT_COMMAND),
            gemini_model: env_or(&lookup, "GEMINI_MODEL", cli::DEFAULT_MODEL),
            log_level: env_or(&lookup, "CHATRELAY_LOG", "info"),
            log_json: flag(&lookup, "CHATRELAY_LOG_JSON"),
            cors_allowed_origins: lookup("CHATRELAY_CORS_ORIGINS")
                .filter(|v| !v.trim().is_empty()),
            stream_buffer: parse_env(&lookup, "CHATRELAY_STREAM_BUFFER", writer::DEFAULT_BUFFER)
                .max(1),
            open_browser: flag(&lookup, "CHATRELAY_OPEN_BROWSER"),
        }
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ollama_base.clone(),
            model: self.ollama_model.clone(),
        }
    }

    pub fn gemini(&self) -> CliConfig {
        CliConfig {
            command: self.gemini_cmd.clone(),
            model: self.gemini_model.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_owned())
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|v| {
            let v = v.trim();
            v == "1" || v.eq_ignore_ascii_case("true")
        })
        .unwrap_or(false)
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
