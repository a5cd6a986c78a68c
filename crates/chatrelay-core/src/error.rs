use thiserror::Error;

/// Errors produced while validating a request or talking to a backend.
///
/// Mid-stream failures are never returned as `Err`; they are rendered with
/// `to_string()` into a terminal [`OutputRecord::Error`].
///
/// [`OutputRecord::Error`]: crate::OutputRecord::Error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The request carried neither a message nor any history.
    #[error("{0}")]
    Validation(String),

    /// The Ollama service was unreachable, timed out, or answered non-2xx.
    #[error("ollama request failed: {0}")]
    Transport(String),

    /// The CLI executable could not be started.
    #[error("failed to start gemini cli: {0}")]
    Launch(String),

    /// The CLI produced output that could not be read as text.
    #[error("gemini cli output unreadable: {0}")]
    OutputRead(String),
}

impl BridgeError {
    pub fn is_validation(&self) -> bool {
        matches!(self, BridgeError::Validation(_))
    }
}

/// Render an error together with its `source()` chain.
///
/// reqwest's top-level message ("error sending request for url ...") hides
/// the useful part (connection refused, timed out) in the chain.
pub(crate) fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
