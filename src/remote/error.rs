//! Error type shared by the analysis and speech clients.

use thiserror::Error;

/// Failures of a remote call: transport, timeout, non-success status or an
/// unusable response body.
///
/// Every variant carries owned strings so the error can be stored in the
/// session state and cloned out to the presentation layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be interpreted.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// No API key in the config file or the environment.
    #[error("no API key configured (set openai.api_key or OPENAI_API_KEY)")]
    MissingApiKey,
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Request(e.to_string())
        }
    }
}

impl RemoteError {
    /// Build a [`RemoteError::Status`] from a failed response body.
    ///
    /// OpenAI-style payloads (`{"error": {"message": ...}}`) contribute their
    /// message; any other body is used verbatim, and an empty body falls back
    /// to the canonical status reason.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let from_json = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string));

        let message = match from_json {
            Some(msg) => msg,
            None if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            None => body.trim().to_string(),
        };

        RemoteError::Status {
            status: status.as_u16(),
            message,
        }
    }
}
