//! Core `AnalysisClient` trait and the OpenAI-compatible implementation.
//!
//! `OpenAiAnalysisClient` calls `/v1/chat/completions` with a vision-capable
//! model. All connection details come from [`OpenAiConfig`] and
//! [`AnalysisConfig`]; nothing is hardcoded.

use async_trait::async_trait;

use crate::config::{AnalysisConfig, OpenAiConfig};
use crate::remote::error::RemoteError;
use crate::remote::prompt::build_analysis_body;

// ---------------------------------------------------------------------------
// AnalysisClient trait
// ---------------------------------------------------------------------------

/// Async trait for image diagnosis.
///
/// Implementors must be `Send + Sync` so they can be shared behind
/// `Arc<dyn AnalysisClient>`.
///
/// An empty string is a valid answer; the session controller decides what to
/// do with it.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Diagnose `image` (JPEG bytes), optionally guided by a free-text vehicle
    /// description.
    async fn analyze(&self, image: &[u8], context: Option<&str>) -> Result<String, RemoteError>;
}

// ---------------------------------------------------------------------------
// OpenAiAnalysisClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with the image
/// attached as a data URL.
pub struct OpenAiAnalysisClient {
    client: reqwest::Client,
    openai: OpenAiConfig,
    config: AnalysisConfig,
}

impl OpenAiAnalysisClient {
    /// Build a client from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `openai.timeout_secs`; a timeout surfaces as [`RemoteError::Timeout`].
    pub fn from_config(openai: &OpenAiConfig, config: &AnalysisConfig) -> Self {
        Self {
            client: super::http_client(openai.timeout_secs),
            openai: openai.clone(),
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.openai.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl AnalysisClient for OpenAiAnalysisClient {
    async fn analyze(&self, image: &[u8], context: Option<&str>) -> Result<String, RemoteError> {
        let key = self
            .openai
            .resolve_api_key()
            .ok_or(RemoteError::MissingApiKey)?;

        let body = build_analysis_body(
            &self.config.model,
            self.config.max_tokens,
            self.config.image_detail,
            image,
            context,
        );

        log::debug!(
            "analysis: sending {} byte image to {}",
            image.len(),
            self.config.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status, &text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        Ok(extract_content(&json))
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
///
/// A missing or non-string content field yields an empty string.
fn extract_content(json: &serde_json::Value) -> String {
    json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// MockAnalysisClient  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response and records the
/// context it was called with.
#[cfg(test)]
pub struct MockAnalysisClient {
    response: Result<String, RemoteError>,
    calls: std::sync::Mutex<Vec<Option<String>>>,
}

#[cfg(test)]
impl MockAnalysisClient {
    /// A mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A mock that always returns `Err(error)`.
    pub fn err(error: RemoteError) -> Self {
        Self {
            response: Err(error),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Contexts received so far, in call order.
    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl AnalysisClient for MockAnalysisClient {
    async fn analyze(&self, _image: &[u8], context: Option<&str>) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(context.map(str::to_string));
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
