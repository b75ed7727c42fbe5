//! Core `SpeechClient` trait and the OpenAI-compatible implementation.
//!
//! `OpenAiSpeechClient` calls `/v1/audio/speech` and returns the raw MP3
//! body.

use async_trait::async_trait;

use crate::config::{OpenAiConfig, SpeechConfig};
use crate::remote::error::RemoteError;
use crate::remote::voice::Voice;

// ---------------------------------------------------------------------------
// SpeechClient trait
// ---------------------------------------------------------------------------

/// Async trait for narration synthesis.
///
/// The voice is a [`Voice`], so an identifier outside the catalogue cannot
/// reach the wire.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Synthesize `text` in `voice`, returning MP3-compatible audio bytes.
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>, RemoteError>;
}

// ---------------------------------------------------------------------------
// OpenAiSpeechClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint.
pub struct OpenAiSpeechClient {
    client: reqwest::Client,
    openai: OpenAiConfig,
    model: String,
}

impl OpenAiSpeechClient {
    pub fn from_config(openai: &OpenAiConfig, config: &SpeechConfig) -> Self {
        Self {
            client: super::http_client(openai.timeout_secs),
            openai: openai.clone(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/speech", self.openai.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechClient for OpenAiSpeechClient {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>, RemoteError> {
        let key = self
            .openai
            .resolve_api_key()
            .ok_or(RemoteError::MissingApiKey)?;

        let body = serde_json::json!({
            "model": self.model,
            "voice": voice.as_str(),
            "input": text,
        });

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

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(RemoteError::Parse("empty audio body".into()));
        }

        log::debug!("speech: received {} bytes ({voice})", audio.len());
        Ok(audio.to_vec())
    }
}

// ---------------------------------------------------------------------------
// MockSpeechClient  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records every `(text, voice)` it receives.
#[cfg(test)]
pub struct MockSpeechClient {
    response: Result<Vec<u8>, RemoteError>,
    calls: std::sync::Mutex<Vec<(String, Voice)>>,
}

#[cfg(test)]
impl MockSpeechClient {
    pub fn ok(audio: impl Into<Vec<u8>>) -> Self {
        Self {
            response: Ok(audio.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn err(error: RemoteError) -> Self {
        Self {
            response: Err(error),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Voice)> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechClient for MockSpeechClient {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>, RemoteError> {
        self.calls.lock().unwrap().push((text.to_string(), voice));
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
