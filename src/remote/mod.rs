//! Remote collaborators: vision analysis and speech synthesis.
//!
//! This module provides:
//! * [`AnalysisClient`]: async trait turning an image into diagnostic text.
//! * [`SpeechClient`]: async trait turning narration text into MP3 bytes.
//! * [`OpenAiAnalysisClient`] / [`OpenAiSpeechClient`]: production backends
//!   speaking the OpenAI chat-completions and audio-speech wire formats.
//! * [`Voice`]: the closed set of narration voices.
//! * [`RemoteError`]: every failure both clients can surface.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use car_doctor::config::AppConfig;
//! use car_doctor::remote::{AnalysisClient, OpenAiAnalysisClient, OpenAiSpeechClient, SpeechClient, Voice};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let analysis = OpenAiAnalysisClient::from_config(&config.openai, &config.analysis);
//!     let speech = OpenAiSpeechClient::from_config(&config.openai, &config.speech);
//!
//!     let image = std::fs::read("dashboard.jpg").unwrap();
//!     let text = analysis.analyze(&image, Some("2014 Honda Civic")).await.unwrap();
//!     let mp3 = speech.synthesize(&text, Voice::Fable).await.unwrap();
//!     println!("{} bytes of narration", mp3.len());
//! }
//! ```

pub mod analysis;
pub mod error;
pub mod prompt;
pub mod speech;
pub mod voice;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use analysis::{AnalysisClient, OpenAiAnalysisClient};
pub use error::RemoteError;
pub use prompt::{ImageDetail, SYSTEM_PROMPT};
pub use speech::{OpenAiSpeechClient, SpeechClient};
pub use voice::{UnknownVoice, Voice};

#[cfg(test)]
pub use analysis::MockAnalysisClient;
#[cfg(test)]
pub use speech::MockSpeechClient;

/// Build the shared HTTP client with the configured per-request timeout.
///
/// Falls back to a default client if the builder fails.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("failed to build HTTP client ({e}); using defaults");
            reqwest::Client::new()
        })
}
