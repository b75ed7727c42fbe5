//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::remote::{ImageDetail, Voice};

/// Environment variable consulted when `openai.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// OpenAiConfig
// ---------------------------------------------------------------------------

/// Connection settings shared by the analysis and speech clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL of the API endpoint (without the `/v1/...` suffix).
    pub base_url: String,
    /// API key. `None` means "read `OPENAI_API_KEY` from the environment".
    pub api_key: Option<String>,
    /// Maximum seconds to wait for a response before the request is treated
    /// as a remote failure.
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    /// The configured key, or the value of `OPENAI_API_KEY`.
    ///
    /// Empty strings are treated as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Settings for the vision analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Vision-capable chat model.
    pub model: String,
    /// Upper bound on the length of the diagnostic response.
    pub max_tokens: u32,
    /// Image detail level sent alongside the picture.
    pub image_detail: ImageDetail,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            max_tokens: 500,
            image_detail: ImageDetail::High,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for narration synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Text-to-speech model.
    pub model: String,
    /// Voice selected when the application starts.
    pub voice: Voice,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: "tts-1".into(),
            voice: Voice::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportsConfig
// ---------------------------------------------------------------------------

/// Settings for the local report store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Key prefix that scopes report entries inside the storage file.
    pub namespace: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            namespace: crate::reports::DEFAULT_NAMESPACE.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use car_doctor::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote endpoint settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Vision analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Speech synthesis settings.
    #[serde(default)]
    pub speech: SpeechConfig,
    /// Report store settings.
    #[serde(default)]
    pub reports: ReportsConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
