//! Configuration module for CarDoctor.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the remote
//! clients and the report store, `AppPaths` for cross-platform data
//! directories, and TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AnalysisConfig, AppConfig, OpenAiConfig, ReportsConfig, SpeechConfig};
