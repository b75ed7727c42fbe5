//! Where car-doctor keeps its files.
//!
//! ```text
//! settings.toml       <config dir>/car-doctor/      ~/.config on Linux
//! reports.json        <local data dir>/car-doctor/  ~/.local/share on Linux
//! shared_report.txt   <cache dir>/car-doctor/       ~/.cache on Linux
//! ```
//!
//! Settings are small and worth backing up, reports can grow and stay on the
//! local machine, and the share file is overwritten on every share.

use std::path::PathBuf;

/// Resolved locations for settings, saved reports and share exports.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// `settings.toml` inside `config_dir`; `--config` overrides it per run.
    pub settings_file: PathBuf,
    /// JSON object file behind the report store.
    pub reports_file: PathBuf,
    /// Scratch directory for `shared_report.txt`.
    pub cache_dir: PathBuf,
}

impl AppPaths {
    const APP_DIR: &'static str = "car-doctor";

    /// Settings and reports land in the working directory on platforms
    /// without a home layout; share exports land in the system temp dir.
    pub fn new() -> Self {
        let here = || PathBuf::from(".");
        let config_dir = dirs::config_dir().unwrap_or_else(here).join(Self::APP_DIR);
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(here)
            .join(Self::APP_DIR);
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(Self::APP_DIR);

        Self {
            settings_file: config_dir.join("settings.toml"),
            reports_file: data_dir.join("reports.json"),
            config_dir,
            cache_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
