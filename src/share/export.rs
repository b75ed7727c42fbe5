//! Export report text to a file the platform share action can pick up.

use std::path::{Path, PathBuf};

use super::ShareError;

/// File name used for every export; each export overwrites the previous one.
pub const SHARE_FILE_NAME: &str = "shared_report.txt";

/// Write `text` (any UTF-8) to `<dir>/shared_report.txt`, creating `dir` if
/// needed, and return the file path.
pub async fn export_text(dir: &Path, text: &str) -> Result<PathBuf, ShareError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(SHARE_FILE_NAME);
    tokio::fs::write(&path, text).await?;
    log::debug!("share: wrote {} bytes to {}", text.len(), path.display());
    Ok(path)
}
