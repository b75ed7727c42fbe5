//! Clipboard copy backed by the `arboard` crate.
//!
//! A short-lived [`arboard::Clipboard`] handle is created per call because
//! `arboard::Clipboard` is not `Send` on all platforms.

use arboard::Clipboard;

use super::ShareError;

/// Write `text` into the system clipboard, replacing whatever was there.
///
/// # Errors
///
/// Returns [`ShareError::ClipboardAccess`] if the clipboard cannot be opened,
/// or [`ShareError::ClipboardSet`] if writing fails.
pub fn copy_text(text: &str) -> Result<(), ShareError> {
    let mut clipboard =
        Clipboard::new().map_err(|e| ShareError::ClipboardAccess(e.to_string()))?;
    clipboard
        .set_text(text)
        .map_err(|e| ShareError::ClipboardSet(e.to_string()))
}
