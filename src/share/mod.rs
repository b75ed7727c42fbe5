//! Hand-off of report text to the outside world: the system clipboard and
//! plain-text files for a platform share action.

pub mod clipboard;
pub mod export;

pub use clipboard::copy_text;
pub use export::{export_text, SHARE_FILE_NAME};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShareError {
    /// Could not open the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not write the export file.
    #[error("cannot write share file: {0}")]
    Io(#[from] std::io::Error),
}
