//! Clipboard helpers backed by the `arboard` crate.
//!
//! All functions create a short-lived [`arboard::Clipboard`] handle rather
//! than sharing one across calls, because `arboard::Clipboard` is not `Send`
//! on all platforms and the handle is cheap to create.

use arboard::Clipboard;

use super::PasteError;

fn open_clipboard() -> Result<Clipboard, PasteError> {
    Clipboard::new().map_err(|e| PasteError::ClipboardAccess(e.to_string()))
}

/// Capture the current clipboard plain-text content.
///
/// Returns `Ok(None)` when the clipboard is empty or contains non-text data
/// (e.g. an image). Never returns an error just because the clipboard is
/// empty.
pub fn save_clipboard() -> Result<Option<String>, PasteError> {
    let mut clipboard = open_clipboard()?;
    // `get_text` returns Err if empty or non-text — treat both as None
    Ok(clipboard.get_text().ok())
}

/// Read the clipboard as text, erroring when it holds none.
///
/// Used for the file-input path, where the clipboard is expected to carry
/// the path of an audio file.
pub fn clipboard_text() -> Result<String, PasteError> {
    let mut clipboard = open_clipboard()?;
    clipboard
        .get_text()
        .map_err(|e| PasteError::ClipboardAccess(e.to_string()))
}

/// Write `text` into the system clipboard, replacing whatever was there.
pub fn set_clipboard(text: &str) -> Result<(), PasteError> {
    let mut clipboard = open_clipboard()?;
    clipboard
        .set_text(text)
        .map_err(|e| PasteError::ClipboardSet(e.to_string()))
}

/// Restore the clipboard to a previously saved value.
///
/// `None` means nothing was saved (clipboard was empty or non-text before
/// the injection); the clipboard is left untouched in that case.
pub fn restore_clipboard(saved: Option<String>) -> Result<(), PasteError> {
    match saved {
        Some(text) => set_clipboard(&text),
        None => Ok(()),
    }
}
