//! Transcript post-processing and clipboard-paste injection.
//!
//! # Overview
//!
//! Dictated text reaches the cursor via the clipboard rather than per-key
//! synthesis — transcripts routinely contain characters (CJK punctuation,
//! accented letters) that are awkward to type through raw key events:
//!
//! 1. apply the user's replacements dictionary,
//! 2. **save** the original clipboard content,
//! 3. **set** the transcript into the clipboard,
//! 4. **simulate** Ctrl+V (⌘V on macOS),
//! 5. **restore** the original clipboard content (best-effort).

pub mod clipboard;
pub mod paste;

pub use clipboard::{clipboard_text, restore_clipboard, save_clipboard, set_clipboard};
pub use paste::simulate_paste;

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::config::ClipboardConfig;

// ---------------------------------------------------------------------------
// PasteError
// ---------------------------------------------------------------------------

/// All errors that can surface during clipboard-paste injection.
#[derive(Debug, Error)]
pub enum PasteError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate a key press/release event.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

/// Normalise sentence punctuation in a raw transcript.
///
/// With `use_punctuation` enabled, ASCII sentence marks become their CJK
/// full-width forms; disabled, sentence marks are stripped entirely (for
/// users who dictate punctuation words themselves).
///
/// ```
/// use voicepaste::text::process_punctuation;
///
/// assert_eq!(process_punctuation("a.b,c", true), "a。b、c");
/// assert_eq!(process_punctuation("a.b,c", false), "abc");
/// ```
pub fn process_punctuation(text: &str, use_punctuation: bool) -> String {
    if use_punctuation {
        text.chars()
            .map(|c| match c {
                '.' => '。',
                ',' => '、',
                '?' => '？',
                '!' => '！',
                other => other,
            })
            .collect()
    } else {
        text.chars()
            .filter(|c| !matches!(c, '.' | ',' | '?' | '!' | '。' | '、' | '？' | '！'))
            .collect()
    }
}

/// Apply the user's replacements dictionary, longest key first so that a
/// short key never clobbers part of a longer one.
pub fn apply_replacements(text: &str, replacements: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = replacements.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut result = text.to_string();
    for key in keys {
        result = result.replace(key.as_str(), &replacements[key]);
    }
    result
}

// ---------------------------------------------------------------------------
// Full injection pipeline
// ---------------------------------------------------------------------------

/// Apply replacements, then run the save → set → paste → restore sequence
/// with the configured inter-step delays.
///
/// # Errors
///
/// Returns the first [`PasteError`] from the save/set/paste steps. The
/// restore is always attempted (when enabled) and its result is discarded.
pub fn copy_and_paste_transcription(
    text: &str,
    replacements: &HashMap<String, String>,
    config: &ClipboardConfig,
) -> Result<(), PasteError> {
    let processed = apply_replacements(text, replacements);

    let saved = if config.restore_clipboard {
        save_clipboard()?
    } else {
        None
    };

    set_clipboard(&processed)?;
    std::thread::sleep(Duration::from_millis(config.set_delay_ms));

    simulate_paste()?;
    std::thread::sleep(Duration::from_millis(config.restore_delay_ms));

    if config.restore_clipboard {
        let _ = restore_clipboard(saved);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
