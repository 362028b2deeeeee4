//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AutoStopExit
// ---------------------------------------------------------------------------

/// Whether the application exits after the auto-stop deadline fires.
///
/// The exit is scheduled 1 s after the auto-stop notification, giving the
/// transcription of the final recording time to start. The policy decides
/// what happens when the stop handler itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoStopExit {
    /// Always schedule the exit, even when the stop handler failed.
    Always,
    /// Schedule the exit only after a clean stop (default).
    OnSuccess,
    /// Never exit; auto-stop only ends the recording.
    Never,
}

impl Default for AutoStopExit {
    fn default() -> Self {
        Self::OnSuccess
    }
}

// ---------------------------------------------------------------------------
// RecordingConfig
// ---------------------------------------------------------------------------

/// Settings for the recording session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Seconds of recording after which the auto-stop deadline fires.
    pub auto_stop_secs: u64,
    /// Exit behaviour once the auto-stop deadline fires.
    pub auto_stop_exit: AutoStopExit,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            auto_stop_secs: 300,
            auto_stop_exit: AutoStopExit::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Settings for the HTTP speech-to-text service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of the transcription API.
    pub base_url: String,
    /// API key — `None` for key-less self-hosted endpoints.
    pub api_key: Option<String>,
    /// Model identifier sent with each request.
    pub model: String,
    /// ISO-639-1 language hint, or `None` for server-side detection.
    pub language: Option<String>,
    /// Maximum seconds to wait for a transcription response.
    pub timeout_secs: u64,
    /// Convert/strip sentence punctuation in the transcript.
    pub use_punctuation: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".into(),
            api_key: None,
            model: "scribe_v1".into(),
            language: None,
            timeout_secs: 30,
            use_punctuation: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ClipboardConfig
// ---------------------------------------------------------------------------

/// Settings for the clipboard-paste injection step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Milliseconds between transcript arrival and the paste attempt, so the
    /// user's focus has settled back on the target window.
    pub paste_delay_ms: u64,
    /// Milliseconds to wait after setting the clipboard before simulating
    /// the paste shortcut (clipboard manager flush).
    pub set_delay_ms: u64,
    /// Milliseconds to wait after the paste before restoring the original
    /// clipboard content.
    pub restore_delay_ms: u64,
    /// Restore the previous clipboard content after pasting (best-effort).
    pub restore_clipboard: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            paste_delay_ms: 300,
            set_delay_ms: 50,
            restore_delay_ms: 100,
            restore_clipboard: true,
        }
    }
}

// ---------------------------------------------------------------------------
// KeysConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Key that starts/stops dictation (e.g. `"F8"`).
    pub toggle_recording: String,
    /// Key that transcribes the audio file whose path is on the clipboard;
    /// `None` disables the binding.
    pub transcribe_file: Option<String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            toggle_recording: "F8".into(),
            transcribe_file: Some("F10".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// PathsConfig
// ---------------------------------------------------------------------------

/// Filesystem locations and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for transient `.wav` recordings. `None` means the
    /// platform default from [`AppPaths`].
    pub temp_dir: Option<PathBuf>,
    /// Recordings older than this many minutes are purged at startup and
    /// at cleanup.
    pub cleanup_minutes: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            cleanup_minutes: 60,
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
/// use voicepaste::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Recording session lifecycle settings.
    pub recording: RecordingConfig,
    /// Transcription service settings.
    pub transcription: TranscriptionConfig,
    /// Clipboard / paste settings.
    pub clipboard: ClipboardConfig,
    /// Global hotkey bindings.
    pub keys: KeysConfig,
    /// Filesystem locations and retention.
    pub paths: PathsConfig,
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
// Replacements dictionary
// ---------------------------------------------------------------------------

/// Load the user replacements dictionary (a flat JSON object of
/// `"spoken" → "written"` pairs).
///
/// A missing file yields an empty map; a malformed file is an error so the
/// user finds out their dictionary is broken instead of silently losing it.
pub fn load_replacements(path: &std::path::Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    let replacements: HashMap<String, String> = serde_json::from_str(&content)?;
    Ok(replacements)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.recording.auto_stop_secs, 300);
        assert_eq!(config.recording.auto_stop_exit, AutoStopExit::OnSuccess);
        assert_eq!(config.clipboard.paste_delay_ms, 300);
        assert_eq!(config.keys.toggle_recording, "F8");
        assert!(config.paths.temp_dir.is_none());
        assert!(config.transcription.use_punctuation);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut config = AppConfig::default();
        config.recording.auto_stop_secs = 42;
        config.recording.auto_stop_exit = AutoStopExit::Never;
        config.transcription.api_key = Some("secret".into());
        config.keys.transcribe_file = None;

        config.save_to(&path).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();

        assert_eq!(loaded.recording.auto_stop_secs, 42);
        assert_eq!(loaded.recording.auto_stop_exit, AutoStopExit::Never);
        assert_eq!(loaded.transcription.api_key.as_deref(), Some("secret"));
        assert!(loaded.keys.transcribe_file.is_none());
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let loaded = AppConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded.recording.auto_stop_secs, 300);
    }

    #[test]
    fn load_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn replacements_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("replacements.json");
        std::fs::write(&path, r#"{"semicolon": ";", "new line": "\n"}"#).unwrap();

        let replacements = load_replacements(&path).unwrap();
        assert_eq!(replacements.get("semicolon").map(String::as_str), Some(";"));
        assert_eq!(replacements.len(), 2);
    }

    #[test]
    fn missing_replacements_file_is_empty() {
        let dir = tempdir().unwrap();
        let replacements = load_replacements(&dir.path().join("nope.json")).unwrap();
        assert!(replacements.is_empty());
    }
}
