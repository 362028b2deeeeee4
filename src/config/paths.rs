//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + replacements dictionary):
//!   Windows: %APPDATA%\voicepaste\
//!   macOS:   ~/Library/Application Support/voicepaste/
//!   Linux:   ~/.config/voicepaste/
//!
//! Temp dir (transient `.wav` recordings, purged by age):
//!   <OS temp dir>/voicepaste/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `replacements.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to the user replacements dictionary.
    pub replacements_file: PathBuf,
    /// Directory for transient `.wav` recordings.
    pub temp_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voicepaste";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard config path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let replacements_file = config_dir.join("replacements.json");
        let temp_dir = std::env::temp_dir().join(Self::APP_NAME);

        Self {
            config_dir,
            settings_file,
            replacements_file,
            temp_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file_lives_under_config_dir() {
        let paths = AppPaths::new();
        assert!(paths.settings_file.starts_with(&paths.config_dir));
        assert!(paths.replacements_file.starts_with(&paths.config_dir));
    }

    #[test]
    fn temp_dir_is_app_scoped() {
        let paths = AppPaths::new();
        assert!(paths.temp_dir.ends_with("voicepaste"));
    }
}
