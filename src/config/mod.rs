//! Configuration module for voicepaste.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and the JSON user replacements
//! dictionary.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    load_replacements, AppConfig, AutoStopExit, ClipboardConfig, KeysConfig, PathsConfig,
    RecordingConfig, TranscriptionConfig,
};
