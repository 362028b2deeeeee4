//! Speech-to-text service client.
//!
//! [`Transcriber`] is the interface the transcription pipeline calls with a
//! persisted WAV file; [`ApiTranscriber`] is the production implementation
//! talking to an HTTP transcription endpoint. [`MockTranscriber`]
//! (test-only) returns a pre-configured response and counts invocations.

pub mod api;

pub use api::ApiTranscriber;

use std::path::Path;

use thiserror::Error;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the transcription service client.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The audio file could not be read for upload.
    #[error("cannot read audio file: {0}")]
    File(String),

    /// The HTTP request itself failed (connect, timeout, TLS, …).
    #[error("transcription request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("transcription API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("malformed transcription response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for transcription backends.
///
/// # Contract
///
/// - `audio_path` points to a readable WAV file.
/// - An empty transcript is a *valid* return value; deciding whether that
///   constitutes a failure is the caller's business.
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path` and return the transcript.
    fn transcribe(&self, audio_path: &Path) -> Result<String, SttError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// Test double that returns a pre-configured response without any I/O.
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<String, SttError>,
    calls: std::sync::atomic::AtomicUsize,
    last_path: std::sync::Mutex<Option<std::path::PathBuf>>,
}

#[cfg(test)]
impl MockTranscriber {
    /// Create a mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            response: Ok(text.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_path: std::sync::Mutex::new(None),
        })
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: SttError) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            response: Err(error),
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_path: std::sync::Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn last_path(&self) -> Option<std::path::PathBuf> {
        self.last_path.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, SttError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_path.lock().unwrap() = Some(audio_path.to_path_buf());
        self.response.clone()
    }
}
