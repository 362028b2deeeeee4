//! Audio capture and persistence.
//!
//! [`Recorder`] is the interface the recording lifecycle drives. It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn Recorder>` and read from any thread.
//!
//! [`CpalRecorder`] is the production implementation backed by the default
//! cpal input device. [`MockRecorder`] (test-only) is a scriptable stub.
//!
//! Captured audio is a list of mono 16-bit PCM chunks (`Vec<Vec<i16>>`), one
//! chunk per device callback, plus the device sample rate — exactly what
//! [`wav::save_frames`] needs to persist a temp artifact for the
//! transcription service.

pub mod capture;
pub mod wav;

pub use capture::CpalRecorder;
pub use wav::{purge_stale_wavs, save_frames};

use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// All errors that can arise from the audio subsystem.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No audio input device is available on this system.
    #[error("no audio input device available")]
    NoDevice,

    /// The audio backend reported an error (stream build, play, …).
    #[error("audio device error: {0}")]
    Device(String),

    /// `stop_recording` was called while the recorder was idle.
    #[error("recorder is not recording")]
    NotRecording,

    /// `start_recording` was called while a recording is already active.
    #[error("recorder is already recording")]
    AlreadyRecording,

    /// The capture produced no samples.
    #[error("no audio captured")]
    EmptyRecording,

    /// Filesystem error while persisting or purging recordings.
    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV encoding failed.
    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
}

// ---------------------------------------------------------------------------
// Recorder trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to an audio recorder.
///
/// # Contract
///
/// - `is_recording` is a plain flag read, safe from any thread. It is the
///   single source of truth for "are we recording" — callers must not
///   mirror it.
/// - `start_recording` arms the recorder; `record` then blocks on the
///   capture thread until `stop_recording` clears the flag.
/// - `stop_recording` returns the captured chunks and the device sample
///   rate, and fails with [`AudioError::NotRecording`] when the recorder is
///   in an inconsistent state.
pub trait Recorder: Send + Sync {
    /// `true` while a recording is active.
    fn is_recording(&self) -> bool;

    /// Arm the recorder and clear any previous capture buffer.
    fn start_recording(&self) -> Result<(), AudioError>;

    /// Capture audio until the recording flag is cleared. Blocking — runs
    /// on a dedicated capture thread.
    fn record(&self) -> Result<(), AudioError>;

    /// Disarm the recorder and hand back `(frames, sample_rate)`.
    fn stop_recording(&self) -> Result<(Vec<Vec<i16>>, u32), AudioError>;
}

// Compile-time assertion: Box<dyn Recorder> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recorder>) {}
};

// ---------------------------------------------------------------------------
// MockRecorder  (test-only)
// ---------------------------------------------------------------------------

/// Scriptable recorder stub for lifecycle tests.
#[cfg(test)]
pub struct MockRecorder {
    recording: std::sync::atomic::AtomicBool,
    frames: std::sync::Mutex<Vec<Vec<i16>>>,
    sample_rate: u32,
    start_calls: std::sync::atomic::AtomicUsize,
    stop_calls: std::sync::atomic::AtomicUsize,
    fail_next_stop: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockRecorder {
    pub fn new() -> std::sync::Arc<Self> {
        Self::with_frames(vec![vec![100, -200], vec![300]], 16_000)
    }

    pub fn with_frames(frames: Vec<Vec<i16>>, sample_rate: u32) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            recording: std::sync::atomic::AtomicBool::new(false),
            frames: std::sync::Mutex::new(frames),
            sample_rate,
            start_calls: std::sync::atomic::AtomicUsize::new(0),
            stop_calls: std::sync::atomic::AtomicUsize::new(0),
            fail_next_stop: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn set_recording(&self, on: bool) {
        self.recording.store(on, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn fail_next_stop(&self) {
        self.fail_next_stop
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Recorder for MockRecorder {
    fn is_recording(&self) -> bool {
        self.recording.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn start_recording(&self) -> Result<(), AudioError> {
        self.start_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.recording.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn record(&self) -> Result<(), AudioError> {
        // The scripted capture is already in `frames`; nothing to block on.
        Ok(())
    }

    fn stop_recording(&self) -> Result<(Vec<Vec<i16>>, u32), AudioError> {
        self.stop_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.recording
            .store(false, std::sync::atomic::Ordering::SeqCst);
        if self
            .fail_next_stop
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(AudioError::Device("scripted stop failure".into()));
        }
        Ok((self.frames.lock().unwrap().clone(), self.sample_rate))
    }
}
